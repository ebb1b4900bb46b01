use super::{Piece, PieceStream, Provider, StartStream};
use crate::prompt::PromptRequest;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// What the stub provider plays back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubScript {
    /// Pieces to emit in order. Empty means "echo the question".
    pub pieces: Vec<String>,

    /// Fail once this many pieces have been emitted.
    pub fail_after: Option<usize>,

    /// Message used for the scripted failure.
    pub error: Option<String>,

    /// Delay before each piece, in milliseconds.
    pub delay_ms: u64,
}

/// Offline provider that replays a script instead of calling an API.
#[derive(Debug, Default, Clone)]
pub struct StubProvider {
    script: StubScript,
}

impl StubProvider {
    pub fn new(script: StubScript) -> Self {
        Self { script }
    }

    pub fn with_pieces<I, S>(pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(StubScript {
            pieces: pieces.into_iter().map(Into::into).collect(),
            ..StubScript::default()
        })
    }

    pub fn failing_after(mut self, n: usize, message: impl Into<String>) -> Self {
        self.script.fail_after = Some(n);
        self.script.error = Some(message.into());
        self
    }
}

impl Provider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn stream_chat(&self, req: PromptRequest) -> StartStream {
        let script = self.script.clone();

        Box::pin(async move {
            let (tx, rx) = mpsc::channel::<anyhow::Result<Piece>>(32);

            tokio::spawn(async move {
                let pieces = if script.pieces.is_empty() {
                    vec![req.question]
                } else {
                    script.pieces
                };

                for i in 0..=pieces.len() {
                    if script.fail_after == Some(i) {
                        let msg = script.error.as_deref().unwrap_or("stub provider failure");
                        let _ = tx.send(Err(anyhow!("{msg}"))).await;
                        return;
                    }
                    let Some(text) = pieces.get(i) else { break };
                    if script.delay_ms > 0 {
                        tokio::select! {
                            _ = tx.closed() => return,
                            _ = tokio::time::sleep(Duration::from_millis(script.delay_ms)) => {}
                        }
                    }
                    if tx.send(Ok(Piece::new(text.clone()))).await.is_err() {
                        break;
                    }
                }
            });

            Ok(Box::pin(ReceiverStream::new(rx)) as PieceStream)
        })
    }
}
