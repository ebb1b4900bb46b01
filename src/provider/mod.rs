pub mod google;
pub mod stub;

use crate::prompt::PromptRequest;
use futures_core::stream::BoxStream;
use std::future::Future;
use std::pin::Pin;

/// One incremental fragment of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub text: String,
}

impl Piece {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Ordered, lazy, finite sequence of pieces. An `Err` item ends the sequence.
pub type PieceStream = BoxStream<'static, anyhow::Result<Piece>>;

/// Future that resolves once the provider has accepted the request.
pub type StartStream = Pin<Box<dyn Future<Output = anyhow::Result<PieceStream>> + Send>>;

/// Completion provider interface.
///
/// Only streaming is supported; callers consume pieces as they arrive.
pub trait Provider {
    fn name(&self) -> &'static str;

    /// Start streaming an answer for a composed prompt.
    fn stream_chat(&self, req: PromptRequest) -> StartStream;
}

pub type SharedProvider = std::sync::Arc<dyn Provider + Send + Sync>;
