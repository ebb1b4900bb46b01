//! Prompt composition for the portfolio assistant.

use crate::context::{truncate_chars, ContextDocument};

/// Longest question, in characters, that reaches the model.
pub const MAX_QUESTION_CHARS: usize = 2000;

/// Everything sent to the completion provider for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub context: ContextDocument,
    pub question: String,
    /// Instruction template with context and question filled in.
    pub text: String,
}

/// Trim surrounding whitespace and cap the question length.
pub fn effective_question(raw: &str) -> String {
    truncate_chars(raw.trim(), MAX_QUESTION_CHARS).to_string()
}

pub fn compose(owner: &str, context: &ContextDocument, question: &str) -> PromptRequest {
    let text = format!(
        "You are the portfolio assistant for {owner}.\n\
         Answer only from the context below. Keep replies brief, professional and friendly.\n\
         If the question is a greeting, greet the visitor warmly before anything else.\n\
         If the question is unrelated to {owner} or this site, politely decline in one short sentence \
         and offer to help with questions about {owner}'s work.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}",
        context = context.as_str(),
    );

    PromptRequest {
        context: context.clone(),
        question: question.to_string(),
        text,
    }
}
