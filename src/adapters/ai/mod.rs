//! AI provider adapters

mod openai;

pub use openai::{parse_vote, OpenAiCompatibleProvider, ProviderSettings};
