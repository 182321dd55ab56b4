mod traits;
mod client;
mod openai;
mod sentence;
pub mod provider;

pub use traits::*;
pub use client::{ModelClient, Streamed};
pub use openai::OpenAIClient;
pub use provider::{ModelConfig, ProviderId};
pub use sentence::SentenceBuffer;

pub(crate) use client::{preview, truncate_str};
