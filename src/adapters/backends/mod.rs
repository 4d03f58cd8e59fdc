//! Generation backend adapters.

pub mod mock;
pub mod openai_api;

pub use mock::{MockBackend, MockReply};
pub use openai_api::{scenario_prompt, OpenAiBackend};
