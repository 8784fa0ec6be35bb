//! Configuration module for Docket.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ConversationSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, IngestSettings,
    PromptSettings, RagSettings, Settings, VectorStoreSettings,
};
