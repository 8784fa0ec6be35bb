//! Prompt templates for Docket.
//!
//! Prompts can be customized by placing a `prompts.toml` file in the custom prompts directory.
//! Templates may reference custom variables from config as `{{name}}`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Fixed parts of the question-answering prompt.
///
/// The assembled prompt is: persona, guidance, context, optional history,
/// question, instructions, then the assistant cue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub persona: String,
    pub guidance: String,
    pub instructions: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            persona: "You are a cyber-forensics expert assistant. Help investigators with questions about hardware, USBs, cameras, system analysis, and digital forensics.".to_string(),

            guidance: "Use the following context information to answer the question. If the context doesn't contain relevant information, use your knowledge but be clear about the limitations.".to_string(),

            instructions: r#"- Provide clear, technical answers suitable for investigators
- Cite sources when referring to specific documents
- Be precise and factual
- If unsure, say so and suggest where to find more information"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let path = PathBuf::from(shellexpand::tilde(dir).to_string()).join("prompts.toml");
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                let custom: Prompts = toml::from_str(&content)?;
                prompts.rag = custom.rag;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a template with the custom config variables.
    pub fn render_custom(&self, template: &str) -> String {
        Self::render(template, &self.variables)
    }
}
