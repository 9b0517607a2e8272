use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use super::templates::{GREETING_DEFAULT, REPLY_DEFAULT};

/// Loads prompt templates from the filesystem with fallback to defaults
pub struct PromptLoader {
    prompts_dir: PathBuf,
}

impl PromptLoader {
    pub fn new(data_path: impl AsRef<Path>) -> Self {
        Self {
            prompts_dir: data_path.as_ref().join("prompts"),
        }
    }

    /// Load the greeting prompt, using the default if no file exists
    pub fn load_greeting(&self) -> Result<String> {
        self.load_or_default("greeting", GREETING_DEFAULT)
    }

    /// Load the reply prompt, using the default if no file exists
    pub fn load_reply(&self) -> Result<String> {
        self.load_or_default("reply", REPLY_DEFAULT)
    }

    fn load_or_default(&self, name: &str, default: &str) -> Result<String> {
        // Try multiple possible locations
        let possible_paths = [
            self.prompts_dir.join("dialogue").join(format!("{}.md", name)),
            self.prompts_dir.join(format!("{}.md", name)),
        ];

        for path in possible_paths {
            if path.exists() {
                log::debug!("Loading {} prompt from: {:?}", name, path);
                return fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to read {} prompt: {}", name, e));
            }
        }

        log::debug!("Using default {} prompt", name);
        Ok(default.to_string())
    }
}
