use anyhow::Result;
use std::path::Path;

use super::loader::PromptLoader;
use super::templates::{GREETING_DEFAULT, REPLY_DEFAULT};
use crate::personality::TraitSet;
use crate::traits::DialogueContext;

/// Builds greeting and reply prompts from a dialogue context
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    greeting_template: String,
    reply_template: String,
}

impl PromptBuilder {
    /// Reads templates from `<data_path>/prompts`, falling back to the built-ins
    pub fn new(data_path: impl AsRef<Path>) -> Result<Self> {
        let loader = PromptLoader::new(data_path);
        Ok(Self {
            greeting_template: loader.load_greeting()?,
            reply_template: loader.load_reply()?,
        })
    }

    pub fn with_templates(greeting: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            greeting_template: greeting.into(),
            reply_template: reply.into(),
        }
    }

    /// Build a prompt asking the speaker for an opening line
    pub fn build_greeting_prompt(&self, context: &DialogueContext) -> String {
        fill(&self.greeting_template, context, None)
    }

    /// Build a prompt asking the speaker to answer `prior`
    pub fn build_reply_prompt(&self, context: &DialogueContext, prior: &str) -> String {
        fill(&self.reply_template, context, Some(prior))
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::with_templates(GREETING_DEFAULT, REPLY_DEFAULT)
    }
}

fn fill(template: &str, context: &DialogueContext, prior: Option<&str>) -> String {
    let mut prompt = template
        .replace("{speaker}", &context.speaker.name)
        .replace("{speaker_traits}", &describe_traits(&context.speaker.traits))
        .replace("{listener}", &context.listener.name)
        .replace("{listener_traits}", &describe_traits(&context.listener.traits))
        .replace("{relationship}", context.relationship.describe());
    if let Some(prior) = prior {
        prompt = prompt.replace("{prior}", prior);
    }
    prompt
}

fn describe_traits(traits: &TraitSet) -> String {
    if traits.is_empty() {
        "unremarkable".to_string()
    } else {
        traits.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
    }
}
