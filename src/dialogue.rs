//! Dialogue generators and the canned lines used when generation fails.

use anyhow::Result;
use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::parser;
use crate::personality::PersonalityTrait;
use crate::prompts::PromptBuilder;
use crate::relationship::RelationshipLevel;
use crate::traits::{DialogueContext, DialogueGenerator};
use crate::types::AgentId;

const FALLBACK_GREETINGS: [&str; 4] = [
    "Hello, {name}. How are you today?",
    "Greetings, {name}!",
    "Good to see you, {name}.",
    "Hi there, {name}.",
];

const FALLBACK_REPLIES: [&str; 5] = [
    "I see.",
    "Interesting.",
    "That's good to know.",
    "Thanks for telling me, {name}.",
    "Indeed.",
];

/// Greeting used when the generator fails or times out.
///
/// The choice depends only on the speaker, so replays pick the same line.
pub fn fallback_greeting(speaker: AgentId, listener_name: &str) -> String {
    pick(&FALLBACK_GREETINGS, speaker).replace("{name}", listener_name)
}

pub fn fallback_reply(speaker: AgentId, listener_name: &str) -> String {
    pick(&FALLBACK_REPLIES, speaker).replace("{name}", listener_name)
}

fn pick<'a>(options: &[&'a str], speaker: AgentId) -> &'a str {
    let index = (speaker.0 % options.len() as u64) as usize;
    options[index]
}

/// Offline generator: lines from the speaker's dominant trait and how well
/// the two agents know each other. Always answers immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateDialogue;

impl TemplateDialogue {
    fn greeting(context: &DialogueContext) -> String {
        let me = &context.speaker.name;
        let you = &context.listener.name;
        let voice = context.speaker.traits.dominant();

        match context.relationship {
            RelationshipLevel::Stranger => match voice {
                Some(PersonalityTrait::Friendly) => {
                    format!("Hello there, I don't believe we've met. I'm {}.", me)
                }
                Some(PersonalityTrait::Shy) => "Oh... h-hello.".to_string(),
                Some(PersonalityTrait::Serious | PersonalityTrait::Stern) => "Good day.".to_string(),
                Some(PersonalityTrait::Playful) => "Well hey! Haven't seen you around before.".to_string(),
                Some(PersonalityTrait::Talkative | PersonalityTrait::Gossipy) => {
                    format!("Oh, a new face! I'm {}, have you heard the latest?", me)
                }
                Some(PersonalityTrait::Mysterious | PersonalityTrait::Reserved) => "Hm. Evening.".to_string(),
                _ => format!("Hello. I'm {}.", me),
            },
            RelationshipLevel::Acquaintance => format!("Hello again, {}. What brings you by?", you),
            RelationshipLevel::Friend => format!("Hey there, {}! Always a pleasure to see you.", you),
            RelationshipLevel::CloseFriend => {
                format!("{}! Just the person I wanted to see. How's everything?", you)
            }
            RelationshipLevel::Rival => format!("Oh. It's you, {}.", you),
        }
    }

    fn reply(context: &DialogueContext) -> String {
        let you = &context.listener.name;

        if context.relationship == RelationshipLevel::Rival {
            return "Yes, yes. If you'll excuse me.".to_string();
        }
        match context.speaker.traits.dominant() {
            Some(PersonalityTrait::Friendly | PersonalityTrait::Kind) => {
                format!("Good to see you too, {}!", you)
            }
            Some(PersonalityTrait::Shy) => "Oh, um... hi. Nice to meet you.".to_string(),
            Some(PersonalityTrait::Serious | PersonalityTrait::Stern) => "Likewise. Busy day.".to_string(),
            Some(PersonalityTrait::Playful) => format!("Ha! You again, {}?", you),
            Some(PersonalityTrait::Wise | PersonalityTrait::Calm) => {
                "Every meeting is a small gift.".to_string()
            }
            Some(PersonalityTrait::Curious) => format!("What have you been up to, {}?", you),
            Some(PersonalityTrait::Talkative | PersonalityTrait::Gossipy) => {
                "You will not believe what I heard at the market!".to_string()
            }
            _ => format!("Nice to see you, {}.", you),
        }
    }
}

#[async_trait]
impl DialogueGenerator for TemplateDialogue {
    async fn generate(&self, context: &DialogueContext) -> Result<String> {
        Ok(Self::greeting(context))
    }

    async fn respond(&self, context: &DialogueContext, _prior_text: &str) -> Result<String> {
        Ok(Self::reply(context))
    }
}

/// Generator backed by a language model
pub struct LlmDialogue<C> {
    client: C,
    prompts: PromptBuilder,
}

impl<C: LlmClient> LlmDialogue<C> {
    pub fn new(client: C) -> Self {
        Self::with_prompts(client, PromptBuilder::default())
    }

    pub fn with_prompts(client: C, prompts: PromptBuilder) -> Self {
        Self { client, prompts }
    }

    async fn ask(&self, prompt: String, speaker: &str) -> Result<String> {
        log::debug!("🎭 Asking model for a line from {}", speaker);
        let response = self.client.query(prompt).await?;
        parser::extract_line(&response)
            .ok_or_else(|| anyhow::anyhow!("Model returned no usable line for {}", speaker))
    }
}

#[async_trait]
impl<C: LlmClient> DialogueGenerator for LlmDialogue<C> {
    async fn generate(&self, context: &DialogueContext) -> Result<String> {
        let prompt = self.prompts.build_greeting_prompt(context);
        self.ask(prompt, &context.speaker.name).await
    }

    async fn respond(&self, context: &DialogueContext, prior_text: &str) -> Result<String> {
        let prompt = self.prompts.build_reply_prompt(context, prior_text);
        self.ask(prompt, &context.speaker.name).await
    }
}
