mod builder;
mod loader;
mod templates;

pub use builder::PromptBuilder;
pub use loader::PromptLoader;
pub use templates::{GREETING_DEFAULT, REPLY_DEFAULT};
