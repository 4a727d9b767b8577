pub mod catalog;
pub mod chat;
pub mod clock;
pub mod config;
pub mod desktop;
pub mod error;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use catalog::AppCatalog;
pub use chat::{fallback_text, ChatClient};
pub use clock::TimeZoneSetting;
pub use config::Config;
pub use error::{LyraError, Result};
pub use session::{ChatSession, PendingSend};
pub use state::{AppDescriptor, ChatMessage, ConversationTurn, Sender, TurnRole};
