//! UI-agnostic application state types
//!
//! This module contains data structures that are shared between the catalog
//! client, the chat transport and whatever front end renders them. None of
//! them depend on a UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata describing one desktop application tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub id: String,
    pub name: String,
    /// Glyph identifier (a Material Symbols name in the catalog)
    pub icon: String,
    /// Accent color, usually `#rrggbb`
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "chatTitle",
        alias = "chat_title",
        skip_serializing_if = "Option::is_none"
    )]
    pub chat_title: Option<String>,
}

impl AppDescriptor {
    /// Title shown on the chat dialog header
    pub fn dialog_title(&self) -> &str {
        self.chat_title.as_deref().unwrap_or(&self.name)
    }

    /// Description if present and not blank
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    App,
}

/// A chat message in the dialog of one app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn app(content: impl Into<String>) -> Self {
        Self::new(Sender::App, content)
    }

    pub fn is_from_app(&self) -> bool {
        self.sender == Sender::App
    }
}

/// Wire-level role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One `{role, content}` entry of the `history` array sent to `/api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl From<&ChatMessage> for ConversationTurn {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.sender {
            Sender::User => TurnRole::User,
            Sender::App => TurnRole::Assistant,
        };
        Self {
            role,
            content: message.content.clone(),
        }
    }
}

/// Project a message list into wire turns, preserving order
pub fn to_history(messages: &[ChatMessage]) -> Vec<ConversationTurn> {
    messages.iter().map(ConversationTurn::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_parses_catalog_json() {
        let json = r##"{
            "id": "files",
            "name": "Files",
            "icon": "folder",
            "color": "#4285f4",
            "description": "Browse your documents",
            "chatTitle": "File Assistant"
        }"##;
        let app: AppDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(app.id, "files");
        assert_eq!(app.dialog_title(), "File Assistant");
        assert_eq!(app.description_text(), Some("Browse your documents"));
    }

    #[test]
    fn test_descriptor_optional_fields_missing() {
        let json = r##"{"id": "mail", "name": "Mail", "icon": "mail", "color": "#ea4335"}"##;
        let app: AppDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(app.description, None);
        assert_eq!(app.dialog_title(), "Mail");
    }

    #[test]
    fn test_blank_description_is_treated_as_missing() {
        let app = AppDescriptor {
            id: "x".into(),
            name: "X".into(),
            icon: "apps".into(),
            color: "#000000".into(),
            description: Some("   ".into()),
            chat_title: None,
        };
        assert_eq!(app.description_text(), None);
    }

    #[test]
    fn test_history_maps_app_to_assistant() {
        let messages = vec![ChatMessage::app("Welcome"), ChatMessage::user("hello")];
        let history = to_history(&messages);
        assert_eq!(history[0].role, TurnRole::Assistant);
        assert_eq!(history[1].role, TurnRole::User);
        assert_eq!(history[1].content, "hello");
    }

    #[test]
    fn test_turn_serializes_lowercase_role() {
        let turn = ConversationTurn {
            role: TurnRole::Assistant,
            content: "hi".into(),
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = ChatMessage::user("a");
        let b = ChatMessage::user("a");
        assert_ne!(a.id, b.id);
    }
}
