use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{LyraError, Result};
use crate::state::{AppDescriptor, ConversationTurn};

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    app_id: &'a str,
    query: &'a str,
    history: &'a [ConversationTurn],
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

/// Reply substituted when the backend cannot be reached
pub fn fallback_text(app: &AppDescriptor) -> String {
    format!(
        "I'm having trouble connecting to my knowledge base right now. As {}, I'd typically help with {}. Please try again in a moment.",
        app.name,
        app.description_text().unwrap_or("your request")
    )
}

/// Client for `POST /api/chat`
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.chat_endpoint())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn complete(
        &self,
        app: &AppDescriptor,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<String> {
        let request = ChatRequest {
            app_id: &app.id,
            query,
            history,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| LyraError::http(&self.endpoint, e))?;

        if !response.status().is_success() {
            return Err(LyraError::Status {
                url: self.endpoint.clone(),
                status: response.status(),
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LyraError::http(&self.endpoint, e))?;
        debug!(app_id = %app.id, chars = chat_response.response.len(), "Chat reply received");
        Ok(chat_response.response)
    }

    /// Like [`ChatClient::complete`], with failures replaced by [`fallback_text`]
    pub async fn reply_or_fallback(
        &self,
        app: &AppDescriptor,
        query: &str,
        history: &[ConversationTurn],
    ) -> String {
        match self.complete(app, query, history).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(app_id = %app.id, error = %e, "Error getting LLM response");
                fallback_text(app)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::sample_app;
    use crate::state::TurnRole;
    use crate::test_support::{serve_once, UNREACHABLE_BASE};

    fn history() -> Vec<ConversationTurn> {
        vec![ConversationTurn {
            role: TurnRole::Assistant,
            content: "Welcome to Files! How can I help you today?".into(),
        }]
    }

    #[test]
    fn test_fallback_mentions_name_and_description() {
        let app = sample_app("files", "Files", Some("managing documents"));
        assert_eq!(
            fallback_text(&app),
            "I'm having trouble connecting to my knowledge base right now. As Files, I'd typically help with managing documents. Please try again in a moment."
        );
    }

    #[test]
    fn test_fallback_without_description() {
        let app = sample_app("files", "Files", None);
        assert!(fallback_text(&app).contains("help with your request."));
    }

    #[test]
    fn test_request_body_shape() {
        let turns = history();
        let request = ChatRequest {
            app_id: "files",
            query: "hello",
            history: &turns,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "app_id": "files",
                "query": "hello",
                "history": [
                    {"role": "assistant", "content": "Welcome to Files! How can I help you today?"}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_complete_posts_and_returns_response() {
        let (base, request) = serve_once(200, r#"{"response":"Hi!"}"#).await;
        let client = ChatClient::new(&format!("{}/api/chat", base));
        let app = sample_app("files", "Files", None);

        let reply = client.complete(&app, "hello", &history()).await.unwrap();
        assert_eq!(reply, "Hi!");

        let request = request.await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/chat");
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["app_id"], "files");
        assert_eq!(body["query"], "hello");
        assert_eq!(body["history"].as_array().map(|h| h.len()), Some(1));
    }

    #[tokio::test]
    async fn test_non_success_status_falls_back() {
        let (base, _request) = serve_once(500, r#"{"detail":"boom"}"#).await;
        let client = ChatClient::new(&format!("{}/api/chat", base));
        let app = sample_app("files", "Files", Some("files"));

        let reply = client.reply_or_fallback(&app, "hello", &[]).await;
        assert_eq!(reply, fallback_text(&app));
    }

    #[tokio::test]
    async fn test_network_failure_falls_back() {
        let client = ChatClient::new(&format!("{}/api/chat", UNREACHABLE_BASE));
        let app = sample_app("files", "Files", None);

        let err = client.complete(&app, "hello", &[]).await.unwrap_err();
        assert!(matches!(err, LyraError::Http { .. }));
        assert_eq!(
            client.reply_or_fallback(&app, "hello", &[]).await,
            fallback_text(&app)
        );
    }

    #[tokio::test]
    async fn test_missing_response_field_falls_back() {
        let (base, _request) = serve_once(200, r#"{"answer":"wrong key"}"#).await;
        let client = ChatClient::new(&format!("{}/api/chat", base));
        let app = sample_app("files", "Files", None);
        assert_eq!(
            client.reply_or_fallback(&app, "hello", &[]).await,
            fallback_text(&app)
        );
    }
}
