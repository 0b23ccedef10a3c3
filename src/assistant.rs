use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::classifier::Classifier;
use crate::error::EngineError;
use crate::types::IntentScore;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Base URL of the assistant service, e.g. `https://gateway.example.com/assistant/api`.
    pub service_url: String,
    pub api_key: String,
    pub assistant_id: String,
    /// API version date sent as the `version` query parameter.
    pub version: String,
    /// Per-call timeout; a slow chunk delays the batch but is never cancelled.
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct MessageOutput {
    #[serde(default)]
    intents: Vec<IntentScore>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    output: MessageOutput,
}

/// The three calls the assistant v2 session API exposes. The session
/// protocol is written against this trait so its lifecycle guarantees can
/// be tested without a network.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn create_session(&self) -> Result<String, EngineError>;

    /// Sends one message within a session. `None` sends an input-less
    /// message, which the service answers with its greeting context.
    async fn message(
        &self,
        session_id: &str,
        text: Option<&str>,
    ) -> Result<Vec<IntentScore>, EngineError>;

    async fn delete_session(&self, session_id: &str) -> Result<(), EngineError>;
}

/// Runs the per-chunk conversation: open a session, prime it, send every
/// text in order, and close the session exactly once whether the items
/// succeeded or not. A close failure never masks an item failure.
pub async fn run_session<A: AssistantApi + ?Sized>(
    api: &A,
    texts: &[String],
) -> Result<Vec<Vec<IntentScore>>, EngineError> {
    let session_id = api.create_session().await?;
    let outcome = drive_session(api, &session_id, texts).await;
    let closed = api.delete_session(&session_id).await;
    match outcome {
        Ok(results) => {
            closed?;
            Ok(results)
        }
        Err(err) => Err(err),
    }
}

async fn drive_session<A: AssistantApi + ?Sized>(
    api: &A,
    session_id: &str,
    texts: &[String],
) -> Result<Vec<Vec<IntentScore>>, EngineError> {
    // Priming message: warms the session's context. Its intents (often
    // none) are discarded.
    api.message(session_id, None).await?;

    let mut results = Vec::with_capacity(texts.len());
    for text in texts {
        results.push(api.message(session_id, Some(text)).await?);
    }
    Ok(results)
}

/// HTTP client for the assistant service. One instance is shared by all
/// workers; sessions are per chunk, not per client.
pub struct AssistantClient {
    http: reqwest::Client,
    config: AssistantConfig,
}

impl AssistantClient {
    pub fn new(config: AssistantConfig) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    fn sessions_url(&self) -> String {
        format!(
            "{}/v2/assistants/{}/sessions",
            self.config.service_url.trim_end_matches('/'),
            self.config.assistant_id
        )
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, EngineError> {
        let response = request
            .basic_auth("apikey", Some(&self.config.api_key))
            .query(&[("version", self.config.version.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl AssistantApi for AssistantClient {
    async fn create_session(&self) -> Result<String, EngineError> {
        let response = self.send(self.http.post(self.sessions_url())).await?;
        let session: SessionResponse = response.json().await?;
        tracing::debug!(session_id = %session.session_id, "session created");
        Ok(session.session_id)
    }

    async fn message(
        &self,
        session_id: &str,
        text: Option<&str>,
    ) -> Result<Vec<IntentScore>, EngineError> {
        let url = format!("{}/{}/message", self.sessions_url(), session_id);
        let body = match text {
            Some(text) => serde_json::json!({ "input": { "text": text } }),
            None => serde_json::json!({}),
        };

        let response = self.send(self.http.post(url).json(&body)).await?;
        let message: MessageResponse = response.json().await?;
        Ok(message.output.intents)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), EngineError> {
        let url = format!("{}/{}", self.sessions_url(), session_id);
        self.send(self.http.delete(url)).await?;
        tracing::debug!(session_id, "session deleted");
        Ok(())
    }
}

#[async_trait]
impl Classifier for AssistantClient {
    async fn classify_many(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<IntentScore>>, EngineError> {
        run_session(self, &texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ApiLog {
        sessions_created: usize,
        sessions_deleted: usize,
        messages: Vec<Option<String>>,
    }

    /// Scripted assistant: optionally fails the nth message, optionally
    /// fails session deletion.
    struct ScriptedApi {
        log: Mutex<ApiLog>,
        fail_message_at: Option<usize>,
        fail_delete: bool,
    }

    impl ScriptedApi {
        fn new() -> Self {
            Self {
                log: Mutex::new(ApiLog::default()),
                fail_message_at: None,
                fail_delete: false,
            }
        }

        fn remote_error() -> EngineError {
            EngineError::Api {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "scripted failure".to_string(),
            }
        }
    }

    #[async_trait]
    impl AssistantApi for ScriptedApi {
        async fn create_session(&self) -> Result<String, EngineError> {
            let mut log = self.log.lock().unwrap();
            log.sessions_created += 1;
            Ok(format!("session-{}", log.sessions_created))
        }

        async fn message(
            &self,
            _session_id: &str,
            text: Option<&str>,
        ) -> Result<Vec<IntentScore>, EngineError> {
            let mut log = self.log.lock().unwrap();
            let call_index = log.messages.len();
            log.messages.push(text.map(str::to_string));
            if self.fail_message_at == Some(call_index) {
                return Err(Self::remote_error());
            }
            // The priming message answers with no intents.
            match text {
                None => Ok(Vec::new()),
                Some(text) => Ok(vec![IntentScore {
                    intent: format!("intent-for-{text}"),
                    confidence: 0.9,
                }]),
            }
        }

        async fn delete_session(&self, _session_id: &str) -> Result<(), EngineError> {
            self.log.lock().unwrap().sessions_deleted += 1;
            if self.fail_delete {
                return Err(EngineError::Api {
                    status: reqwest::StatusCode::GATEWAY_TIMEOUT,
                    body: "scripted delete failure".to_string(),
                });
            }
            Ok(())
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {i}")).collect()
    }

    #[tokio::test]
    async fn primes_then_sends_each_text_in_order() {
        let api = ScriptedApi::new();
        let results = run_session(&api, &texts(3)).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0][0].intent, "intent-for-text 0");
        assert_eq!(results[2][0].intent, "intent-for-text 2");

        let log = api.log.into_inner().unwrap();
        assert_eq!(
            log.messages,
            vec![
                None,
                Some("text 0".to_string()),
                Some("text 1".to_string()),
                Some("text 2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn session_closes_once_on_success() {
        let api = ScriptedApi::new();
        run_session(&api, &texts(2)).await.unwrap();
        let log = api.log.into_inner().unwrap();
        assert_eq!(log.sessions_created, 1);
        assert_eq!(log.sessions_deleted, 1);
    }

    #[tokio::test]
    async fn session_closes_once_when_an_item_fails() {
        let api = ScriptedApi {
            // Call 0 is the priming message; fail on the second text.
            fail_message_at: Some(2),
            ..ScriptedApi::new()
        };
        let err = run_session(&api, &texts(3)).await.unwrap_err();
        assert!(matches!(err, EngineError::Api { .. }));

        let log = api.log.into_inner().unwrap();
        assert_eq!(log.sessions_deleted, 1);
        // No further texts after the failing one.
        assert_eq!(log.messages.len(), 3);
    }

    #[tokio::test]
    async fn close_failure_does_not_mask_item_failure() {
        let api = ScriptedApi {
            fail_message_at: Some(1),
            fail_delete: true,
            ..ScriptedApi::new()
        };
        let err = run_session(&api, &texts(1)).await.unwrap_err();
        // The message failure (503) wins over the delete failure (504).
        assert!(matches!(
            err,
            EngineError::Api { status, .. } if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
        assert_eq!(api.log.into_inner().unwrap().sessions_deleted, 1);
    }

    #[tokio::test]
    async fn close_failure_after_success_is_reported() {
        let api = ScriptedApi {
            fail_delete: true,
            ..ScriptedApi::new()
        };
        assert!(run_session(&api, &texts(1)).await.is_err());
    }

    #[tokio::test]
    async fn empty_chunk_still_opens_primes_and_closes() {
        let api = ScriptedApi::new();
        let results = run_session(&api, &[]).await.unwrap();
        assert!(results.is_empty());
        let log = api.log.into_inner().unwrap();
        assert_eq!(log.sessions_created, 1);
        assert_eq!(log.messages, vec![None]);
        assert_eq!(log.sessions_deleted, 1);
    }
}
