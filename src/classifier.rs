use crate::error::EngineError;
use crate::types::IntentScore;
use async_trait::async_trait;

/// Session-scoped classification over the remote assistant: one remote
/// conversation session per call, one message per text, texts in order.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify_many(&self, texts: Vec<String>)
    -> Result<Vec<Vec<IntentScore>>, EngineError>;

    /// Single-text convenience; pays full session setup for one message.
    async fn classify_one(&self, text: String) -> Result<Vec<IntentScore>, EngineError> {
        let mut results = self.classify_many(vec![text]).await?;
        Ok(results.pop().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl Classifier for Upper {
        async fn classify_many(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<IntentScore>>, EngineError> {
            Ok(texts
                .into_iter()
                .map(|text| {
                    vec![IntentScore {
                        intent: text.to_uppercase(),
                        confidence: 1.0,
                    }]
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn classify_one_delegates_to_the_session_call() {
        let intents = Upper.classify_one("bye".to_string()).await.unwrap();
        assert_eq!(intents[0].intent, "BYE");
    }
}
