use crate::error::EngineError;

/// Intents shipped with the assistant skill this service fronts.
pub const DEFAULT_LABELS: [&str; 9] = [
    "Cancel",
    "Customer_Care_Appointments",
    "Customer_Care_Store_Hours",
    "Customer_Care_Store_Location",
    "General_Connect_to_Agent",
    "General_Greetings",
    "Goodbye",
    "Help",
    "Thanks",
];

/// The fixed, ordered category set that defines the layout of every
/// probability vector. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.labels
    }

    /// Position of `intent` in the vocabulary. A name the vocabulary does
    /// not know means the deployment has drifted from the remote model.
    pub fn index_of(&self, intent: &str) -> Result<usize, EngineError> {
        self.labels
            .iter()
            .position(|label| label == intent)
            .ok_or_else(|| EngineError::UnknownLabel {
                intent: intent.to_string(),
            })
    }
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS.iter().map(|s| s.to_string()).collect())
    }
}
