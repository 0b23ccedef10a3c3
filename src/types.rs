use serde::{Deserialize, Serialize};

/// One scoring row: a JSON array whose first element is the text to
/// classify. Trailing elements are carried opaquely and ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Item(pub Vec<serde_json::Value>);

impl Item {
    pub fn text(&self) -> Option<&str> {
        self.0.first().and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub values: Vec<Item>,
}

/// Output schema field names, fixed by the scoring contract.
pub const FIELDS: [&str; 2] = ["intent", "probabilities"];

/// One `(intent, confidence)` pair as returned by the assistant service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IntentScore {
    pub intent: String,
    pub confidence: f64,
}

/// Per-item result: the winning intent plus a probability vector aligned
/// to the label vocabulary. Serializes as `[intent, [floats]]`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassificationResult(pub String, pub Vec<f64>);

/// Encoded output for one chunk, values in chunk item order.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub fields: Vec<String>,
    pub labels: Vec<String>,
    pub values: Vec<ClassificationResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub fields: Vec<String>,
    pub labels: Vec<String>,
    pub values: Vec<ClassificationResult>,
}
