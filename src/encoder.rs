use crate::error::EngineError;
use crate::labels::LabelVocabulary;
use crate::types::{ChunkResult, ClassificationResult, FIELDS, IntentScore};

/// Encodes one chunk's raw intent lists into the scoring output schema.
///
/// Each item becomes a `[intent, probabilities]` pair: a dense vector the
/// length of the vocabulary, confidence at each returned intent's index and
/// 0.0 everywhere else. The reported intent is the highest-confidence one,
/// or an empty string when the service returned no intents at all.
pub fn encode(
    intent_lists: &[Vec<IntentScore>],
    vocabulary: &LabelVocabulary,
) -> Result<ChunkResult, EngineError> {
    let mut values = Vec::with_capacity(intent_lists.len());

    for intents in intent_lists {
        let mut probabilities = vec![0.0; vocabulary.len()];
        let mut top: Option<&IntentScore> = None;

        for score in intents {
            probabilities[vocabulary.index_of(&score.intent)?] = score.confidence;
            if top.is_none_or(|best| score.confidence > best.confidence) {
                top = Some(score);
            }
        }

        let intent = top.map(|s| s.intent.clone()).unwrap_or_default();
        values.push(ClassificationResult(intent, probabilities));
    }

    Ok(ChunkResult {
        fields: FIELDS.iter().map(|f| f.to_string()).collect(),
        labels: vocabulary.names().to_vec(),
        values,
    })
}
