use crate::error::EngineError;
use crate::types::{ChunkResult, ScoreResponse};

/// One slot per chunk index, written exactly once as chunks complete.
/// Created fresh per batch; only the dispatcher writes into it, so slot
/// assignment needs no synchronization beyond the completion channel.
#[derive(Debug)]
pub struct ResultsTable {
    slots: Vec<Option<ChunkResult>>,
}

impl ResultsTable {
    pub fn new(chunk_count: usize) -> Self {
        Self {
            slots: (0..chunk_count).map(|_| None).collect(),
        }
    }

    pub fn fill(&mut self, index: usize, result: ChunkResult) {
        debug_assert!(self.slots[index].is_none(), "chunk {index} filled twice");
        self.slots[index] = Some(result);
    }

    /// Concatenates all chunk values in ascending index order. Workers race
    /// to completion, so this index walk is what restores input order.
    pub fn assemble(self) -> Result<ScoreResponse, EngineError> {
        let mut fields = Vec::new();
        let mut labels = Vec::new();
        let mut values = Vec::new();

        for (index, slot) in self.slots.into_iter().enumerate() {
            let chunk = slot.ok_or(EngineError::MissingSlot { index })?;
            // All chunks share one vocabulary; any filled slot supplies the
            // header fields.
            fields = chunk.fields;
            labels = chunk.labels;
            values.extend(chunk.values);
        }

        Ok(ScoreResponse {
            fields,
            labels,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassificationResult, FIELDS};

    fn chunk_result(tags: &[&str]) -> ChunkResult {
        ChunkResult {
            fields: FIELDS.iter().map(|f| f.to_string()).collect(),
            labels: vec!["A".to_string(), "B".to_string()],
            values: tags
                .iter()
                .map(|t| ClassificationResult(t.to_string(), vec![1.0, 0.0]))
                .collect(),
        }
    }

    #[test]
    fn assembles_in_index_order_not_fill_order() {
        let mut table = ResultsTable::new(3);
        table.fill(2, chunk_result(&["e", "f"]));
        table.fill(0, chunk_result(&["a", "b"]));
        table.fill(1, chunk_result(&["c", "d"]));

        let response = table.assemble().unwrap();
        let intents: Vec<_> = response.values.iter().map(|v| v.0.as_str()).collect();
        assert_eq!(intents, vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(response.fields, vec!["intent", "probabilities"]);
        assert_eq!(response.labels, vec!["A", "B"]);
    }

    #[test]
    fn unfilled_slot_is_an_explicit_error() {
        let mut table = ResultsTable::new(2);
        table.fill(0, chunk_result(&["a"]));

        let err = table.assemble().unwrap_err();
        assert!(matches!(err, EngineError::MissingSlot { index: 1 }));
    }
}
