use crate::error::EngineError;
use crate::types::Item;

/// A contiguous slice of the batch, processed end-to-end by one worker.
/// `index` is the sole reassembly key; completion order never matters.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub items: Vec<Item>,
}

/// Splits `items` into chunks of at most `chunk_size`, preserving input
/// order. The last chunk may be shorter; empty input yields no chunks.
pub fn partition(items: Vec<Item>, chunk_size: usize) -> Result<Vec<Chunk>, EngineError> {
    if chunk_size == 0 {
        return Err(EngineError::InvalidChunkSize);
    }

    let mut chunks = Vec::with_capacity(items.len().div_ceil(chunk_size));
    let mut items = items.into_iter();
    let mut index = 0;
    loop {
        let chunk_items: Vec<Item> = items.by_ref().take(chunk_size).collect();
        if chunk_items.is_empty() {
            break;
        }
        chunks.push(Chunk {
            index,
            items: chunk_items,
        });
        index += 1;
    }
    Ok(chunks)
}
