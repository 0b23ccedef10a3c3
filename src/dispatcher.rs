use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::assembler::ResultsTable;
use crate::chunks::{self, Chunk};
use crate::classifier::Classifier;
use crate::config::DispatchConfig;
use crate::encoder;
use crate::error::EngineError;
use crate::labels::LabelVocabulary;
use crate::types::{ChunkResult, FIELDS, Item, ScoreResponse};

type Completion = (usize, Result<ChunkResult, EngineError>);

/// One unit of work: a chunk plus the completion channel of the batch it
/// belongs to. Workers outlive batches, so each job carries its own way
/// back to the dispatcher that enqueued it.
struct ChunkJob {
    chunk: Chunk,
    done_tx: mpsc::Sender<Completion>,
}

/// Front end of the scoring engine: partitions a batch, feeds the shared
/// worker queue, and reassembles completions into one ordered response.
pub struct Dispatcher {
    job_tx: flume::Sender<ChunkJob>,
    chunk_size: usize,
    vocabulary: Arc<LabelVocabulary>,
}

impl Dispatcher {
    /// Builds the dispatcher plus `config.workers` workers sharing one job
    /// queue. The caller spawns each worker's `run_forever`; the pool lives
    /// for the whole process and is fed per request through the queue.
    pub fn new<C: Classifier + 'static>(
        config: &DispatchConfig,
        classifier: Arc<C>,
        vocabulary: Arc<LabelVocabulary>,
    ) -> (Self, Vec<ChunkWorker<C>>) {
        let (job_tx, job_rx) = flume::unbounded();

        let workers = (0..config.workers)
            .map(|id| ChunkWorker {
                id,
                job_rx: job_rx.clone(),
                classifier: Arc::clone(&classifier),
                vocabulary: Arc::clone(&vocabulary),
            })
            .collect();

        let dispatcher = Self {
            job_tx,
            chunk_size: config.chunk_size,
            vocabulary,
        };

        (dispatcher, workers)
    }

    /// Scores one batch: every item classified, results in input order.
    ///
    /// Chunks complete in whatever order the workers race to; the results
    /// table restores input order by chunk index. The first chunk error
    /// fails the whole batch, but only after every in-flight chunk of this
    /// batch has reported back, so no worker is left writing into a batch
    /// that already returned.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn score(&self, items: Vec<Item>) -> Result<ScoreResponse, EngineError> {
        let batch_start = Instant::now();

        for (position, item) in items.iter().enumerate() {
            if item.text().is_none() {
                return Err(EngineError::MissingText { position });
            }
        }

        let chunks = chunks::partition(items, self.chunk_size)?;
        let chunk_count = chunks.len();
        if chunk_count == 0 {
            return Ok(ScoreResponse {
                fields: FIELDS.iter().map(|f| f.to_string()).collect(),
                labels: self.vocabulary.names().to_vec(),
                values: Vec::new(),
            });
        }

        tracing::info!(chunk_count, "dispatching batch");

        let (done_tx, mut done_rx) = mpsc::channel(chunk_count);
        for chunk in chunks {
            let job = ChunkJob {
                chunk,
                done_tx: done_tx.clone(),
            };
            self.job_tx
                .send_async(job)
                .await
                .map_err(|_| EngineError::PoolClosed)?;
        }
        drop(done_tx);

        // Wait for exactly chunk_count completions rather than for an empty
        // queue; the last chunk may still be in flight after the queue
        // drains.
        let mut table = ResultsTable::new(chunk_count);
        let mut first_error = None;
        for _ in 0..chunk_count {
            let (index, result) = done_rx.recv().await.ok_or(EngineError::PoolClosed)?;
            match result {
                Ok(chunk_result) => table.fill(index, chunk_result),
                Err(err) => {
                    tracing::error!(chunk = index, error = %err, "chunk failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let response = table.assemble()?;
        tracing::info!(
            elapsed_ms = batch_start.elapsed().as_millis() as u64,
            values = response.values.len(),
            "batch complete"
        );
        Ok(response)
    }
}

/// One member of the long-lived pool. Loops pulling chunks off the shared
/// queue until the dispatcher side of the queue is dropped.
pub struct ChunkWorker<C: Classifier> {
    id: usize,
    job_rx: flume::Receiver<ChunkJob>,
    classifier: Arc<C>,
    vocabulary: Arc<LabelVocabulary>,
}

impl<C: Classifier> ChunkWorker<C> {
    pub async fn run_forever(self) {
        while let Ok(job) = self.job_rx.recv_async().await {
            let index = job.chunk.index;
            tracing::debug!(
                worker = self.id,
                chunk = index,
                items = job.chunk.items.len(),
                "processing chunk"
            );

            let result = self.process(job.chunk).await;

            // A dropped receiver means the batch already failed; the result
            // has nowhere to go.
            let _ = job.done_tx.send((index, result)).await;
        }
    }

    async fn process(&self, chunk: Chunk) -> Result<ChunkResult, EngineError> {
        let texts = chunk
            .items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                item.text()
                    .map(str::to_string)
                    .ok_or(EngineError::MissingText { position })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let intent_lists = self.classifier.classify_many(texts).await?;
        encoder::encode(&intent_lists, &self.vocabulary)
    }
}
