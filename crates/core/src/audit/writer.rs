//! Buffered audit writer.
//!
//! Entries are buffered in memory and written to an [`AuditSink`] in batches,
//! either when the buffer reaches the configured batch size or when the owner
//! calls [`AuditWriter::flush`] (the server drives this from an interval
//! ticker and once more on shutdown).

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use vantage_shared::AuditSettings;

use super::error::AuditError;
use super::types::AuditEntry;

/// Persistence for audit batches, implemented by the db crate.
pub trait AuditSink: Send + Sync {
    /// Stores a batch; returns the number of entries written.
    fn write_batch(
        &self,
        entries: Vec<AuditEntry>,
    ) -> impl Future<Output = Result<usize, AuditError>> + Send;
}

/// Explicit audit writer interface.
pub trait AuditWriter: Send + Sync {
    /// Queues one entry, flushing when the batch is full.
    fn record(&self, entry: AuditEntry) -> impl Future<Output = Result<(), AuditError>> + Send;

    /// Writes every queued entry; returns the number written.
    fn flush(&self) -> impl Future<Output = Result<usize, AuditError>> + Send;
}

/// [`AuditWriter`] that batches entries in memory.
pub struct BufferedAuditWriter<S: AuditSink> {
    sink: Arc<S>,
    settings: AuditSettings,
    buffer: Mutex<Vec<AuditEntry>>,
}

impl<S: AuditSink> BufferedAuditWriter<S> {
    /// Creates a writer over a sink.
    #[must_use]
    pub fn new(sink: Arc<S>, settings: AuditSettings) -> Self {
        Self {
            sink,
            settings,
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Settings the writer was built with.
    #[must_use]
    pub const fn settings(&self) -> &AuditSettings {
        &self.settings
    }

    /// Number of entries waiting to be written.
    pub async fn pending(&self) -> usize {
        self.buffer.lock().await.len()
    }

    async fn write_out(&self, batch: Vec<AuditEntry>) -> Result<usize, AuditError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let count = batch.len();
        match self.sink.write_batch(batch.clone()).await {
            Ok(written) => {
                tracing::debug!(written, "Flushed audit entries");
                Ok(written)
            }
            Err(e) => {
                tracing::error!(error = %e, count, "Audit flush failed, entries re-queued");
                let mut buffer = self.buffer.lock().await;
                let newer = std::mem::replace(&mut *buffer, batch);
                buffer.extend(newer);
                Err(e)
            }
        }
    }
}

impl<S: AuditSink> AuditWriter for BufferedAuditWriter<S> {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let full_batch = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(entry);
            if buffer.len() >= self.settings.batch_size.max(1) {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };
        if let Some(batch) = full_batch {
            self.write_out(batch).await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<usize, AuditError> {
        let batch = std::mem::take(&mut *self.buffer.lock().await);
        self.write_out(batch).await
    }
}
