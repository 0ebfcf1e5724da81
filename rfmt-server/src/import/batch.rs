//! Batched record writes
//!
//! Records are held until `batch_size` accumulate, then written with a single
//! [`RfmtStore::insert_batch`] call. A failed flush is fatal to the job;
//! batches flushed before it stay committed.

use std::sync::Arc;

use rfmt_common::Result;

use super::ImportRecord;
use crate::store::RfmtStore;

pub struct BatchWriter {
    store: Arc<dyn RfmtStore>,
    batch_size: usize,
    pending: Vec<ImportRecord>,
    written: usize,
    flushes: usize,
}

impl BatchWriter {
    /// `batch_size` of 0 is treated as 1
    pub fn new(store: Arc<dyn RfmtStore>, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            written: 0,
            flushes: 0,
        }
    }

    /// Queue a record, flushing when the batch is full
    pub async fn push(&mut self, record: ImportRecord) -> Result<()> {
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flush the trailing partial batch and report records written
    pub async fn finish(mut self) -> Result<usize> {
        self.flush().await?;
        Ok(self.written)
    }

    /// Records committed so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        self.store.insert_batch(&self.pending).await?;
        self.flushes += 1;
        self.written += self.pending.len();
        tracing::debug!(
            batch = self.flushes,
            size = self.pending.len(),
            written = self.written,
            "Batch flushed"
        );
        self.pending.clear();
        Ok(())
    }
}
