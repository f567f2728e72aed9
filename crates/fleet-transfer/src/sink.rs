use async_trait::async_trait;

use fleet_types::ObjectHash;

use crate::error::TransferResult;

/// The remote side of an object push.
///
/// Implemented over the update protocol's transport by the embedding
/// process; [`MemorySink`] serves tests and local pipelines.
#[async_trait]
pub trait ObjectSink: Send {
    /// Deliver one object. Re-delivering a hash the remote already holds
    /// must be harmless (pushes are idempotent by hash).
    async fn put(&mut self, hash: ObjectHash, data: Vec<u8>) -> TransferResult<()>;
}

/// Collects pushed objects in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    objects: Vec<(ObjectHash, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Objects received so far, in arrival order.
    pub fn received(&self) -> &[(ObjectHash, Vec<u8>)] {
        &self.objects
    }
}

#[async_trait]
impl ObjectSink for MemorySink {
    async fn put(&mut self, hash: ObjectHash, data: Vec<u8>) -> TransferResult<()> {
        self.objects.push((hash, data));
        Ok(())
    }
}
