use std::collections::BTreeSet;

use tracing::{debug, info};

use fleet_store::ObjectGetter;
use fleet_types::{CancelFlag, ObjectHash};

use crate::error::{TransferError, TransferResult};
use crate::sink::ObjectSink;

/// Totals for one push pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PushStats {
    pub objects_pushed: u64,
    pub bytes_pushed: u64,
}

/// Push every object in `push_list` from `getter` to `sink`.
///
/// Objects are sent in hash order. For each one the pass checks `cancel`
/// first, reads the bytes, re-hashes them, and only then delivers. A
/// getter that cannot produce a promised hash fails the pass with
/// [`TransferError::ObjectRead`]; corrupt bytes fail it with
/// [`TransferError::HashMismatch`]. Objects delivered before a failure
/// stay delivered, which is safe because delivery is idempotent by hash.
pub async fn push_objects(
    getter: &dyn ObjectGetter,
    sink: &mut dyn ObjectSink,
    push_list: &BTreeSet<ObjectHash>,
    cancel: &CancelFlag,
) -> TransferResult<PushStats> {
    let mut stats = PushStats::default();
    for hash in push_list {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled {
                completed: stats.objects_pushed,
            });
        }
        let data = getter.get(hash).map_err(|source| TransferError::ObjectRead {
            hash: *hash,
            source,
        })?;
        if !hash.verify(&data) {
            return Err(TransferError::HashMismatch {
                expected: *hash,
                computed: ObjectHash::of_bytes(&data),
            });
        }
        let size = data.len() as u64;
        sink.put(*hash, data).await?;
        debug!(hash = %hash, size, "object pushed");
        stats.objects_pushed += 1;
        stats.bytes_pushed += size;
    }
    info!(
        objects = stats.objects_pushed,
        bytes = stats.bytes_pushed,
        "push pass complete"
    );
    Ok(stats)
}
