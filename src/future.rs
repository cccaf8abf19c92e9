//! Future-like handle over the outputs of a launched job.
//!
//! A graph-mode launch returns immediately with the output blob handles the
//! binding step recorded; the values behind them materialize only once the
//! backend has run the job. [`FutureOutputs`] defers that resolution: it
//! issues one pull job per handle, funnels the pulled bytes through a
//! channel, and `sync()`s the session so nothing is read before the plan has
//! drained.

use rustc_hash::FxHashMap;

use crate::blob::BlobHandle;
use crate::session::{Session, SessionError};

/// Deferred view of a job's output values, bound to the session that
/// launched it.
#[derive(Clone, Debug)]
pub struct FutureOutputs {
    handles: Vec<BlobHandle>,
}

impl FutureOutputs {
    pub(crate) fn new(handles: Vec<BlobHandle>) -> Self {
        Self { handles }
    }

    /// The unresolved output handles, in descriptor order.
    #[must_use]
    pub fn handles(&self) -> &[BlobHandle] {
        &self.handles
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Pull every output value out of the plan and wait for the transfers
    /// to finish. Returns the bytes keyed by operator name.
    pub async fn resolve(
        self,
        session: &Session,
    ) -> Result<FxHashMap<String, Vec<u8>>, SessionError> {
        let (tx, rx) = flume::unbounded();
        for handle in &self.handles {
            let tx = tx.clone();
            let op_name = handle.op_name().to_string();
            session
                .async_pull(
                    handle.op_name(),
                    Box::new(move |slot| {
                        // Receiver outliving the sender is the only failure
                        // mode here; dropping the value is then correct.
                        let _ = tx.send((op_name, slot.bytes().to_vec()));
                    }),
                )
                .await?;
        }
        drop(tx);

        // All pull jobs are counted by now; once the barrier drains, every
        // pull callback has fired.
        session.sync().await?;

        let mut resolved = FxHashMap::default();
        while let Ok((op_name, bytes)) = rx.recv() {
            resolved.insert(op_name, bytes);
        }
        Ok(resolved)
    }
}
