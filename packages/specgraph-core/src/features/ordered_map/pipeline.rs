//! Parallel translate / sequential reduce
//!
//! Work fans out across a bounded pool sized to available parallelism; one
//! merge stage re-sequences completions by original position before the
//! consumer sees them, so side-effecting consumers observe input order no
//! matter how the workers interleave.

use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

use tracing::trace;

use crate::errors::Result;
use crate::features::ordered_map::OrderedMap;

/// Outcome of one translate or consume step
///
/// `Stop` ends the whole pipeline early without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow<R> {
    Continue(R),
    Stop,
}

/// Fan positions `0..count` across `workers` threads, deliver results to
/// `consume` in position order.
///
/// Workers pull positions from a shared cursor and push completions through a
/// bounded channel; the merge stage buffers out-of-order arrivals until their
/// position is next. An error or `Stop` observed at its in-order position
/// cancels remaining work; results that arrive afterwards are dropped.
pub(crate) fn run_pipeline<R, T, C>(
    count: usize,
    workers: usize,
    translate: T,
    mut consume: C,
) -> Result<()>
where
    R: Send,
    T: Fn(usize) -> Result<Flow<R>> + Sync,
    C: FnMut(R) -> Result<Flow<()>> + Send,
{
    if count == 0 {
        return Ok(());
    }
    let workers = workers.clamp(1, count);
    let cancel = AtomicBool::new(false);
    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::sync_channel::<(usize, Result<Flow<R>>)>(workers * 2);
    let mut outcome: Result<()> = Ok(());

    rayon::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let cancel = &cancel;
            let cursor = &cursor;
            let translate = &translate;
            scope.spawn(move |_| loop {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                let pos = cursor.fetch_add(1, Ordering::Relaxed);
                if pos >= count {
                    break;
                }
                let result = translate(pos);
                if tx.send((pos, result)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        let mut pending: BTreeMap<usize, Result<Flow<R>>> = BTreeMap::new();
        let mut next = 0usize;
        'merge: while next < count {
            let (pos, result) = match rx.recv() {
                Ok(message) => message,
                Err(_) => break,
            };
            pending.insert(pos, result);
            while let Some(result) = pending.remove(&next) {
                next += 1;
                match result {
                    Err(err) => {
                        outcome = Err(err);
                        cancel.store(true, Ordering::Relaxed);
                        break 'merge;
                    }
                    Ok(Flow::Stop) => {
                        trace!(position = next - 1, "translate stopped pipeline");
                        cancel.store(true, Ordering::Relaxed);
                        break 'merge;
                    }
                    Ok(Flow::Continue(value)) => match consume(value) {
                        Err(err) => {
                            outcome = Err(err);
                            cancel.store(true, Ordering::Relaxed);
                            break 'merge;
                        }
                        Ok(Flow::Stop) => {
                            trace!(position = next - 1, "consumer stopped pipeline");
                            cancel.store(true, Ordering::Relaxed);
                            break 'merge;
                        }
                        Ok(Flow::Continue(())) => {}
                    },
                }
            }
        }
        // Closing the receiver unblocks any worker waiting on a full queue;
        // whatever it computed after cancellation is discarded.
        drop(rx);
    });

    outcome
}

impl<K: Hash + Eq, V> OrderedMap<K, V>
where
    K: Sync,
    V: Sync,
{
    /// Translate every entry on a bounded worker pool, then reduce
    /// sequentially in original key order.
    ///
    /// `translate` runs concurrently; `consume` runs on the calling thread
    /// and sees results in insertion order. Either side may return
    /// [`Flow::Stop`] to end the pipeline early without error.
    pub fn translate_reduce<R, T, C>(&self, translate: T, consume: C) -> Result<()>
    where
        R: Send,
        T: Fn(&K, &V) -> Result<Flow<R>> + Sync,
        C: FnMut(R) -> Result<Flow<()>> + Send,
    {
        let entries: Vec<(&K, &V)> = self.iter().collect();
        let workers = num_cpus::get();
        run_pipeline(
            entries.len(),
            workers,
            |pos| {
                let (key, value) = entries[pos];
                translate(key, value)
            },
            consume,
        )
    }
}
