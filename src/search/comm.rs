//! Message passing between a search coordinator and its workers.
//!
//! Three phases, nothing shared mutably in between:
//!
//! 1. broadcast: read-only inputs are wrapped in one `Arc` and handed to every
//!    worker when the group is created,
//! 2. scatter: the coordinator sends one sub-grid down each worker's inbox,
//! 3. gather: every worker sends `(rank, result)` back on a single channel
//!    and the coordinator reassembles them in rank order.
//!
//! Scatter completes before any worker starts, so workers never wait on each
//! other and a pool with fewer threads than workers cannot deadlock.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use tracing::debug;

use crate::error::{Result, SearchError};
use crate::grid::ParameterGrid;
use crate::results::ResultArray;

type Gathered = (usize, Result<ResultArray>);

/// Coordinator side of a process group.
#[derive(Debug)]
pub struct Coordinator {
    inboxes: Vec<Sender<ParameterGrid>>,
    results: Receiver<Gathered>,
}

/// One worker: its rank, the broadcast inputs, and its two channel ends.
#[derive(Debug)]
pub struct Worker<B> {
    rank: usize,
    inputs: Arc<B>,
    inbox: Receiver<ParameterGrid>,
    outbox: Sender<Gathered>,
}

/// Create `size` workers that all share `inputs` (the broadcast phase).
pub fn process_group<B>(size: usize, inputs: B) -> (Coordinator, Vec<Worker<B>>) {
    let inputs = Arc::new(inputs);
    let (outbox, results) = mpsc::channel();
    let mut inboxes = Vec::with_capacity(size);
    let mut workers = Vec::with_capacity(size);
    for rank in 0..size {
        let (tx, rx) = mpsc::channel();
        inboxes.push(tx);
        workers.push(Worker {
            rank,
            inputs: Arc::clone(&inputs),
            inbox: rx,
            outbox: outbox.clone(),
        });
    }
    (Coordinator { inboxes, results }, workers)
}

impl Coordinator {
    pub fn size(&self) -> usize {
        self.inboxes.len()
    }

    /// Send part `i` to worker `i`.
    pub fn scatter(&self, parts: Vec<ParameterGrid>) -> Result<()> {
        if parts.len() != self.size() {
            return Err(SearchError::InvalidPartition {
                parts: parts.len(),
                size: self.size(),
            });
        }
        for (rank, (inbox, part)) in self.inboxes.iter().zip(parts).enumerate() {
            debug!(rank, points = part.size(), "scatter sub-grid");
            inbox.send(part).map_err(|_| SearchError::WorkerFailed {
                rank,
                reason: "inbox closed before scatter".into(),
            })?;
        }
        Ok(())
    }

    /// Collect one result per worker and concatenate them in rank order.
    ///
    /// Call after every worker has finished. If several workers failed, the
    /// error of the lowest rank is returned.
    pub fn gather(self) -> Result<ResultArray> {
        let size = self.size();
        let mut slots: Vec<Option<Result<ResultArray>>> = (0..size).map(|_| None).collect();
        for (rank, result) in self.results.try_iter() {
            if let Some(slot) = slots.get_mut(rank) {
                *slot = Some(result);
            }
        }

        let mut parts = Vec::with_capacity(size);
        for (rank, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(result) => parts.push(result?),
                None => {
                    return Err(SearchError::WorkerFailed {
                        rank,
                        reason: "no result was gathered".into(),
                    });
                }
            }
        }
        Ok(ResultArray::concat(parts))
    }
}

impl<B> Worker<B> {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn inputs(&self) -> &B {
        &self.inputs
    }

    /// Take this worker's sub-grid.
    pub fn receive(&self) -> Result<ParameterGrid> {
        self.inbox.recv().map_err(|_| SearchError::WorkerFailed {
            rank: self.rank,
            reason: "no sub-grid was scattered".into(),
        })
    }

    /// Report the result and retire the worker.
    pub fn send(self, result: Result<ResultArray>) {
        // The coordinator only drops its receiver after gathering, so a
        // failed send can only mean the whole search is already gone.
        let _ = self.outbox.send((self.rank, result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::grid::{Axis, StructuredGrid};

    fn line(n: usize) -> ParameterGrid {
        StructuredGrid::new(vec![Axis::closed("x", 0.0, 1.0, n).unwrap()], None)
            .unwrap()
            .into()
    }

    #[test]
    fn every_worker_sees_the_same_broadcast() {
        let (_, workers) = process_group(3, vec![1.0, 2.0]);
        assert!(workers.iter().all(|w| w.inputs() == &vec![1.0, 2.0]));
        assert_eq!(workers.iter().map(Worker::rank).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn gather_reorders_by_rank() {
        let (coordinator, workers) = process_group(3, ());
        coordinator.scatter(line(5).decompose(3).unwrap()).unwrap();

        // Finish out of order.
        let mut workers = workers;
        workers.reverse();
        for w in workers {
            let part = w.receive().unwrap();
            let values = (0..part.size()).map(|i| (part.offset() + i) as f64).collect();
            w.send(Ok(ResultArray::from_vec(values)));
        }
        let gathered = coordinator.gather().unwrap();
        assert_eq!(gathered.as_slice(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn lowest_rank_error_wins() {
        let (coordinator, workers) = process_group(3, ());
        coordinator.scatter(line(3).decompose(3).unwrap()).unwrap();
        for w in workers {
            let rank = w.rank();
            let result = if rank == 0 {
                Ok(ResultArray::zeros(1))
            } else {
                Err(SearchError::synthesis(format!("rank{rank}"), "boom"))
            };
            w.send(result);
        }
        match coordinator.gather() {
            Err(SearchError::SynthesisFailure { station, .. }) => assert_eq!(station, "rank1"),
            other => panic!("unexpected gather result: {other:?}"),
        }
    }

    #[test]
    fn silent_worker_is_reported() {
        let (coordinator, mut workers) = process_group(2, ());
        coordinator.scatter(line(2).decompose(2).unwrap()).unwrap();
        let last = workers.pop().unwrap();
        last.send(Ok(ResultArray::zeros(1)));
        drop(workers);
        assert!(matches!(
            coordinator.gather(),
            Err(SearchError::WorkerFailed { rank: 0, .. })
        ));
    }

    #[test]
    fn scatter_requires_one_part_per_worker() {
        let (coordinator, _workers) = process_group(2, ());
        assert!(matches!(
            coordinator.scatter(line(3).decompose(3).unwrap()),
            Err(SearchError::InvalidPartition { .. })
        ));
    }
}
