//! The prepared datasets of all workers.
//!
//! The corpus is an arena with one write-once slot per worker. Preparation threads fill their own
//! slot concurrently; once they have all been joined, the corpus is only read, so execution
//! threads share it through an [`Arc`](std::sync::Arc) without any locking.

use crate::workload::WorkerDataset;
use std::sync::OnceLock;

pub struct PreparedCorpus {
    slots: Vec<OnceLock<WorkerDataset>>,
}

impl PreparedCorpus {
    pub fn new(workers: usize) -> Self {
        Self {
            slots: (0..workers).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Store the dataset of `worker`. Each slot accepts exactly one dataset.
    pub fn put(&self, worker: usize, dataset: WorkerDataset) {
        assert!(
            worker < self.slots.len(),
            "worker {} out of range, corpus has {} slots",
            worker,
            self.slots.len()
        );
        if self.slots[worker].set(dataset).is_err() {
            panic!("dataset of worker {} prepared twice", worker);
        }
    }

    /// The dataset of `worker`, if it has been prepared.
    pub fn get(&self, worker: usize) -> Option<&WorkerDataset> {
        self.slots.get(worker).and_then(|s| s.get())
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| s.get().is_some())
    }
}
