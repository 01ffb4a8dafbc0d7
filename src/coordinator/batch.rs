//! Requests gathered by the primary while it waits for the quiet period.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::flatten::FolderRequest;

#[derive(Debug)]
pub struct BatchState {
    requests: Vec<FolderRequest>,
    seen: HashSet<FolderRequest>,
    last_activity: Instant,
}

impl Default for BatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchState {
    pub fn new() -> Self {
        Self {
            requests: Vec::new(),
            seen: HashSet::new(),
            last_activity: Instant::now(),
        }
    }

    /// Append requests in order, skipping ones already in this batch.
    /// Any non-empty input counts as activity. Returns how many were new.
    pub fn absorb<I>(&mut self, requests: I) -> usize
    where
        I: IntoIterator<Item = FolderRequest>,
    {
        let mut received = false;
        let mut added = 0;
        for req in requests {
            received = true;
            if self.seen.insert(req.clone()) {
                self.requests.push(req);
                added += 1;
            }
        }
        if received {
            self.last_activity = Instant::now();
        }
        added
    }

    pub fn quiet_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Hand the merged list over and start a fresh batch.
    pub fn take(&mut self) -> Vec<FolderRequest> {
        self.seen.clear();
        std::mem::take(&mut self.requests)
    }
}
