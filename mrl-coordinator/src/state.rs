//! The coordinator's task-assignment state machine.
//!
//! Nothing in here is async or locked. [`crate::core::MRCoordinator`]
//! owns one [`CoordinatorState`] behind a mutex and every request handler
//! and lease timer goes through it.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use common::codec::partition_file_name;
use common::rpc::TaskId;
use common::{Job, JobKind};

use crate::jobs::{JobQueue, Phase};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Already resolved by a report or by lease expiry, or never issued.
    #[error("unknown task id {0}")]
    UnknownTask(TaskId),
}

/// A job leased to a worker.
#[derive(Debug)]
pub struct Lease {
    pub job: Job,
    pub deadline: Instant,

    /// Cancels the lease timer once a report resolves the lease.
    pub cancel: CancellationToken,
}

/// Counters for `mrl-ctl status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    pub pending: usize,
    pub leased: usize,
    pub maps_done: usize,
    pub map_total: u32,
    pub reduces_done: usize,
    pub shard_count: u32,
}

#[derive(Debug)]
pub struct CoordinatorState {
    /// Jobs waiting to be leased.
    queue: JobQueue,

    /// Outstanding leases. Removing an entry resolves it.
    leases: HashMap<TaskId, Lease>,

    phase: Phase,

    map_total: u32,

    /// Indices of confirmed map jobs.
    maps_done: HashSet<u32>,

    /// Indices of confirmed reduce jobs.
    reduces_done: HashSet<u32>,

    shard_count: u32,

    reduce_jobs_created: bool,
}

impl CoordinatorState {
    /// Seed one map job per input shard.
    pub fn new(inputs: Vec<String>, shard_count: u32) -> Self {
        let map_total = inputs.len() as u32;
        let mut queue = JobQueue::new();
        for (index, input) in inputs.into_iter().enumerate() {
            queue.push_job(Job::map(index as u32, input, shard_count));
        }

        let mut state = Self {
            queue,
            leases: HashMap::new(),
            phase: Phase::Mapping,
            map_total,
            maps_done: HashSet::new(),
            reduces_done: HashSet::new(),
            shard_count,
            reduce_jobs_created: false,
        };

        // No input at all: the map stage is already over.
        state.maybe_start_reducing();
        state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Lease the next pending job under `task_id`.
    ///
    /// Returns `None` when nothing is pending. The caller owns the
    /// returned token and must start the lease timer with it.
    pub fn assign(&mut self, task_id: TaskId, lease: Duration) -> Option<(Job, CancellationToken)> {
        let job = loop {
            let job = self.queue.pop_job()?;
            if self.is_confirmed(&job) {
                debug!("dropping pending copy of confirmed job {}", job);
                continue;
            }
            break job;
        };

        let cancel = CancellationToken::new();
        info!("assigning job {} as task {}", job, task_id);
        self.leases.insert(
            task_id,
            Lease {
                job: job.clone(),
                deadline: Instant::now() + lease,
                cancel: cancel.clone(),
            },
        );

        Some((job, cancel))
    }

    /// Resolve the lease for `task_id` as completed.
    pub fn complete(&mut self, task_id: &str, reported: &Job) -> Result<(), CoordinatorError> {
        let lease = self
            .leases
            .remove(task_id)
            .ok_or_else(|| CoordinatorError::UnknownTask(task_id.to_string()))?;
        lease.cancel.cancel();

        if lease.job.identity() != reported.identity() {
            warn!(
                "task {} reported job {} but was leased job {}",
                task_id, reported, lease.job
            );
        }

        // Bookkeeping uses the leased job, not what the worker claims.
        let job = lease.job;
        let first = match job.kind {
            JobKind::Map => self.maps_done.insert(job.index),
            JobKind::Reduce => self.reduces_done.insert(job.index),
            JobKind::None => false,
        };

        if first {
            info!("job {} confirmed by task {}", job, task_id);
        } else {
            debug!("job {} was already confirmed, task {} counted once", job, task_id);
        }

        match job.kind {
            JobKind::Map => self.maybe_start_reducing(),
            JobKind::Reduce => self.maybe_finish(),
            JobKind::None => {}
        }

        Ok(())
    }

    /// Resolve the lease for `task_id` as lost and requeue its job.
    ///
    /// Returns false if a report resolved the lease first.
    pub fn expire(&mut self, task_id: &str) -> bool {
        let Some(lease) = self.leases.remove(task_id) else {
            return false;
        };

        if self.is_confirmed(&lease.job) {
            return true;
        }

        warn!(
            "lease of task {} for job {} expired, requeueing",
            task_id, lease.job
        );
        self.queue.push_job(lease.job);
        true
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            pending: self.queue.len(),
            leased: self.leases.len(),
            maps_done: self.maps_done.len(),
            map_total: self.map_total,
            reduces_done: self.reduces_done.len(),
            shard_count: self.shard_count,
        }
    }

    /// Deadline of an outstanding lease.
    pub fn deadline(&self, task_id: &str) -> Option<Instant> {
        self.leases.get(task_id).map(|lease| lease.deadline)
    }

    fn is_confirmed(&self, job: &Job) -> bool {
        match job.kind {
            JobKind::Map => self.maps_done.contains(&job.index),
            JobKind::Reduce => self.reduces_done.contains(&job.index),
            JobKind::None => true,
        }
    }

    fn maybe_start_reducing(&mut self) {
        if self.reduce_jobs_created || self.maps_done.len() < self.map_total as usize {
            return;
        }
        self.reduce_jobs_created = true;

        for reduce_index in 0..self.shard_count {
            let inputs = (0..self.map_total)
                .map(|map_index| partition_file_name(map_index, reduce_index))
                .collect();
            self.queue
                .push_job(Job::reduce(reduce_index, inputs, self.shard_count));
        }

        self.phase = Phase::Reducing;
        info!(
            "all {} map jobs confirmed, created {} reduce jobs",
            self.map_total, self.shard_count
        );

        // Zero shards leaves nothing to reduce.
        self.maybe_finish();
    }

    fn maybe_finish(&mut self) {
        if self.phase != Phase::Reducing || self.reduces_done.len() < self.shard_count as usize {
            return;
        }
        self.phase = Phase::Done;
        info!("all {} reduce jobs confirmed, done", self.shard_count);
    }
}
