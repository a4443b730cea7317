use std::collections::VecDeque;
use std::fmt;

use common::Job;

/// Phase of the computation. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Map jobs are pending or leased.
    Mapping,

    /// Every map job is confirmed, reduce jobs exist.
    Reducing,

    /// Every reduce job is confirmed.
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Mapping => "mapping",
            Phase::Reducing => "reducing",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
/// Job queue.
///
/// Holds jobs waiting to be leased, oldest first. Requeued jobs go to the
/// back.
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    /// Default Ctor.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of jobs waiting.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Push new job.
    pub fn push_job(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    /// Take the oldest job.
    pub fn pop_job(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }
}
