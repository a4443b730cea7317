use std::fmt;

/// What a job asks a worker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// No work was handed out.
    None,

    /// Partition one input shard into `shard_count` intermediate files.
    Map,

    /// Merge every intermediate file of one reduce shard.
    Reduce,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::None => "none",
            JobKind::Map => "map",
            JobKind::Reduce => "reduce",
        };
        f.write_str(name)
    }
}

/// An immutable description of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// The kind of work.
    pub kind: JobKind,

    /// Source identifiers. A single input shard for a map job, the
    /// partition files of one reduce shard for a reduce job.
    pub inputs: Vec<String>,

    /// Number of reduce shards.
    pub shard_count: u32,

    /// Position of the job within its stage: the input shard index of a
    /// map job or the reduce shard index of a reduce job.
    pub index: u32,
}

impl Job {
    /// The sentinel handed out when there is no work.
    pub fn none() -> Self {
        Self {
            kind: JobKind::None,
            inputs: vec![],
            shard_count: 0,
            index: 0,
        }
    }

    pub fn map(index: u32, input: impl Into<String>, shard_count: u32) -> Self {
        Self {
            kind: JobKind::Map,
            inputs: vec![input.into()],
            shard_count,
            index,
        }
    }

    pub fn reduce(index: u32, inputs: Vec<String>, shard_count: u32) -> Self {
        Self {
            kind: JobKind::Reduce,
            inputs,
            shard_count,
            index,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.kind == JobKind::None
    }

    /// Identity of the job for completion bookkeeping. Two assignments of
    /// the same job share it.
    #[inline]
    pub fn identity(&self) -> (JobKind, u32) {
        (self.kind, self.index)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.index)
    }
}
