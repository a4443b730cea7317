//! Users supply a map and a reduce function, and a coordinator hands the
//! resulting tasks to a pool of workers. Intermediate and final data live on
//! a filesystem shared by the workers.

use std::fmt;
use std::fmt::Formatter;
use std::hash::Hasher;

use bytes::Bytes;

pub mod codec;
pub mod job;
pub mod rpc;
pub mod utils;

pub use job::{Job, JobKind};

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
///
/// This accomodates both batch (all keys emitted at once) and lazy
/// (keys only emitted when the iterator is consumed) map operations.
pub type MapOutput = anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<KeyValue>>>>;

/// A map function takes the source identifier as the key and the
/// full contents of that source as the value.
///
/// It returns an iterator that yields new key-value pairs.
pub type MapFn = fn(kv: KeyValue) -> MapOutput;

/// A reduce function takes in a key and an iterator over all values
/// emitted for that key. It returns an [`anyhow::Result`] containing
/// a single output value.
pub type ReduceFn =
    fn(key: Bytes, values: Box<dyn Iterator<Item = Bytes> + '_>) -> anyhow::Result<Bytes>;

/// A map reduce application.
///
/// Both functions must be deterministic: a task may run more than once.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KeyValue {
    /// The key.
    pub key: Bytes,

    /// The value.
    pub value: Bytes,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            String::from_utf8_lossy(&self.key),
            String::from_utf8_lossy(&self.value)
        )
    }
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Hashes an intermediate key. Compute a reduce bucket for a given key
/// by calculating `ihash(key) % n_reduce`.
///
/// Every map task must agree on this function, so it is a fixed FNV-1a
/// hash rather than a randomly seeded one.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// The reduce shard a key belongs to.
#[inline]
pub fn shard_for(key: &[u8], shard_count: u32) -> usize {
    (ihash(key) % shard_count.max(1)) as usize
}
