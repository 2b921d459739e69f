//! Sharder implementation for percentage rollouts.
use md5;

/// Number of buckets a toggle's population is divided into. Part of the wire contract shared
/// with the server that authors the splits; do not change.
pub const BUCKET_COUNT: u64 = 10_000;

pub trait Sharder {
    fn get_shard(&self, input: impl AsRef<[u8]>, total_shards: u64) -> u64;
}

/// The default (and only) sharder.
///
/// The hash function is pinned: every SDK evaluating the same snapshot must place the same user
/// into the same bucket, so this is a cross-implementation contract rather than a local choice.
pub struct Md5Sharder;

impl Sharder for Md5Sharder {
    fn get_shard(&self, input: impl AsRef<[u8]>, total_shards: u64) -> u64 {
        let hash = md5::compute(input);
        let value = u32::from_be_bytes(hash[0..4].try_into().unwrap());
        (value as u64) % total_shards
    }
}

impl Md5Sharder {
    /// Map a (bucketing key, toggle key) pair into [0, 1).
    pub fn bucket(&self, bucket_key: &str, toggle_key: &str) -> f64 {
        let shard = self.get_shard(format!("{bucket_key}{toggle_key}"), BUCKET_COUNT);
        shard as f64 / BUCKET_COUNT as f64
    }
}
