//! Per-worker test data.
//!
//! Before anything is timed, each worker derives the full list of keys it will send, plus the
//! members a container command writes with each key. The shape of a dataset is fully determined
//! by the [`Workload`]; only the random letters inside keys and members change between runs.
//!
//! ## Key Format
//!
//! Keys start with the upper-case command name. What follows depends on the key length `klen`
//! (the name prefix is not counted in `klen`):
//!
//! - `klen >= 9`: 3-digit worker index, `klen - 9` random letters, 6-digit request index, e.g.
//!   `SET007abcdef000042` for worker 7, request 42, `klen` 15.
//! - `3 <= klen < 9`: `klen - 3` random letters, then the 3-digit worker index. The request index
//!   is not part of the key, so the keys of one worker only differ in their random letters.
//! - `klen < 3`: the request index right-aligned in 5 columns, e.g. `GET   42`.
//!
//! This format is shared with existing result corpora and must not change.

use crate::random::{random_string, time_seeded_rng};
use crate::Command;
use rand::Rng;

/// What every worker prepares.
#[derive(Clone, Debug, PartialEq)]
pub struct Workload {
    pub command: Command,
    /// Requests per worker.
    pub requests: usize,
    /// Members per key for container commands.
    pub items: usize,
    pub klen: usize,
    pub vlen: usize,
}

/// The data one worker replays.
#[derive(Clone, Debug, Default)]
pub struct WorkerDataset {
    pub keys: Vec<String>,
    /// SADD/LPUSH/RPUSH only.
    pub members: Vec<String>,
    /// ZADD only.
    pub scored_members: Vec<(String, f64)>,
    /// HMSET only. Nothing issues HMSET, so these are built and never read.
    pub fields: Vec<String>,
}

fn needs_members(command: &Command) -> bool {
    matches!(command.name(), "SADD" | "LPUSH" | "RPUSH")
}

fn needs_fields(command: &Command) -> bool {
    command.name() == "HMSET"
}

impl Workload {
    /// The key of request `request` of worker `worker`.
    pub fn key(&self, worker: usize, request: usize) -> String {
        let cmd = self.command.name();
        if self.klen >= 9 {
            format!(
                "{}{:03}{}{:06}",
                cmd,
                worker,
                random_string(self.klen - 9),
                request
            )
        } else if self.klen >= 3 {
            format!("{}{}{:03}", cmd, random_string(self.klen - 3), worker)
        } else {
            format!("{}{:>5}", cmd, request)
        }
    }

    fn member(&self, item: usize) -> String {
        if self.klen >= 3 {
            format!("{}{:03}", random_string(self.klen - 3), item)
        } else {
            format!("{:>5}", item)
        }
    }

    fn scored_member(&self, item: usize, rng: &mut impl Rng) -> (String, f64) {
        let member = if self.klen >= 3 {
            format!("{}{}", random_string(self.vlen.saturating_sub(1)), item)
        } else {
            format!("{:>5}", item)
        };
        (member, rng.random::<f64>())
    }

    fn field(&self, worker: usize, item: usize) -> String {
        if self.klen >= 3 {
            format!("{}{:03}", random_string(self.klen - 3), worker)
        } else {
            format!("{:>5}", item)
        }
    }

    /// Generate the dataset of one worker.
    pub fn build(&self, worker: usize) -> WorkerDataset {
        let keys = (0..self.requests).map(|j| self.key(worker, j)).collect();
        let mut dataset = WorkerDataset {
            keys,
            ..Default::default()
        };
        if needs_fields(&self.command) {
            dataset.fields = (0..self.items).map(|j| self.field(worker, j)).collect();
        }
        if needs_members(&self.command) {
            dataset.members = (0..self.items).map(|j| self.member(j)).collect();
        }
        if self.command == Command::ZAdd {
            let mut rng = time_seeded_rng();
            dataset.scored_members = (0..self.items)
                .map(|j| self.scored_member(j, &mut rng))
                .collect();
        }
        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workload(cmd: &str, klen: usize) -> Workload {
        Workload {
            command: Command::parse(cmd),
            requests: 100,
            items: 16,
            klen,
            vlen: 10,
        }
    }

    fn is_letters(s: &str) -> bool {
        s.bytes().all(|b| b.is_ascii_alphabetic())
    }

    #[test]
    fn long_key_layout() {
        let w = workload("set", 15);
        let key = w.key(7, 42);
        assert_eq!(key.len(), "SET".len() + 15);
        assert!(key.starts_with("SET007"));
        assert!(key.ends_with("000042"));
        assert!(is_letters(&key[6..12]));
    }

    #[test]
    fn long_key_without_random_part() {
        let w = workload("get", 9);
        assert_eq!(w.key(12, 345), "GET012000345");
    }

    #[test]
    fn medium_key_layout() {
        let w = workload("hset", 8);
        let key = w.key(5, 99);
        assert_eq!(key.len(), "HSET".len() + 8);
        assert!(key.starts_with("HSET"));
        assert!(key.ends_with("005"));
        assert!(is_letters(&key[4..9]));
    }

    #[test]
    fn medium_keys_do_not_embed_request_index() {
        let w = workload("set", 3);
        // no random letters left, so every request of a worker maps to the same key
        assert_eq!(w.key(4, 0), "SET004");
        assert_eq!(w.key(4, 1), "SET004");
    }

    #[test]
    fn short_key_layout() {
        let w = workload("get", 2);
        assert_eq!(w.key(3, 42), "GET   42");
        assert_eq!(w.key(3, 123456), "GET123456");
    }

    #[test]
    fn shape() {
        for cmd in ["set", "get", "hset", "lrange", "smembers", "zrange"] {
            let d = workload(cmd, 10).build(1);
            assert_eq!(d.keys.len(), 100);
            assert!(d.members.is_empty());
            assert!(d.scored_members.is_empty());
            assert!(d.fields.is_empty());
        }
        for cmd in ["sadd", "lpush", "rpush"] {
            let d = workload(cmd, 10).build(1);
            assert_eq!(d.keys.len(), 100);
            assert_eq!(d.members.len(), 16);
            assert!(d.scored_members.is_empty());
        }
        let d = workload("zadd", 10).build(1);
        assert_eq!(d.keys.len(), 100);
        assert_eq!(d.scored_members.len(), 16);
        assert!(d.members.is_empty());
        let d = workload("hmset", 10).build(1);
        assert_eq!(d.fields.len(), 16);
    }

    #[test]
    fn zero_requests() {
        let mut w = workload("sadd", 10);
        w.requests = 0;
        w.items = 0;
        let d = w.build(0);
        assert!(d.keys.is_empty());
        assert!(d.members.is_empty());
    }

    #[test]
    fn keys_unique_per_worker_and_request() {
        let w = workload("set", 10);
        let mut all: Vec<String> = (0..4).flat_map(|i| w.build(i).keys).collect();
        let len = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), len);
    }

    #[test]
    fn members_layout() {
        let d = workload("sadd", 10).build(9);
        for (j, m) in d.members.iter().enumerate() {
            assert_eq!(m.len(), 10);
            assert!(is_letters(&m[..7]));
            assert_eq!(&m[7..], format!("{:03}", j));
        }
        let d = workload("lpush", 1).build(9);
        assert_eq!(d.members[3], "    3");
    }

    #[test]
    fn scored_members_layout() {
        let d = workload("zadd", 10).build(0);
        for (j, (m, score)) in d.scored_members.iter().enumerate() {
            let suffix = j.to_string();
            assert!(m.ends_with(&suffix));
            assert_eq!(m.len(), 9 + suffix.len());
            assert!((0.0..1.0).contains(score));
        }
        let d = workload("zadd", 2).build(0);
        assert_eq!(d.scored_members[15].0, "   15");
    }

    #[test]
    fn fields_carry_worker_index() {
        let d = workload("hmset", 6).build(21);
        for f in d.fields.iter() {
            assert_eq!(f.len(), 6);
            assert!(f.ends_with("021"));
        }
    }

    #[test]
    fn zero_value_length() {
        let mut w = workload("zadd", 10);
        w.vlen = 0;
        let d = w.build(0);
        assert_eq!(d.scored_members[5].0, "5");
    }
}
