#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! A load generator for key-value servers that speak the Redis protocol.
//!
//! `respbench` measures the throughput and the mean per-request latency of a single command type
//! (`SET`, `GET`, `HSET`, `HGET`, `LPUSH`, `LRANGE`, `SADD`, `SMEMBERS`, `ZADD`, `ZRANGE`) issued by
//! a fixed number of concurrent workers. It can run against a list of independent endpoints, in
//! which case every endpoint receives the full workload, or against a single logical cluster.
//!
//! A run has two phases that never overlap:
//!
//! - **prepare**: every worker generates its own keys (and, for container commands, the members
//!   it will write) into a [`corpus::PreparedCorpus`]. Nothing is timed here.
//! - **execute**: every worker opens its own connection and replays its slice of the corpus,
//!   one request at a time. Only this phase is timed.
//!
//! The result is a single summary line (see [`metrics::RunMetrics`]) that goes to the diagnostic
//! log and, optionally, to the console.
//!
//! Targets are pluggable. A store implements [`Target`] (how to open a per-worker handle) and
//! [`TargetHandle`] (the command capabilities). The built-in ones live in [`mod@stores`].
//!
//! More detailed usage could be found in the module-level rustdocs:
//!
//! - [`mod@bench`] for the configuration format of a run.
//! - [`mod@workload`] for the way keys and members are derived.
//! - [`cmdline()`] for the usage of the command line interface.

use crate::error::{ConnectionError, OpResult};
use std::fmt;

/// The command a run exercises.
///
/// Names are case-insensitive. Anything outside the ten benchmarked commands is kept as
/// [`Command::Other`]: data is still prepared for it where the workload knows how, but the
/// executor issues nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Set,
    Get,
    HSet,
    HGet,
    LPush,
    LRange,
    SAdd,
    SMembers,
    ZAdd,
    ZRange,
    Other(String),
}

impl Command {
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_ascii_uppercase();
        match name.as_str() {
            "SET" => Command::Set,
            "GET" => Command::Get,
            "HSET" => Command::HSet,
            "HGET" => Command::HGet,
            "LPUSH" => Command::LPush,
            "LRANGE" => Command::LRange,
            "SADD" => Command::SAdd,
            "SMEMBERS" => Command::SMembers,
            "ZADD" => Command::ZAdd,
            "ZRANGE" => Command::ZRange,
            _ => Command::Other(name),
        }
    }

    /// The upper-case name, which is also the prefix of every generated key.
    pub fn name(&self) -> &str {
        match self {
            Command::Set => "SET",
            Command::Get => "GET",
            Command::HSet => "HSET",
            Command::HGet => "HGET",
            Command::LPush => "LPUSH",
            Command::LRange => "LRANGE",
            Command::SAdd => "SADD",
            Command::SMembers => "SMEMBERS",
            Command::ZAdd => "ZADD",
            Command::ZRange => "ZRANGE",
            Command::Other(name) => name.as_str(),
        }
    }

    /// Commands that create or modify a key. Only these get the per-request timestamp suffix.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::Set | Command::HSet | Command::LPush | Command::SAdd | Command::ZAdd
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A benchmark target from which per-worker handles are opened.
///
/// A single target value is shared by all worker threads, so opening must be thread-safe. The
/// handle it returns is owned by exactly one worker and is closed when dropped.
pub trait Target: Send + Sync + 'static {
    /// Open and liveness-check a handle.
    ///
    /// In standalone mode `endpoint` is the address this worker replays against. In cluster mode
    /// it is `None` and the handle spans every configured address.
    fn connect(&self, endpoint: Option<&str>) -> Result<Box<dyn TargetHandle>, ConnectionError>;

    /// Open a plain handle to the primary (first) endpoint and the configured database. Used for
    /// the post-run flush.
    fn connect_primary(&self) -> Result<Box<dyn TargetHandle>, ConnectionError>;
}

/// The command capabilities of an open connection.
///
/// Replies are not inspected: a call succeeds if the server answered without an error. A missing
/// key is a successful reply.
pub trait TargetHandle {
    fn set(&mut self, key: &str, value: &str) -> OpResult;

    fn get(&mut self, key: &str) -> OpResult;

    fn hset(&mut self, key: &str, field: &str, value: i64) -> OpResult;

    fn hget(&mut self, key: &str, field: &str) -> OpResult;

    fn lpush(&mut self, key: &str, members: &[String]) -> OpResult;

    fn lrange(&mut self, key: &str, start: isize, stop: isize) -> OpResult;

    fn sadd(&mut self, key: &str, members: &[String]) -> OpResult;

    fn smembers(&mut self, key: &str) -> OpResult;

    /// `members` are `(member, score)` pairs.
    fn zadd(&mut self, key: &str, members: &[(String, f64)]) -> OpResult;

    fn zrange(&mut self, key: &str, start: isize, stop: isize) -> OpResult;

    /// Remove every key of the currently selected database.
    fn flushdb(&mut self) -> OpResult;
}

pub mod bench;
mod cmdline;
pub mod corpus;
pub mod diagnostic;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod random;
pub mod stores;
pub mod thread;
pub mod workload;

pub use cmdline::cmdline;
