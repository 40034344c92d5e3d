//! Built-in benchmark targets.
//!
//! ## Configuration Format
//!
//! The connection options sit at the top level of a run's configuration (see [`mod@crate::bench`]):
//!
//! ```toml
//! address = "10.0.0.1:6379,10.0.0.2:6379" # comma-separated endpoints
//! db = 0                                   # standalone only
//! pwd = ""                                 # empty means no AUTH
//! connect_timeout = 10.0                   # seconds
//! io_timeout = 300.0                       # seconds, both read and write
//! cluster_mode = false
//! dry_run = false
//! ```
//!
//! Which target is used follows from those options:
//!
//! - [`standalone::StandaloneTarget`] (default): every endpoint is a separate server. Each worker
//!   handle talks to exactly one of them, on database `db`.
//! - [`cluster::ClusterTarget`] (`cluster_mode = true`): all endpoints are seeds of one cluster,
//!   and each worker handle spans all of them.
//! - [`null::NullTarget`] (`dry_run = true`): accepts every command and does nothing. It can be
//!   used to measure the overhead of the harness itself.
//!
//! Both real targets share [`RespHandle`], so every command is encoded the same way regardless of
//! topology.

use crate::error::OpResult;
use crate::{Target, TargetHandle};
use redis::{Cmd, ConnectionLike, Value};
use std::sync::Arc;
use std::time::Duration;

/// Connection options shared by the built-in targets.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetOpt {
    /// `host:port` of every endpoint. The first one is the primary.
    pub endpoints: Vec<String>,
    pub password: Option<String>,
    pub db: i64,
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
}

impl TargetOpt {
    pub fn primary(&self) -> &str {
        self.endpoints.first().map(|e| e.as_str()).unwrap_or_default()
    }
}

/// Pick the target for a run.
pub fn open_target(opt: &TargetOpt, cluster: bool, dry_run: bool) -> Arc<dyn Target> {
    if dry_run {
        Arc::new(null::NullTarget::new())
    } else if cluster {
        Arc::new(cluster::ClusterTarget::new(opt))
    } else {
        Arc::new(standalone::StandaloneTarget::new(opt))
    }
}

/// Check that the server answers.
pub(crate) fn ping(con: &mut dyn ConnectionLike) -> redis::RedisResult<()> {
    redis::cmd("PING").query::<String>(con).map(|_| ())
}

/// A worker's connection, standalone or cluster. Replies are read and dropped.
pub struct RespHandle<C: ConnectionLike>(C);

impl<C: ConnectionLike> RespHandle<C> {
    pub fn new(con: C) -> Self {
        Self(con)
    }

    fn run(&mut self, cmd: &Cmd) -> OpResult {
        cmd.query::<Value>(&mut self.0)?;
        Ok(())
    }
}

impl<C: ConnectionLike> TargetHandle for RespHandle<C> {
    fn set(&mut self, key: &str, value: &str) -> OpResult {
        self.run(redis::cmd("SET").arg(key).arg(value))
    }

    fn get(&mut self, key: &str) -> OpResult {
        self.run(redis::cmd("GET").arg(key))
    }

    fn hset(&mut self, key: &str, field: &str, value: i64) -> OpResult {
        self.run(redis::cmd("HSET").arg(key).arg(field).arg(value))
    }

    fn hget(&mut self, key: &str, field: &str) -> OpResult {
        self.run(redis::cmd("HGET").arg(key).arg(field))
    }

    fn lpush(&mut self, key: &str, members: &[String]) -> OpResult {
        self.run(redis::cmd("LPUSH").arg(key).arg(members))
    }

    fn lrange(&mut self, key: &str, start: isize, stop: isize) -> OpResult {
        self.run(redis::cmd("LRANGE").arg(key).arg(start).arg(stop))
    }

    fn sadd(&mut self, key: &str, members: &[String]) -> OpResult {
        self.run(redis::cmd("SADD").arg(key).arg(members))
    }

    fn smembers(&mut self, key: &str) -> OpResult {
        self.run(redis::cmd("SMEMBERS").arg(key))
    }

    fn zadd(&mut self, key: &str, members: &[(String, f64)]) -> OpResult {
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key);
        for (member, score) in members {
            cmd.arg(*score).arg(member);
        }
        self.run(&cmd)
    }

    fn zrange(&mut self, key: &str, start: isize, stop: isize) -> OpResult {
        self.run(redis::cmd("ZRANGE").arg(key).arg(start).arg(stop))
    }

    fn flushdb(&mut self) -> OpResult {
        self.run(&redis::cmd("FLUSHDB"))
    }
}

pub mod cluster;
pub mod null;
pub mod standalone;

#[cfg(test)]
mod tests {
    use super::*;

    fn opt() -> TargetOpt {
        TargetOpt {
            endpoints: vec!["127.0.0.1:1".to_string(), "127.0.0.1:2".to_string()],
            password: None,
            db: 0,
            connect_timeout: Duration::from_millis(200),
            io_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn primary_is_first() {
        assert_eq!(opt().primary(), "127.0.0.1:1");
        let mut o = opt();
        o.endpoints.clear();
        assert_eq!(o.primary(), "");
    }

    #[test]
    fn dry_run_accepts_everything() {
        let target = open_target(&opt(), false, true);
        let mut handle = target.connect(Some("127.0.0.1:1")).unwrap();
        assert!(handle.set("k", "v").is_ok());
        assert!(handle.zadd("k", &[("m".to_string(), 0.5)]).is_ok());
        assert!(handle.flushdb().is_ok());
        assert!(target.connect_primary().is_ok());
    }

    #[test]
    fn unreachable_standalone_fails_fast() {
        // port 1 is reserved and normally closed
        let target = open_target(&opt(), false, false);
        let err = target.connect(Some("127.0.0.1:1")).err().unwrap();
        assert_eq!(err.endpoint, "127.0.0.1:1");
    }

    #[test]
    fn unreachable_cluster_fails_fast() {
        let target = open_target(&opt(), true, false);
        let err = target.connect(None).err().unwrap();
        assert_eq!(err.endpoint, "127.0.0.1:1,127.0.0.1:2");
    }
}
