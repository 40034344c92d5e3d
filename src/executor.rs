//! Replaying one worker's dataset over one connection.

use crate::diagnostic::DiagnosticLog;
use crate::error::OpResult;
use crate::workload::WorkerDataset;
use crate::{Command, TargetHandle};
use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};

/// The hash field written by `HSET` and read by `HGET`. Kept as is so that `HGET` runs can read
/// hashes written by earlier tools.
pub const HASH_FIELD: &str = "filed_test";

pub const SUFFIX_LEN: usize = 12;

/// The last [`SUFFIX_LEN`] decimal digits of the wall clock in nanoseconds, zero-padded.
pub fn timestamp_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!(
        "{:0width$}",
        nanos % 10u128.pow(SUFFIX_LEN as u32),
        width = SUFFIX_LEN
    )
}

/// The key actually sent for a prepared key.
///
/// With `add_time`, writes get a suffix taken at request time. Replays of the same dataset
/// against several endpoints then never write the same key, without regenerating the corpus.
pub fn effective_key<'a>(key: &'a str, command: &Command, add_time: bool) -> Cow<'a, str> {
    if add_time && command.is_write() {
        Cow::Owned(format!("{}{}", key, timestamp_suffix()))
    } else {
        Cow::Borrowed(key)
    }
}

/// Per-run parameters of the executor.
pub struct ExecutorContext<'a> {
    pub command: &'a Command,
    pub requests: usize,
    pub add_time: bool,
    /// The value of every `SET`.
    pub value: &'a str,
    pub log: &'a DiagnosticLog,
}

fn dispatch(
    handle: &mut dyn TargetHandle,
    command: &Command,
    key: &str,
    value: &str,
    dataset: &WorkerDataset,
) -> OpResult {
    match command {
        Command::Set => handle.set(key, value),
        Command::Get => handle.get(key),
        Command::HSet => handle.hset(key, HASH_FIELD, 0),
        Command::HGet => handle.hget(key, HASH_FIELD),
        Command::LPush => handle.lpush(key, &dataset.members),
        Command::LRange => handle.lrange(key, 0, -1),
        Command::SAdd => handle.sadd(key, &dataset.members),
        Command::SMembers => handle.smembers(key),
        Command::ZAdd => handle.zadd(key, &dataset.scored_members),
        Command::ZRange => handle.zrange(key, 0, -1),
        Command::Other(_) => Ok(()),
    }
}

/// Issue `ctx.requests` requests, one after another, for the keys of `dataset`.
///
/// A failed request is logged and skipped. Returns the number of failures.
pub fn execute(
    dataset: &WorkerDataset,
    handle: &mut dyn TargetHandle,
    ctx: &ExecutorContext,
) -> usize {
    let mut failures = 0;
    for j in 0..ctx.requests {
        let key = effective_key(&dataset.keys[j], ctx.command, ctx.add_time);
        if let Err(e) = dispatch(handle, ctx.command, &key, ctx.value, dataset) {
            ctx.log.record(&format!("command failed, details: {}", e));
            failures += 1;
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::tests::SharedBuf;
    use crate::error::OperationError;
    use crate::workload::Workload;

    /// Records every call as `"<CMD> <key> <args>"` and fails the requests listed in `fail_at`.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        fail_at: Vec<usize>,
    }

    impl Recorder {
        fn push(&mut self, call: String) -> OpResult {
            let n = self.calls.len();
            self.calls.push(call);
            if self.fail_at.contains(&n) {
                Err(OperationError::Other(format!("injected failure {}", n)))
            } else {
                Ok(())
            }
        }
    }

    impl TargetHandle for Recorder {
        fn set(&mut self, key: &str, value: &str) -> OpResult {
            self.push(format!("SET {} {}", key, value))
        }
        fn get(&mut self, key: &str) -> OpResult {
            self.push(format!("GET {}", key))
        }
        fn hset(&mut self, key: &str, field: &str, value: i64) -> OpResult {
            self.push(format!("HSET {} {} {}", key, field, value))
        }
        fn hget(&mut self, key: &str, field: &str) -> OpResult {
            self.push(format!("HGET {} {}", key, field))
        }
        fn lpush(&mut self, key: &str, members: &[String]) -> OpResult {
            self.push(format!("LPUSH {} {}", key, members.len()))
        }
        fn lrange(&mut self, key: &str, start: isize, stop: isize) -> OpResult {
            self.push(format!("LRANGE {} {} {}", key, start, stop))
        }
        fn sadd(&mut self, key: &str, members: &[String]) -> OpResult {
            self.push(format!("SADD {} {}", key, members.len()))
        }
        fn smembers(&mut self, key: &str) -> OpResult {
            self.push(format!("SMEMBERS {}", key))
        }
        fn zadd(&mut self, key: &str, members: &[(String, f64)]) -> OpResult {
            self.push(format!("ZADD {} {}", key, members.len()))
        }
        fn zrange(&mut self, key: &str, start: isize, stop: isize) -> OpResult {
            self.push(format!("ZRANGE {} {} {}", key, start, stop))
        }
        fn flushdb(&mut self) -> OpResult {
            self.push("FLUSHDB".to_string())
        }
    }

    fn run(cmd: &str, add_time: bool, fail_at: Vec<usize>) -> (Recorder, Vec<String>, usize) {
        let command = Command::parse(cmd);
        let workload = Workload {
            command: command.clone(),
            requests: 10,
            items: 4,
            klen: 10,
            vlen: 10,
        };
        let dataset = workload.build(0);
        let buf = SharedBuf::default();
        let log = DiagnosticLog::new(Box::new(buf.clone()), false);
        let mut handle = Recorder {
            fail_at,
            ..Default::default()
        };
        let ctx = ExecutorContext {
            command: &command,
            requests: 10,
            add_time,
            value: "vvvv",
            log: &log,
        };
        let failures = execute(&dataset, &mut handle, &ctx);
        (handle, buf.lines(), failures)
    }

    #[test]
    fn dispatch_per_command() {
        let expected = [
            ("set", "SET SET000", " vvvv"),
            ("get", "GET GET000", ""),
            ("hset", "HSET HSET000", " filed_test 0"),
            ("hget", "HGET HGET000", " filed_test"),
            ("lpush", "LPUSH LPUSH000", " 4"),
            ("lrange", "LRANGE LRANGE000", " 0 -1"),
            ("sadd", "SADD SADD000", " 4"),
            ("smembers", "SMEMBERS SMEMBERS000", ""),
            ("zadd", "ZADD ZADD000", " 4"),
            ("zrange", "ZRANGE ZRANGE000", " 0 -1"),
        ];
        for (cmd, prefix, args) in expected {
            let (handle, log, failures) = run(cmd, false, vec![]);
            assert_eq!(handle.calls.len(), 10, "{}", cmd);
            assert_eq!(failures, 0);
            assert!(log.is_empty());
            for (j, call) in handle.calls.iter().enumerate() {
                assert!(call.starts_with(prefix), "{}", call);
                assert!(call.ends_with(&format!("{:06}{}", j, args)), "{}", call);
            }
        }
    }

    #[test]
    fn unsupported_commands_are_silent() {
        for cmd in ["rpush", "hmset", "incr"] {
            let (handle, log, failures) = run(cmd, false, vec![]);
            assert!(handle.calls.is_empty());
            assert!(log.is_empty());
            assert_eq!(failures, 0);
        }
    }

    #[test]
    fn failures_are_logged_and_skipped() {
        let (handle, log, failures) = run("set", false, vec![2, 7]);
        assert_eq!(handle.calls.len(), 10);
        assert_eq!(failures, 2);
        assert_eq!(log.len(), 2);
        assert!(log[0].ends_with("--command failed, details: injected failure 2"));
        assert!(log[1].ends_with("--command failed, details: injected failure 7"));
    }

    #[test]
    fn add_time_suffixes_writes_only() {
        let (handle, _, _) = run("set", true, vec![]);
        for call in handle.calls.iter() {
            let key = call.split(' ').nth(1).unwrap();
            assert_eq!(key.len(), "SET".len() + 10 + SUFFIX_LEN);
            assert!(key[key.len() - SUFFIX_LEN..].bytes().all(|b| b.is_ascii_digit()));
        }
        let (handle, _, _) = run("get", true, vec![]);
        for call in handle.calls.iter() {
            let key = call.split(' ').nth(1).unwrap();
            assert_eq!(key.len(), "GET".len() + 10);
        }
    }

    #[test]
    fn replay_invariance() {
        let workload = Workload {
            command: Command::Set,
            requests: 20,
            items: 0,
            klen: 12,
            vlen: 10,
        };
        let dataset = workload.build(3);
        let replay = |add_time: bool| -> Vec<String> {
            dataset
                .keys
                .iter()
                .map(|k| effective_key(k, &Command::Set, add_time).into_owned())
                .collect()
        };
        assert_eq!(replay(false), replay(false));

        let first = replay(true);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = replay(true);
        for ((a, b), k) in first.iter().zip(second.iter()).zip(dataset.keys.iter()) {
            assert!(a.starts_with(k.as_str()) && b.starts_with(k.as_str()));
            assert_ne!(a[k.len()..], b[k.len()..]);
        }
    }

    #[test]
    fn suffix_shape() {
        let s = timestamp_suffix();
        assert_eq!(s.len(), SUFFIX_LEN);
        assert!(s.bytes().all(|b| b.is_ascii_digit()));
        assert!(s.parse::<u128>().unwrap() < 10u128.pow(SUFFIX_LEN as u32));
    }
}
