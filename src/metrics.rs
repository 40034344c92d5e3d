//! The result of a run.
//!
//! ## Output Format
//!
//! A run produces exactly one summary line. Its wording and number formatting are the same as
//! those of the tool whose result corpora this crate keeps feeding, so downstream scripts can
//! parse old and new results alike:
//!
//! ```txt
//! 测试的命令为：SET，客户端数量:20,每个连接发起请求数量为：100,总请求数量为：2000,容器类命令每个key的元素个数为：16，执行时长为: 500.000ms,QPS为4000.000,单请求处理平均耗时为：0.250000ms
//! ```
//!
//! In order: command, workers, requests per worker, total requests, items per key, duration of
//! the execution phase in ms (3 decimals), requests per second (3 decimals) and mean time per
//! request in ms (6 decimals). The line ends with a single space.

use crate::Command;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct RunMetrics {
    pub command: Command,
    pub workers: usize,
    pub requests_per_worker: usize,
    pub total_requests: u64,
    pub items: usize,
    /// Wall-clock time of the execution phase only.
    pub duration: Duration,
}

impl RunMetrics {
    /// `replays` is how many times each worker's dataset was replayed: the endpoint count in
    /// standalone mode, 1 in cluster mode.
    pub fn new(
        command: Command,
        workers: usize,
        requests_per_worker: usize,
        replays: usize,
        items: usize,
        duration: Duration,
    ) -> Self {
        let total_requests = (workers * requests_per_worker * replays) as u64;
        Self {
            command,
            workers,
            requests_per_worker,
            total_requests,
            items,
            duration,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }

    pub fn qps(&self) -> f64 {
        self.total_requests as f64 * 1000.0 / self.duration_ms()
    }

    pub fn avg_latency_ms(&self) -> f64 {
        self.duration_ms() / self.total_requests as f64
    }

    pub fn summary(&self) -> String {
        format!(
            "测试的命令为：{}，客户端数量:{},每个连接发起请求数量为：{},总请求数量为：{},\
             容器类命令每个key的元素个数为：{}，执行时长为: {:.3}ms,QPS为{:.3},\
             单请求处理平均耗时为：{:.6}ms ",
            self.command,
            self.workers,
            self.requests_per_worker,
            self.total_requests,
            self.items,
            self.duration_ms(),
            self.qps(),
            self.avg_latency_ms(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_single_endpoint() {
        let m = RunMetrics::new(Command::Set, 20, 100, 1, 16, Duration::from_millis(500));
        assert_eq!(m.total_requests, 2000);
        assert_eq!(format!("{:.3}", m.qps()), "4000.000");
        assert_eq!(format!("{:.6}", m.avg_latency_ms()), "0.250000");
    }

    #[test]
    fn replays_multiply_total() {
        let m = RunMetrics::new(Command::Get, 5, 10, 3, 16, Duration::from_millis(150));
        assert_eq!(m.total_requests, 150);
        assert_eq!(format!("{:.3}", m.qps()), "1000.000");
        assert_eq!(format!("{:.6}", m.avg_latency_ms()), "1.000000");
    }

    #[test]
    fn summary_format() {
        let m = RunMetrics::new(Command::Set, 20, 100, 1, 16, Duration::from_millis(500));
        assert_eq!(
            m.summary(),
            "测试的命令为：SET，客户端数量:20,每个连接发起请求数量为：100,总请求数量为：2000,\
             容器类命令每个key的元素个数为：16，执行时长为: 500.000ms,QPS为4000.000,\
             单请求处理平均耗时为：0.250000ms "
        );
    }

    #[test]
    fn sub_millisecond_duration() {
        let m = RunMetrics::new(Command::ZAdd, 1, 4, 1, 16, Duration::from_micros(1500));
        assert!(m.summary().contains("执行时长为: 1.500ms"));
        assert!(m.summary().contains("单请求处理平均耗时为：0.375000ms"));
    }
}
