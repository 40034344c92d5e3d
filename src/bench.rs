//! The core benchmark functionality.
//!
//! A run exercises one command with a fixed number of workers. It goes through the following
//! phases, each of which is a group of threads that is spawned at once and joined as a whole
//! before the next phase starts:
//!
//! 1. **prepare**: one thread per worker generates that worker's keys and members into the
//!    shared [`PreparedCorpus`]. This phase is not timed.
//! 2. **execute**: one thread per worker (cluster mode) or per worker and endpoint (standalone
//!    mode) opens its own connection and replays the worker's dataset. The timer starts right
//!    before the first thread is spawned and stops once the last one has been joined. In
//!    standalone mode the same dataset is replayed once against every endpoint.
//! 3. **report**: the summary line is computed from the measured duration (see
//!    [`crate::metrics`]), written to the diagnostic log and echoed to stdout if enabled.
//! 4. **cleanup** (optional): the primary endpoint's database is flushed.
//!
//! If any execution thread fails to open its connection, no thread sends a single request and
//! the run ends with the connection error. A failed request, on the other hand, is only written
//! to the diagnostic log; the worker carries on with its next request.
//!
//! ## Configuration Format
//!
//! A run is configured by a flat TOML table. Every option is optional and falls back to the
//! default shown below:
//!
//! ```toml
//! cmd = "set"                # SET GET HSET HGET LPUSH LRANGE SADD SMEMBERS ZADD ZRANGE
//! workers = 20               # concurrent workers, each with its own connection
//! requests = 100             # requests per worker
//! items = 16                 # members per key for container commands
//! klen = 10                  # key length, see crate::workload
//! vlen = 10                  # value length
//! address = "127.0.0.1:6379" # comma-separated endpoints
//! db = 0
//! pwd = ""
//! cluster_mode = false       # treat all endpoints as one cluster
//! add_time = false           # suffix written keys with a timestamp at request time
//! clean = false              # flush the database after the run
//! output = true              # echo progress and summary to stdout
//! connect_timeout = 10.0     # seconds
//! io_timeout = 300.0         # seconds
//! log_dir = "."              # where the daily diagnostic log is written
//! pin = false                # pin worker threads to CPU cores
//! dry_run = false            # run against a target that does nothing
//! ```
//!
//! Options can be overwritten via environment variables prefixed with `RESPBENCH_` (for example,
//! `RESPBENCH_WORKERS=50`), and command line flags take precedence over both.

use crate::corpus::PreparedCorpus;
use crate::diagnostic::DiagnosticLog;
use crate::error::{BenchError, ConnectionError, Result};
use crate::executor::{execute, ExecutorContext};
use crate::metrics::RunMetrics;
use crate::random::random_string;
use crate::stores::TargetOpt;
use crate::thread::{join_all, JoinHandle, Thread};
use crate::workload::Workload;
use crate::{Command, Target};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::{debug, warn};
use parking_lot::Mutex;
use quanta::Instant;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::time::Duration;

// {{{ benchmark

const DEFAULT_ADDRESS: &str = "127.0.0.1:6379";
const DEFAULT_CMD: &str = "set";
const DEFAULT_WORKERS: usize = 20;
const DEFAULT_REQUESTS: usize = 100;
const DEFAULT_ITEMS: usize = 16;
const DEFAULT_KLEN: usize = 10;
const DEFAULT_VLEN: usize = 10;
const DEFAULT_CONNECT_TIMEOUT: f32 = 10.0;
const DEFAULT_IO_TIMEOUT: f32 = 300.0;

pub const ENV_PREFIX: &str = "RESPBENCH_";

/// The configuration of a run as deserialized from TOML, the environment or the command line.
///
/// See the module-level documentation for the meaning and the default of each option.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct BenchmarkOpt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub klen: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlen: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pwd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_timeout: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

fn parse_endpoints(address: &str) -> Result<Vec<String>> {
    let endpoints: Vec<String> = address
        .split(',')
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_string())
        .collect();
    if endpoints.is_empty() {
        return Err(BenchError::Config("address should not be empty".to_string()));
    }
    for e in endpoints.iter() {
        let valid = match e.rsplit_once(':') {
            Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
            None => false,
        };
        if !valid {
            return Err(BenchError::Config(format!(
                "endpoint {} should be in host:port form",
                e
            )));
        }
    }
    Ok(endpoints)
}

fn timeout(name: &str, secs: f32) -> Result<Duration> {
    match Duration::try_from_secs_f32(secs) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(BenchError::Config(format!("{} should be positive", name))),
    }
}

impl BenchmarkOpt {
    /// Fill every missing option with its default.
    fn apply_defaults(&mut self) {
        self.cmd = self.cmd.take().or_else(|| Some(DEFAULT_CMD.to_string()));
        self.workers = self.workers.or(Some(DEFAULT_WORKERS));
        self.requests = self.requests.or(Some(DEFAULT_REQUESTS));
        self.items = self.items.or(Some(DEFAULT_ITEMS));
        self.klen = self.klen.or(Some(DEFAULT_KLEN));
        self.vlen = self.vlen.or(Some(DEFAULT_VLEN));
        self.address = self
            .address
            .take()
            .or_else(|| Some(DEFAULT_ADDRESS.to_string()));
        self.db = self.db.or(Some(0));
        self.pwd = self.pwd.take().or_else(|| Some(String::new()));
        self.cluster_mode = self.cluster_mode.or(Some(false));
        self.add_time = self.add_time.or(Some(false));
        self.clean = self.clean.or(Some(false));
        self.output = self.output.or(Some(true));
        self.connect_timeout = self.connect_timeout.or(Some(DEFAULT_CONNECT_TIMEOUT));
        self.io_timeout = self.io_timeout.or(Some(DEFAULT_IO_TIMEOUT));
        self.log_dir = self.log_dir.take().or_else(|| Some(".".to_string()));
        self.pin = self.pin.or(Some(false));
        self.dry_run = self.dry_run.or(Some(false));
    }

    /// Checks that can be done before anything is prepared. Expects defaults to be applied.
    fn sanity(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(BenchError::Config("workers should be positive".to_string()));
        }
        if self.requests == Some(0) {
            return Err(BenchError::Config("requests should be positive".to_string()));
        }
        if self.db.is_some_and(|db| db < 0) {
            return Err(BenchError::Config("db should not be negative".to_string()));
        }
        Ok(())
    }
}

/// The immutable configuration of a run, shared by every worker.
#[derive(Debug, PartialEq)]
pub struct Benchmark {
    pub workload: Workload,
    pub workers: usize,
    pub target: TargetOpt,
    pub cluster: bool,
    pub add_time: bool,
    pub clean: bool,
    pub output: bool,
    pub pin: bool,
    pub dry_run: bool,
    pub log_dir: PathBuf,
}

impl Benchmark {
    pub fn new(opt: &BenchmarkOpt) -> Result<Self> {
        let mut opt = opt.clone();
        opt.apply_defaults();
        opt.sanity()?;
        // every option is set after apply_defaults
        let workload = Workload {
            command: Command::parse(&opt.cmd.unwrap_or_default()),
            requests: opt.requests.unwrap_or_default(),
            items: opt.items.unwrap_or_default(),
            klen: opt.klen.unwrap_or_default(),
            vlen: opt.vlen.unwrap_or_default(),
        };
        let password = opt.pwd.filter(|p| !p.is_empty());
        let target = TargetOpt {
            endpoints: parse_endpoints(&opt.address.unwrap_or_default())?,
            password,
            db: opt.db.unwrap_or_default(),
            connect_timeout: timeout(
                "connect_timeout",
                opt.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            )?,
            io_timeout: timeout("io_timeout", opt.io_timeout.unwrap_or(DEFAULT_IO_TIMEOUT))?,
        };
        Ok(Self {
            workload,
            workers: opt.workers.unwrap_or(DEFAULT_WORKERS),
            target,
            cluster: opt.cluster_mode.unwrap_or_default(),
            add_time: opt.add_time.unwrap_or_default(),
            clean: opt.clean.unwrap_or_default(),
            output: opt.output.unwrap_or(true),
            pin: opt.pin.unwrap_or_default(),
            dry_run: opt.dry_run.unwrap_or_default(),
            log_dir: PathBuf::from(opt.log_dir.unwrap_or_default()),
        })
    }

    /// How many times every worker's dataset is replayed.
    pub fn replays(&self) -> usize {
        if self.cluster {
            1
        } else {
            self.target.endpoints.len()
        }
    }

    /// The endpoint of every replay. `None` stands for the whole cluster.
    fn replay_endpoints(&self) -> Vec<Option<String>> {
        if self.cluster {
            vec![None]
        } else {
            self.target.endpoints.iter().cloned().map(Some).collect()
        }
    }
}

/// Parse a run from a TOML string. Environment variables override the string.
pub fn init(text: &str) -> Result<Benchmark> {
    let opt: BenchmarkOpt = Figment::new()
        .merge(Toml::string(text))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()?;
    debug!("Creating benchmark with the following configurations: {:?}", opt);
    Benchmark::new(&opt)
}

/// Load a run from an optional TOML file, the environment and the command line, in increasing
/// order of precedence.
pub fn load(file: Option<&Path>, overrides: &BenchmarkOpt) -> Result<Benchmark> {
    let mut figment = Figment::new();
    if let Some(path) = file {
        if !path.is_file() {
            return Err(BenchError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }
    let opt: BenchmarkOpt = figment
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(overrides))
        .extract()?;
    debug!("Creating benchmark with the following configurations: {:?}", opt);
    Benchmark::new(&opt)
}

// }}} benchmark

// {{{ bencher

struct WorkerContext {
    benchmark: Arc<Benchmark>,
    corpus: Arc<PreparedCorpus>,
    target: Arc<dyn Target>,
    log: Arc<DiagnosticLog>,
    /// The value of every `SET` in this run.
    value: Arc<str>,
    /// `None` in cluster mode.
    endpoint: Option<String>,
    /// Syncs all execution threads between opening their handles and the first request.
    barrier: Arc<Barrier>,
    /// The first connection error of any thread.
    failure: Arc<Mutex<Option<ConnectionError>>>,
    /// `(worker_id, task_id)`. Several tasks replay the same worker in standalone mode.
    worker_info: (usize, usize),
}

fn bench_prepare(benchmark: &Arc<Benchmark>, thread: &impl Thread) -> Arc<PreparedCorpus> {
    let corpus = Arc::new(PreparedCorpus::new(benchmark.workers));
    let handles: Vec<Box<dyn JoinHandle>> = (0..benchmark.workers)
        .map(|w| {
            let benchmark = benchmark.clone();
            let corpus = corpus.clone();
            thread.spawn(Box::new(move || {
                corpus.put(w, benchmark.workload.build(w));
            }))
        })
        .collect();
    join_all(handles);
    corpus
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

fn bench_worker(context: WorkerContext, thread: impl Thread) {
    let WorkerContext {
        benchmark,
        corpus,
        target,
        log,
        value,
        endpoint,
        barrier,
        failure,
        worker_info,
    } = context;

    let (id, task) = worker_info;
    // a panic here must not keep the other tasks waiting at the barrier
    let opened = panic::catch_unwind(AssertUnwindSafe(|| {
        if benchmark.pin {
            thread.pin(task);
        }
        target.connect(endpoint.as_deref())
    }))
    .unwrap_or_else(|payload| {
        let endpoint = endpoint
            .clone()
            .unwrap_or_else(|| benchmark.target.endpoints.join(","));
        Err(ConnectionError::new(
            endpoint,
            format!("connect panicked: {}", panic_message(payload.as_ref())),
        ))
    });

    let handle = match opened {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Worker {} failed to connect: {}", id, e);
            failure.lock().get_or_insert(e);
            None
        }
    };

    // nobody sends a request before every handle is open
    barrier.wait();

    if failure.lock().is_some() {
        return;
    }
    let (Some(mut handle), Some(dataset)) = (handle, corpus.get(id)) else {
        return;
    };
    let ctx = ExecutorContext {
        command: &benchmark.workload.command,
        requests: benchmark.workload.requests,
        add_time: benchmark.add_time,
        value: &value,
        log: &log,
    };
    let failures = execute(dataset, handle.as_mut(), &ctx);
    debug!(
        "Worker {} ({:?}) finished with {} failed requests",
        id, endpoint, failures
    );
}

/// Runs the execution phase and returns its wall-clock duration.
fn bench_execute(
    benchmark: &Arc<Benchmark>,
    corpus: &Arc<PreparedCorpus>,
    target: &Arc<dyn Target>,
    log: &Arc<DiagnosticLog>,
    thread: &(impl Thread + Clone + Send + 'static),
) -> Result<Duration> {
    if let Some(w) = (0..benchmark.workers).find(|w| corpus.get(*w).is_none()) {
        return Err(BenchError::MissingDataset(w));
    }

    let value: Arc<str> = random_string(benchmark.workload.vlen).into();
    let endpoints = benchmark.replay_endpoints();
    let nr_tasks = benchmark.workers * endpoints.len();
    let barrier = Arc::new(Barrier::new(nr_tasks));
    let failure = Arc::new(Mutex::new(None));
    debug!("Spawning {} execution threads", nr_tasks);

    let start = Instant::now();
    let mut handles = Vec::with_capacity(nr_tasks);
    for endpoint in endpoints.iter() {
        for w in 0..benchmark.workers {
            let context = WorkerContext {
                benchmark: benchmark.clone(),
                corpus: corpus.clone(),
                target: target.clone(),
                log: log.clone(),
                value: value.clone(),
                endpoint: endpoint.clone(),
                barrier: barrier.clone(),
                failure: failure.clone(),
                worker_info: (w, handles.len()),
            };
            let worker_thread = thread.clone();
            let handle = thread.spawn(Box::new(move || {
                bench_worker(context, worker_thread);
            }));
            handles.push(handle);
        }
    }
    join_all(handles);
    let duration = start.elapsed();

    if let Some(e) = failure.lock().take() {
        return Err(BenchError::Connection(e));
    }
    Ok(duration)
}

fn bench_cleanup(target: &dyn Target, log: &DiagnosticLog) {
    let flushed = target
        .connect_primary()
        .map_err(|e| e.to_string())
        .and_then(|mut handle| handle.flushdb().map_err(|e| e.to_string()));
    match flushed {
        Ok(()) => log.record("test data flushed"),
        Err(e) => {
            warn!("Cleanup failed: {}", e);
            log.report(&format!("cleanup failed: {}", e));
        }
    }
}

/// Run a benchmark against `target`.
///
/// **You may not need to check this if it is OK to run benchmarks with [`std::thread`].** Use
/// [`run`] instead.
pub fn run_with(
    benchmark: Arc<Benchmark>,
    target: Arc<dyn Target>,
    log: Arc<DiagnosticLog>,
    thread: impl Thread + Clone + Send + 'static,
) -> Result<RunMetrics> {
    log.report("start generating test data");
    let start = Instant::now();
    let corpus = bench_prepare(&benchmark, &thread);
    log.report(&format!(
        "test data prepared in {:.3}ms",
        start.elapsed().as_secs_f64() * 1000.0
    ));

    log.report("concurrent test started");
    let duration = bench_execute(&benchmark, &corpus, &target, &log, &thread)?;

    let metrics = RunMetrics::new(
        benchmark.workload.command.clone(),
        benchmark.workers,
        benchmark.workload.requests,
        benchmark.replays(),
        benchmark.workload.items,
        duration,
    );
    log.report(&metrics.summary());

    if benchmark.clean {
        bench_cleanup(target.as_ref(), &log);
    }
    Ok(metrics)
}

/// Run a benchmark with [`std::thread`] workers.
pub fn run(
    benchmark: Arc<Benchmark>,
    target: Arc<dyn Target>,
    log: Arc<DiagnosticLog>,
) -> Result<RunMetrics> {
    run_with(benchmark, target, log, crate::thread::DefaultThread)
}

// }}} bencher

// {{{ tests


// }}} tests
