use crate::bench::BenchmarkOpt;
use crate::diagnostic::DiagnosticLog;
use crate::error::Result;
use crate::stores::open_target;
use clap::ValueHint::{DirPath, FilePath};
use clap::Parser;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[arg(short = 'f')]
    #[arg(value_hint = FilePath)]
    #[arg(help = "Path to the run's TOML config file")]
    config: Option<PathBuf>,

    #[arg(long)]
    #[arg(help = "Comma-separated host:port endpoints [default: 127.0.0.1:6379]")]
    address: Option<String>,

    #[arg(long)]
    #[arg(help = "Database index [default: 0]")]
    db: Option<i64>,

    #[arg(long)]
    #[arg(help = "Command to benchmark [default: set]")]
    cmd: Option<String>,

    #[arg(short = 'c')]
    #[arg(help = "Number of concurrent workers [default: 20]")]
    workers: Option<usize>,

    #[arg(short = 'n')]
    #[arg(help = "Number of requests per worker [default: 100]")]
    requests: Option<usize>,

    #[arg(short = 'i')]
    #[arg(help = "Number of members per key for container commands [default: 16]")]
    items: Option<usize>,

    #[arg(long)]
    #[arg(help = "Password, empty for none")]
    pwd: Option<String>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    #[arg(help = "Flush the database after the run [default: false]")]
    clean: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    #[arg(help = "Echo progress and summary to stdout [default: true]")]
    output: Option<bool>,

    #[arg(long = "vl")]
    #[arg(help = "Value length [default: 10]")]
    vlen: Option<usize>,

    #[arg(long = "kl")]
    #[arg(help = "Key length [default: 10]")]
    klen: Option<usize>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    #[arg(help = "Suffix written keys with a timestamp [default: false]")]
    add_time: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    #[arg(help = "Treat all endpoints as one cluster [default: false]")]
    cluster_mode: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    #[arg(help = "Run against a target that does nothing [default: false]")]
    dry_run: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    #[arg(help = "Pin worker threads to CPU cores [default: false]")]
    pin: Option<bool>,

    #[arg(long)]
    #[arg(value_hint = DirPath)]
    #[arg(help = "Directory of the daily diagnostic log [default: .]")]
    log_dir: Option<String>,
}

impl Cli {
    fn overrides(&self) -> BenchmarkOpt {
        BenchmarkOpt {
            cmd: self.cmd.clone(),
            workers: self.workers,
            requests: self.requests,
            items: self.items,
            klen: self.klen,
            vlen: self.vlen,
            address: self.address.clone(),
            db: self.db,
            pwd: self.pwd.clone(),
            cluster_mode: self.cluster_mode,
            add_time: self.add_time,
            clean: self.clean,
            output: self.output,
            connect_timeout: None,
            io_timeout: None,
            log_dir: self.log_dir.clone(),
            pin: self.pin,
            dry_run: self.dry_run,
        }
    }
}

fn bench_cli(cli: &Cli) -> Result<()> {
    let benchmark = crate::bench::load(cli.config.as_deref(), &cli.overrides())?;
    let benchmark = Arc::new(benchmark);
    let log = Arc::new(DiagnosticLog::open(&benchmark.log_dir, benchmark.output)?);

    log.echo(&format!(
        "respbench {}: {} x {} {} requests against {}{}",
        env!("CARGO_PKG_VERSION"),
        benchmark.workers,
        benchmark.workload.requests,
        benchmark.workload.command,
        benchmark.target.endpoints.join(","),
        if benchmark.cluster { " (cluster)" } else { "" },
    ));

    let target = open_target(&benchmark.target, benchmark.cluster, benchmark.dry_run);
    if let Err(e) = crate::bench::run(benchmark, target, log.clone()) {
        log.record(&e.to_string());
        return Err(e);
    }
    Ok(())
}

/// The default command line interface.
///
/// ## Usage
///
/// To get the usage of the command line interface, users can run:
///
/// ```bash
/// respbench -h
/// ```
///
/// A run is configured by an optional TOML file, environment variables and flags, in increasing
/// order of precedence:
///
/// ```bash
/// respbench [-f <CONFIG>] [--address <ADDR>] [--cmd <CMD>] [-c <WORKERS>] [-n <REQUESTS>] ...
/// ```
///
/// The format of `CONFIG` and the meaning of every option is documented in [`crate::bench`].
/// Boolean flags can be given bare (`--clean`) or with a value (`--output false`).
///
/// For example, the following runs `ZADD` with 50 workers of 1000 requests each against a
/// cluster, and flushes the database afterwards:
///
/// ```bash
/// respbench --address 10.0.0.1:7000,10.0.0.2:7000 --cluster-mode --cmd zadd -c 50 -n 1000 --clean
/// ```
///
/// The summary line is appended to `respbench<YYYY-MM-DD>.log` in the log directory. The process
/// exits with a non-zero status if the configuration is invalid, the log cannot be opened, or any
/// worker fails to connect.
pub fn cmdline() {
    env_logger::init();
    let cli = Cli::parse();
    debug!("Starting respbench with args: {:?}", cli);
    if let Err(e) = bench_cli(&cli) {
        eprintln!("respbench: {}", e);
        std::process::exit(1);
    }
}
