//! The diagnostic log of a run.
//!
//! Every run appends to a plain text file named after the current day, e.g.
//! `respbench2024-07-07.log`. Each entry is one line prefixed by its local timestamp:
//!
//! ```txt
//! 2024-07-07 14:31:41.123456789 +08:00--start generating test data
//! ```
//!
//! Failed requests, phase markers and the final summary all go here. Summary lines can also be
//! echoed to stdout. Workers share one log; each entry is written and flushed while holding the
//! lock, so lines from different threads never interleave.

use chrono::Local;
use log::warn;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const LOG_PREFIX: &str = "respbench";

pub struct DiagnosticLog {
    sink: Mutex<Box<dyn Write + Send>>,
    echo: bool,
}

/// The log file of today in `dir`.
pub fn daily_path(dir: &Path) -> PathBuf {
    dir.join(format!(
        "{}{}.log",
        LOG_PREFIX,
        Local::now().format("%Y-%m-%d")
    ))
}

/// Local wall-clock time as written in front of every entry.
pub fn timestamp() -> String {
    Local::now()
        .format("%Y-%m-%d %H:%M:%S%.9f %:z")
        .to_string()
}

impl DiagnosticLog {
    pub fn new(sink: Box<dyn Write + Send>, echo: bool) -> Self {
        Self {
            sink: Mutex::new(sink),
            echo,
        }
    }

    /// Open (or create) today's log file in `dir` for appending.
    pub fn open(dir: &Path, echo: bool) -> io::Result<Self> {
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(daily_path(dir))?;
        Ok(Self::new(Box::new(file), echo))
    }

    /// A log that discards everything.
    pub fn sink() -> Self {
        Self::new(Box::new(io::sink()), false)
    }

    fn write_line(&self, line: &str) {
        let mut sink = self.sink.lock();
        if let Err(e) = writeln!(sink, "{}", line).and_then(|_| sink.flush()) {
            warn!("Failed to write diagnostic log: {}", e);
        }
    }

    /// Append one timestamped entry.
    pub fn record(&self, message: &str) {
        self.write_line(&format!("{}--{}", timestamp(), message));
    }

    /// Append one timestamped entry and echo it to stdout if enabled.
    pub fn report(&self, message: &str) {
        let line = format!("{}--{}", timestamp(), message);
        self.write_line(&line);
        if self.echo {
            println!("{}", line);
        }
    }

    /// Print to stdout only, if enabled.
    pub fn echo(&self, message: &str) {
        if self.echo {
            println!("{}", message);
        }
    }
}
