//! Process-wide logging.
//!
//! Records go through the `log` facade and are formatted by `env_logger` as
//! `YYYY-MM-DD HH:MM:SS | LEVEL | message`. Every line is written to stderr and appended to
//! `<log_dir>/validacion_YYYY-MM-DD.log`. The file is switched when the local date changes,
//! and files older than the retention window are removed at that moment.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDate};
use log::LevelFilter;

const LOG_PREFIX: &str = "validacion_";
const LOG_SUFFIX: &str = ".log";

/// Appends to one log file per local calendar day.
pub struct DailyFileWriter {
    dir: PathBuf,
    retention_days: u32,
    current: Option<(NaiveDate, File)>,
}

impl DailyFileWriter {
    pub fn new<P: AsRef<Path>>(dir: P, retention_days: u32) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            retention_days,
            current: None,
        }
    }

    pub fn file_name_for(date: NaiveDate) -> String {
        format!("{}{}{}", LOG_PREFIX, date.format("%Y-%m-%d"), LOG_SUFFIX)
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(Self::file_name_for(date))
    }

    fn file_for(&mut self, today: NaiveDate) -> io::Result<&mut File> {
        let stale = !matches!(&self.current, Some((date, _)) if *date == today);
        if stale {
            fs::create_dir_all(&self.dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path_for(today))?;
            self.current = Some((today, file));
            // Pruning must not prevent logging
            let _ = self.prune(today);
        }
        match self.current.as_mut() {
            Some((_, file)) => Ok(file),
            None => Err(io::Error::new(io::ErrorKind::Other, "log file unavailable")),
        }
    }

    /// Deletes daily files dated before `today - retention_days`. Returns how many were removed.
    pub fn prune(&self, today: NaiveDate) -> io::Result<usize> {
        let cutoff = today - Duration::days(i64::from(self.retention_days));
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(date) = parse_log_date(name) else {
                continue;
            };
            if date < cutoff && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn write_dated(&mut self, today: NaiveDate, buf: &[u8]) -> io::Result<usize> {
        let file = self.file_for(today)?;
        file.write_all(buf)?;
        Ok(buf.len())
    }
}

impl Write for DailyFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_dated(Local::now().date_naive(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.current.as_mut() {
            Some((_, file)) => file.flush(),
            None => Ok(()),
        }
    }
}

fn parse_log_date(name: &str) -> Option<NaiveDate> {
    let date = name.strip_prefix(LOG_PREFIX)?.strip_suffix(LOG_SUFFIX)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Duplicates every record onto stderr and the daily file.
struct TeeWriter {
    file: DailyFileWriter,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = io::stderr().write_all(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

/// Installs the global logger. `RUST_LOG` takes precedence over the INFO default.
pub fn init(log_dir: &Path, retention_days: u32) -> Result<(), log::SetLoggerError> {
    let tee = TeeWriter {
        file: DailyFileWriter::new(log_dir, retention_days),
    };
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} | {} | {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(tee)))
        .try_init()
}
