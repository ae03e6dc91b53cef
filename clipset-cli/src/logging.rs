//! Process-wide logging: colored console output plus a daily-rotated log file.
//!
//! ```text
//! <directory>/<prefix>.log                  ← active file
//! <directory>/<prefix>.log.2026-10-17.gz    ← previous day, compressed on rotation
//! ```
//!
//! Rotation happens lazily on the first write after local midnight. The
//! finished file is renamed with its date, gzip-compressed, and the
//! uncompressed copy removed. Nothing here is shared with the extraction
//! pipeline; it only consumes `tracing` events.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate};
use flate2::{write::GzEncoder, Compression};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, EnvFilter};

pub const DEFAULT_LOG_DIR: &str = "result/log";
pub const DEFAULT_LOG_PREFIX: &str = "clipset";
pub const DEFAULT_LOG_FILTER: &str = "clipset=info,clipset_core=info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct LogConfig {
    /// Directory holding the active and rotated log files.
    pub directory: PathBuf,
    /// File name stem: `<prefix>.log`.
    pub file_prefix: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Mirror events to stdout.
    pub console: bool,
    /// Colorize console output by level.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            file_prefix: DEFAULT_LOG_PREFIX.into(),
            filter: DEFAULT_LOG_FILTER.into(),
            console: true,
            ansi: true,
        }
    }
}

/// Install the global subscriber. Call once at process start.
///
/// # Errors
/// Fails if the log directory or file cannot be created, or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .with_context(|| format!("invalid log filter {:?}", config.filter))?;

    let file_writer = RotatingWriter::open(&config.directory, &config.file_prefix)
        .with_context(|| format!("opening log file in {}", config.directory.display()))?;

    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer);
    let console_layer = config
        .console
        .then(|| fmt::layer().with_ansi(config.ansi).with_writer(io::stdout));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(())
}

/// Gzip `source` to `<source>.gz` and delete `source`.
pub fn compress_rotated(source: &Path) -> io::Result<PathBuf> {
    let mut dest = source.as_os_str().to_owned();
    dest.push(".gz");
    let dest = PathBuf::from(dest);

    let mut input = BufReader::new(File::open(source)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(&dest)?), Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.flush()?;
    fs::remove_file(source)?;
    Ok(dest)
}

/// The active log file plus the local date it belongs to.
#[derive(Debug)]
pub struct RotatingFile {
    directory: PathBuf,
    prefix: String,
    date: NaiveDate,
    file: File,
}

impl RotatingFile {
    pub fn open(directory: &Path, prefix: &str) -> io::Result<Self> {
        fs::create_dir_all(directory)?;
        let path = directory.join(format!("{prefix}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        // An existing file keeps the date it was last written, so a restart
        // on a new day still rotates yesterday's entries.
        let date = file
            .metadata()
            .and_then(|m| m.modified())
            .map(|t| DateTime::<Local>::from(t).date_naive())
            .unwrap_or_else(|_| Local::now().date_naive());
        Ok(Self {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            date,
            file,
        })
    }

    pub fn active_path(&self) -> PathBuf {
        self.directory.join(format!("{}.log", self.prefix))
    }

    /// Rotate if `today` is past the active file's date. Returns the
    /// compressed file when a rotation happened.
    ///
    /// The date advances before any fallible step, so each day boundary is
    /// attempted once; after a failure, logging continues into the current handle.
    pub fn rotate_if_needed(&mut self, today: NaiveDate) -> io::Result<Option<PathBuf>> {
        if today <= self.date {
            return Ok(None);
        }
        let previous = std::mem::replace(&mut self.date, today);
        self.file.flush()?;

        let active = self.active_path();
        let rotated = self
            .directory
            .join(format!("{}.log.{}", self.prefix, previous.format("%Y-%m-%d")));
        fs::rename(&active, &rotated)?;
        self.file = OpenOptions::new().create(true).append(true).open(&active)?;

        compress_rotated(&rotated).map(Some)
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Err(e) = self.rotate_if_needed(Local::now().date_naive()) {
            // Keep logging to the current handle until the next day boundary.
            eprintln!("log rotation failed: {e}");
        }
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// `MakeWriter` handing out locked access to one shared [`RotatingFile`].
#[derive(Debug)]
pub struct RotatingWriter {
    inner: Mutex<RotatingFile>,
}

impl RotatingWriter {
    pub fn open(directory: &Path, prefix: &str) -> io::Result<Self> {
        Ok(Self {
            inner: Mutex::new(RotatingFile::open(directory, prefix)?),
        })
    }
}

pub struct RotatingGuard<'a>(MutexGuard<'a, RotatingFile>);

impl Write for RotatingGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingGuard(self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn compress_replaces_source_with_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clipset.log.2026-01-01");
        fs::write(&source, "line one\nline two\n").unwrap();

        let dest = compress_rotated(&source).unwrap();
        assert_eq!(dest, dir.path().join("clipset.log.2026-01-01.gz"));
        assert!(!source.exists());

        let mut text = String::new();
        GzDecoder::new(File::open(&dest).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "line one\nline two\n");
    }

    #[test]
    fn rotation_compresses_previous_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RotatingFile::open(dir.path(), "clipset").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        file.date = day;
        file.file.write_all(b"old entry\n").unwrap();

        assert_eq!(file.rotate_if_needed(day).unwrap(), None);

        let next = day.succ_opt().unwrap();
        let rotated = file.rotate_if_needed(next).unwrap().unwrap();
        assert_eq!(rotated, dir.path().join("clipset.log.2026-03-01.gz"));
        assert!(!dir.path().join("clipset.log.2026-03-01").exists());

        file.file.write_all(b"new entry\n").unwrap();
        let active = fs::read_to_string(file.active_path()).unwrap();
        assert_eq!(active, "new entry\n");

        let mut old = String::new();
        GzDecoder::new(File::open(&rotated).unwrap())
            .read_to_string(&mut old)
            .unwrap();
        assert_eq!(old, "old entry\n");
    }

    #[test]
    fn failed_rotation_is_not_retried_every_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RotatingFile::open(dir.path(), "clipset").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        file.date = day;
        // Active file vanishes underneath the open handle; the rename must fail.
        fs::remove_file(file.active_path()).unwrap();

        let next = day.succ_opt().unwrap();
        assert!(file.rotate_if_needed(next).is_err());
        assert_eq!(file.date, next);
        assert_eq!(file.rotate_if_needed(next).unwrap(), None);
        file.file.write_all(b"still logging\n").unwrap();

        let later = next.succ_opt().unwrap();
        fs::write(file.active_path(), "recreated\n").unwrap();
        let rotated = file.rotate_if_needed(later).unwrap().unwrap();
        assert_eq!(rotated, dir.path().join("clipset.log.2026-05-11.gz"));
    }

    #[test]
    fn writer_appends_through_guard() {
        let dir = tempfile::tempdir().unwrap();
        let writer = RotatingWriter::open(&dir.path().join("nested"), "app").unwrap();
        writer.make_writer().write_all(b"hello\n").unwrap();
        writer.make_writer().write_all(b"world\n").unwrap();
        let text = fs::read_to_string(dir.path().join("nested").join("app.log")).unwrap();
        assert_eq!(text, "hello\nworld\n");
    }

    #[test]
    fn log_config_defaults_fill_missing_fields() {
        let config: LogConfig = serde_json::from_str(r#"{"filePrefix": "run7"}"#).unwrap();
        assert_eq!(config.file_prefix, "run7");
        assert_eq!(config.directory, PathBuf::from(DEFAULT_LOG_DIR));
        assert!(config.console);
    }
}
