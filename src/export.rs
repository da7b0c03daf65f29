// src/export.rs
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};

use crate::drivers::MonitorError;
use crate::types::Sample;

pub const CSV_HEADER: &str = "time_ms,epoch_ms,datetime_iso,local_time,raw,filtered,frequency_hz,quality";

/// Writes `samples` as CSV: the fixed header, then one row per sample.
pub fn write_csv<W: Write>(out: &mut W, samples: &[Sample], decimal_places: usize) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for s in samples {
        let (iso, local) = match Utc.timestamp_millis_opt(s.epoch_ms).single() {
            Some(utc) => (
                utc.to_rfc3339_opts(SecondsFormat::Millis, true),
                utc.with_timezone(&Local).format("%H:%M:%S%.3f").to_string(),
            ),
            None => (String::new(), String::new()),
        };
        let frequency = s
            .frequency_hz
            .map(|f| format!("{f:.3}"))
            .unwrap_or_default();
        writeln!(
            out,
            "{},{},{},{},{:.prec$},{:.prec$},{},{}",
            s.time_ms,
            s.epoch_ms,
            iso,
            local,
            s.raw,
            s.filtered,
            frequency,
            s.quality,
            prec = decimal_places
        )?;
    }
    Ok(())
}

/// CSV bytes for `samples`; an empty slice is rejected.
pub fn csv_bytes(samples: &[Sample], decimal_places: usize) -> Result<Vec<u8>, MonitorError> {
    if samples.is_empty() {
        return Err(MonitorError::EmptyExport);
    }
    let mut out = Vec::new();
    write_csv(&mut out, samples, decimal_places)?;
    Ok(out)
}

/// Replaces every character that is not an ASCII letter or digit with `_`.
pub fn sanitize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `<label>_<YYYY-MM-DDTHH-MM-SS>.csv`
pub fn export_file_name<Tz: TimeZone>(label: &str, at: &DateTime<Tz>) -> Result<String, MonitorError>
where
    Tz::Offset: std::fmt::Display,
{
    let label = sanitize_label(label);
    if label.is_empty() {
        return Err(MonitorError::EmptyName);
    }
    Ok(format!("{}_{}.csv", label, at.format("%Y-%m-%dT%H-%M-%S")))
}

/// Where finished files go.
pub trait Downloader {
    fn deliver(&mut self, file_name: &str, contents: &[u8]) -> Result<PathBuf, MonitorError>;
}

/// Writes files into a directory, creating it on first use.
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Downloader for DirectoryDownloader {
    fn deliver(&mut self, file_name: &str, contents: &[u8]) -> Result<PathBuf, MonitorError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        let mut file = fs::File::create(&path)?;
        file.write_all(contents)?;
        file.flush()?;
        log::info!("wrote {} ({} bytes)", path.display(), contents.len());
        Ok(path)
    }
}

/// Keeps delivered files in memory.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryDownloader {
    pub delivered: Vec<(String, Vec<u8>)>,
}

#[cfg(test)]
impl Downloader for MemoryDownloader {
    fn deliver(&mut self, file_name: &str, contents: &[u8]) -> Result<PathBuf, MonitorError> {
        self.delivered.push((file_name.to_owned(), contents.to_vec()));
        Ok(PathBuf::from(file_name))
    }
}
