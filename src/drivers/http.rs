//! Sources backed by the acquisition board's HTTP endpoints.
//!
//! `GET /live_data` answers with one JSON reading per request. `GET /data`
//! answers with the whole CSV log recorded so far, so [`CsvLogSource`] keeps a
//! cursor and hands out only the rows it has not delivered yet.
use std::time::Duration;

use reqwest::blocking::Client;

use crate::drivers::source::SampleSource;
use crate::drivers::MonitorError;
use crate::types::Reading;

/// Shared plumbing for the two endpoint flavours.
#[derive(Clone, Debug)]
pub struct Endpoint {
    client: Client,
    base_url: String,
}

impl Endpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MonitorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get_text(&self, path: &str) -> Result<String, MonitorError> {
        let url = self.url(path);
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Http {
                url,
                reason: format!("status {}", status.as_u16()),
            });
        }
        Ok(response.text()?)
    }

    /// Session toggle; the response body is only logged.
    fn post(&self, path: &str) -> Result<(), MonitorError> {
        let url = self.url(path);
        let response = self.client.post(&url).send()?;
        let status = response.status();
        let body = response.text().unwrap_or_default();
        log::info!("POST {url} -> {} {}", status.as_u16(), body.trim());
        if status.is_success() {
            Ok(())
        } else {
            Err(MonitorError::Http {
                url,
                reason: format!("status {}", status.as_u16()),
            })
        }
    }
}

/// Parses one `/live_data` payload. Missing `time_ms`, `raw` or `filtered` is an error.
pub fn parse_live_payload(body: &str) -> Result<Reading, MonitorError> {
    Ok(serde_json::from_str(body)?)
}

/// Polls `/live_data`.
pub struct LiveJsonSource {
    endpoint: Endpoint,
}

impl LiveJsonSource {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }
}

impl SampleSource for LiveJsonSource {
    fn start(&mut self) -> Result<(), MonitorError> {
        self.endpoint.post("start")
    }

    fn fetch(&mut self) -> Result<Vec<Reading>, MonitorError> {
        let body = self.endpoint.get_text("live_data")?;
        Ok(vec![parse_live_payload(&body)?])
    }

    fn stop(&mut self) -> Result<(), MonitorError> {
        self.endpoint.post("stop")
    }

    fn describe(&self) -> String {
        self.endpoint.url("live_data")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ThirdColumn {
    Absent,
    Filtered,
    Frequency,
}

/// Parsed form of a `/data` body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsvLog {
    /// Total data rows in the body, parseable or not.
    pub row_count: usize,
    /// Parsed rows, paired with their data-row index.
    pub readings: Vec<(usize, Reading)>,
}

/// Parses CSV log text: a header row, then `timestamp,amplitude[,third]` rows.
///
/// A third column whose header mentions `freq` is a frequency; otherwise it is
/// the filtered value. Without a third column `filtered` mirrors the amplitude.
/// Blank lines are ignored and rows that fail to parse are skipped.
pub fn parse_csv_log(body: &str) -> CsvLog {
    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(header) = lines.next() else {
        return CsvLog::default();
    };
    let third = match header.split(',').nth(2) {
        None => ThirdColumn::Absent,
        Some(name) if name.to_ascii_lowercase().contains("freq") => ThirdColumn::Frequency,
        Some(_) => ThirdColumn::Filtered,
    };
    let mut log = CsvLog::default();
    for (index, line) in lines.enumerate() {
        log.row_count = index + 1;
        if let Some(reading) = parse_csv_row(line, third) {
            log.readings.push((index, reading));
        }
    }
    log
}

fn parse_csv_row(line: &str, third: ThirdColumn) -> Option<Reading> {
    let mut fields = line.split(',').map(str::trim);
    let time_ms = fields.next()?.parse::<f64>().ok().filter(|t| *t >= 0.0)? as u64;
    let amplitude = fields.next()?.parse::<f64>().ok()?;
    let reading = match third {
        ThirdColumn::Absent => Reading::new(time_ms, amplitude, amplitude),
        ThirdColumn::Filtered => {
            let filtered = fields.next()?.parse::<f64>().ok()?;
            Reading::new(time_ms, amplitude, filtered)
        }
        ThirdColumn::Frequency => {
            let freq = fields.next()?.parse::<f64>().ok()?;
            Reading::new(time_ms, amplitude, amplitude).with_frequency(freq)
        }
    };
    Some(reading)
}

/// Polls the accumulated `/data` log and yields only unseen rows.
pub struct CsvLogSource {
    endpoint: Endpoint,
    rows_seen: usize,
}

impl CsvLogSource {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint, rows_seen: 0 }
    }

    /// Applies a freshly fetched body to the cursor and returns the new readings.
    pub fn take_new(&mut self, body: &str) -> Vec<Reading> {
        let log = parse_csv_log(body);
        if log.row_count < self.rows_seen {
            // the board restarted its log
            log::info!("CSV log shrank from {} to {} rows, rewinding", self.rows_seen, log.row_count);
            self.rows_seen = 0;
        }
        let seen = self.rows_seen;
        self.rows_seen = log.row_count;
        log.readings
            .into_iter()
            .filter(|(index, _)| *index >= seen)
            .map(|(_, reading)| reading)
            .collect()
    }
}

impl SampleSource for CsvLogSource {
    fn start(&mut self) -> Result<(), MonitorError> {
        self.rows_seen = 0;
        self.endpoint.post("start")
    }

    fn fetch(&mut self) -> Result<Vec<Reading>, MonitorError> {
        let body = self.endpoint.get_text("data")?;
        Ok(self.take_new(&body))
    }

    fn stop(&mut self) -> Result<(), MonitorError> {
        self.endpoint.post("stop")
    }

    fn describe(&self) -> String {
        self.endpoint.url("data")
    }
}
