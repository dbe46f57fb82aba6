//! Flow record output.
//!
//! A [`FlowSink`] is built once at startup and handed to the handler, so the
//! destination of flow records is an explicit dependency rather than global
//! logger state. Production writes JSON lines to stdout; tests capture
//! records in memory.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::mirror::FlowRecord;

/// Message tag identifying a mirrored-request event.
pub const FLOW_MESSAGE: &str = "request_mirrored";

/// Bumped whenever a field of the flow line is renamed, moved or removed.
pub const SCHEMA_VERSION: u32 = 1;

/// Destination for flow records.
///
/// `emit` is infallible: a sink that cannot write reports the failure
/// through `tracing` and carries on.
pub trait FlowSink: Send + Sync + 'static {
    fn emit(&self, record: &FlowRecord);
}

#[derive(Serialize)]
struct FlowLine<'a> {
    time: String,
    level: &'static str,
    msg: &'static str,
    schema_version: u32,
    #[serde(flatten)]
    record: &'a FlowRecord,
}

/// Render one newline-terminated JSON log line for `record`.
pub fn render_line(record: &FlowRecord, time: DateTime<Utc>) -> Result<Vec<u8>, serde_json::Error> {
    let line = FlowLine {
        time: time.to_rfc3339_opts(SecondsFormat::Nanos, true),
        level: "INFO",
        msg: FLOW_MESSAGE,
        schema_version: SCHEMA_VERSION,
        record,
    };
    let mut buf = serde_json::to_vec(&line)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Writes each record as a single JSON line.
///
/// Every line goes out in one `write_all` under a lock, so concurrent
/// handlers never interleave partial records.
pub struct JsonLineSink<W> {
    writer: Mutex<W>,
}

impl JsonLineSink<io::Stdout> {
    /// Sink on the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send + 'static> FlowSink for JsonLineSink<W> {
    fn emit(&self, record: &FlowRecord) {
        let line = match render_line(record, Utc::now()) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize flow record");
                return;
            }
        };

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.write_all(&line).and_then(|()| writer.flush()) {
            tracing::error!(error = %e, "Failed to write flow record");
        }
    }
}

/// Keeps every emitted record in memory.
#[derive(Debug, Default)]
pub struct CaptureSink {
    records: Mutex<Vec<FlowRecord>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records emitted so far, in emission order.
    pub fn records(&self) -> Vec<FlowRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FlowSink for CaptureSink {
    fn emit(&self, record: &FlowRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
