//! Record sinks

use super::message::Message;
use crate::error::{Error, Result};
use serde_json::Value;
use std::io::{self, Write};
use std::sync::Mutex;

/// Destination for extracted records
///
/// Units may run concurrently, so sinks are shared across tasks. Records
/// of one (stream, context) unit arrive in server order.
pub trait RecordSink: Send + Sync {
    fn emit(&self, stream: &str, record: &Value) -> Result<()>;
}

/// Writes protocol messages as JSON lines
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl JsonLinesSink<io::Stdout> {
    /// Sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Create a sink over any writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Write one message and flush
    pub fn write_message(&self, message: &Message) -> Result<()> {
        let line = message.to_line()?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Other("output writer lock poisoned".to_string()))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }

    /// Take back the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| Error::Other("output writer lock poisoned".to_string()))
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn emit(&self, stream: &str, record: &Value) -> Result<()> {
        self.write_message(&Message::record(stream, record.clone()))
    }
}

/// Collects records in memory, in emission order
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<(String, Value)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every (stream, record) pair emitted so far
    pub fn records(&self) -> Vec<(String, Value)> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Records of one stream
    pub fn records_for(&self, stream: &str) -> Vec<Value> {
        self.records()
            .into_iter()
            .filter(|(s, _)| s == stream)
            .map(|(_, record)| record)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, stream: &str, record: &Value) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| Error::Other("memory sink lock poisoned".to_string()))?
            .push((stream.to_string(), record.clone()));
        Ok(())
    }
}
