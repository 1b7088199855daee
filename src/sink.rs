//! # Measurement Sinks
//!
//! A sink receives every successfully decoded [`MeasurementSet`] and is told
//! about every discarded telegram. Which of the two methods is called is the
//! success indicator; a sink never sees a partial set.
//!
//! Stock sinks:
//!
//! - [`LogSink`]: one `info!` line per telegram
//! - [`JsonSink`]: one JSON object per line on any `Write`
//! - `Vec<MeasurementSet>`: collects, mostly for tests
//! - `tokio::sync::mpsc::UnboundedSender<MeasurementSet>`: hands sets to a task

use crate::error::MeterError;
use crate::measurement::MeasurementSet;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::io::{self, Write};
use tokio::sync::mpsc::UnboundedSender;

pub trait MeasurementSink {
    /// Called once per decoded telegram.
    fn deliver(&mut self, measurements: &MeasurementSet) -> Result<(), MeterError>;

    /// Called once per discarded telegram. The meter already logs the error.
    fn report_error(&mut self, error: &MeterError) {
        log::debug!("Sink notified of discarded telegram: {error}");
    }
}

impl<S: MeasurementSink + ?Sized> MeasurementSink for Box<S> {
    fn deliver(&mut self, measurements: &MeasurementSet) -> Result<(), MeterError> {
        (**self).deliver(measurements)
    }

    fn report_error(&mut self, error: &MeterError) {
        (**self).report_error(error)
    }
}

impl MeasurementSink for Vec<MeasurementSet> {
    fn deliver(&mut self, measurements: &MeasurementSet) -> Result<(), MeterError> {
        self.push(measurements.clone());
        Ok(())
    }
}

impl MeasurementSink for UnboundedSender<MeasurementSet> {
    fn deliver(&mut self, measurements: &MeasurementSet) -> Result<(), MeterError> {
        self.send(measurements.clone()).map_err(|_| {
            MeterError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "measurement receiver dropped",
            ))
        })
    }
}

/// Logs each measurement set on one line.
#[derive(Debug, Default)]
pub struct LogSink;

impl MeasurementSink for LogSink {
    fn deliver(&mut self, measurements: &MeasurementSet) -> Result<(), MeterError> {
        log::info!("{measurements}");
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    published_at: String,
    #[serde(flatten)]
    measurements: &'a MeasurementSet,
}

/// Writes one JSON object per telegram, newline separated.
///
/// Quantities appear under their snake_case names (`voltage_l1`,
/// `active_energy_plus`, ...) next to the optional topic and the time the
/// set was published.
#[derive(Debug)]
pub struct JsonSink<W: Write> {
    writer: W,
    topic: Option<String>,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes a set stamped with an explicit publish time.
    pub fn write_at(
        &mut self,
        measurements: &MeasurementSet,
        published_at: DateTime<Utc>,
    ) -> Result<(), MeterError> {
        let message = JsonMessage {
            topic: self.topic.as_deref(),
            published_at: published_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            measurements,
        };
        serde_json::to_writer(&mut self.writer, &message).map_err(io::Error::from)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> MeasurementSink for JsonSink<W> {
    fn deliver(&mut self, measurements: &MeasurementSet) -> Result<(), MeterError> {
        self.write_at(measurements, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosem::obis::CodeType;
    use crate::measurement::MeasurementValue;
    use chrono::TimeZone;

    fn sample() -> MeasurementSet {
        let mut set = MeasurementSet::new();
        set.insert(CodeType::VoltageL1, MeasurementValue::Numeric(230.5));
        set.insert(
            CodeType::Timestamp,
            MeasurementValue::Text("2024-03-01T12:00:05Z".into()),
        );
        set
    }

    #[test]
    fn test_json_line_layout() {
        let mut sink = JsonSink::new(Vec::new()).with_topic("meter/main");
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 6).unwrap();
        sink.write_at(&sample(), at).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.ends_with('\n'));
        let json: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(json["topic"], "meter/main");
        assert_eq!(json["published_at"], "2024-03-01T12:00:06Z");
        assert_eq!(json["voltage_l1"], 230.5);
        assert_eq!(json["timestamp"], "2024-03-01T12:00:05Z");
        assert!(json.get("current_l1").is_none());
    }

    #[test]
    fn test_topic_omitted_when_unset() {
        let mut sink = JsonSink::new(Vec::new());
        sink.deliver(&sample()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert!(json.get("topic").is_none());
    }

    #[test]
    fn test_channel_sink() {
        let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.deliver(&sample()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), sample());

        drop(rx);
        assert!(matches!(tx.deliver(&sample()), Err(MeterError::Io(_))));
    }
}
