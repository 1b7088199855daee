//! # P1 Serial Transport
//!
//! Opens the meter's serial port and drives a [`DlmsMeter`] from it. The
//! reader waits for bytes with a bounded timeout so that the meter sees the
//! passage of time even while the line is quiet; that is what completes a
//! telegram.

use crate::config::{MeterConfig, Parity};
use crate::error::MeterError;
use crate::meter::DlmsMeter;
use crate::sink::MeasurementSink;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout, Instant};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

const READ_BUFFER_SIZE: usize = 256;

/// Configuration for serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port: String,
    pub baudrate: u32,
    pub parity: Parity,
    pub timeout: Duration,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        SerialConfig {
            port: port.into(),
            baudrate: 2400,
            parity: Parity::Even,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn from_meter_config(config: &MeterConfig) -> Result<Self, MeterError> {
        let port = config
            .port
            .clone()
            .ok_or_else(|| MeterError::Config("no serial port configured".into()))?;
        Ok(SerialConfig {
            baudrate: config.baudrate,
            parity: config.parity,
            ..SerialConfig::new(port)
        })
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// Opens the port with 8 data bits and 1 stop bit.
pub fn open_port(config: &SerialConfig) -> Result<SerialStream, MeterError> {
    log::info!(
        "Opening {} at {} baud, parity {:?}",
        config.port,
        config.baudrate,
        config.parity
    );
    tokio_serial::new(&config.port, config.baudrate)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(config.parity.into())
        .timeout(config.timeout)
        .open_native_async()
        .map_err(|e| MeterError::SerialPortError(e.to_string()))
}

/// Feeds bytes from any async source into a meter.
pub struct MeterReader<R, S> {
    reader: R,
    meter: DlmsMeter<S>,
    poll_interval: Duration,
    buf: [u8; READ_BUFFER_SIZE],
}

impl<R, S> MeterReader<R, S>
where
    R: AsyncRead + Unpin,
    S: MeasurementSink,
{
    pub fn new(reader: R, meter: DlmsMeter<S>) -> Self {
        let poll_interval = (meter.accumulator().inactivity_timeout() / 4).max(Duration::from_millis(1));
        Self {
            reader,
            meter,
            poll_interval,
            buf: [0u8; READ_BUFFER_SIZE],
        }
    }

    /// Waits at most one poll interval for bytes and hands them to the
    /// meter. Returns `false` once the source reached end of file, after
    /// flushing any telegram still buffered.
    pub async fn read_once(&mut self) -> Result<bool, MeterError> {
        match timeout(self.poll_interval, self.reader.read(&mut self.buf)).await {
            Ok(Ok(0)) => {
                log::debug!("Input closed");
                self.meter.flush();
                Ok(false)
            }
            Ok(Ok(n)) => {
                self.meter.poll(&self.buf[..n], Instant::now().into_std());
                Ok(true)
            }
            Ok(Err(e)) => Err(MeterError::SerialPortError(e.to_string())),
            Err(_) => {
                self.meter.poll(&[], Instant::now().into_std());
                Ok(true)
            }
        }
    }

    /// Runs until end of file or a transport error.
    pub async fn run(&mut self) -> Result<(), MeterError> {
        while self.read_once().await? {}
        Ok(())
    }

    pub fn meter(&self) -> &DlmsMeter<S> {
        &self.meter
    }

    pub fn into_meter(self) -> DlmsMeter<S> {
        self.meter
    }
}
