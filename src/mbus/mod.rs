//! The mbus module contains the wired M-Bus link layer of the P1 port: splitting
//! the byte stream into telegrams, validating and reassembling long frames, and
//! the serial transport.

pub mod accumulator;
pub mod frame;
pub mod serial;

pub use accumulator::FrameAccumulator;
pub use frame::{pack_frame, pack_frames, pack_telegram, parse_frames, reassemble, MBusFrame};
pub use serial::{open_port, MeterReader, SerialConfig};
