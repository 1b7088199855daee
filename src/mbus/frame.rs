//! # M-Bus Long Frame Reassembly
//!
//! A P1 telegram is a sequence of M-Bus long frames
//! (`0x68 L L 0x68 C A CI STSAP DTSAP <data> CS 0x16`). Meters split the DLMS
//! envelope over several frames once it exceeds one frame's capacity; the
//! receiver validates every frame and concatenates their user data.
//!
//! Field extraction uses `nom`; validation is done explicitly so every failure
//! maps onto a precise [`FramingError`] carrying the offset of the frame.
//!
//! ```rust
//! use dlms_meter::mbus::frame::{pack_frame, reassemble, MBusFrame};
//!
//! let frame = MBusFrame::segment(vec![0xDB, 0x08], 0, true);
//! let bytes = pack_frame(&frame).unwrap();
//! assert_eq!(reassemble(&bytes, false).unwrap(), vec![0xDB, 0x08]);
//! ```

use crate::constants::*;
use crate::error::FramingError;
use nom::{
    bytes::complete::take,
    number::complete::be_u8,
    sequence::tuple,
    IResult,
};

/// One validated M-Bus long frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MBusFrame {
    pub control: u8,
    pub address: u8,
    pub control_information: u8,
    pub source_tsap: u8,
    pub destination_tsap: u8,
    /// User data following the full header
    pub data: Vec<u8>,
    pub checksum: u8,
}

impl MBusFrame {
    /// Builds one segment of a meter push telegram with a valid checksum.
    ///
    /// The CI byte carries the segment index in its low nibble and
    /// `MBUS_CONTROL_INFO_FINAL` on the last segment.
    pub fn segment(data: Vec<u8>, index: u8, last: bool) -> Self {
        let control_information = if last {
            MBUS_CONTROL_INFO_FINAL | (index & 0x0F)
        } else {
            index & 0x0F
        };
        let mut frame = MBusFrame {
            control: MBUS_CONTROL_SND_UD,
            address: MBUS_ADDRESS_BROADCAST,
            control_information,
            source_tsap: MBUS_STSAP_DLMS,
            destination_tsap: MBUS_DTSAP_DLMS,
            data,
            checksum: 0,
        };
        frame.checksum = calculate_checksum(&frame);
        frame
    }

    /// Value of the duplicated L field for this frame.
    pub fn length_field(&self) -> usize {
        self.data.len() + MBUS_LENGTH_FIELD_OVERHEAD
    }

    /// Total size of the frame on the wire.
    pub fn wire_len(&self) -> usize {
        MBUS_HEADER_INTRO_LENGTH + self.length_field() + MBUS_FOOTER_LENGTH
    }
}

/// Intro bytes: start, length, length, start
fn frame_intro(input: &[u8]) -> IResult<&[u8], (u8, u8, u8, u8)> {
    tuple((be_u8, be_u8, be_u8, be_u8))(input)
}

/// Header fields, user data, checksum and stop byte of a frame whose
/// declared length is already known to fit.
fn frame_body(input: &[u8], data_len: usize) -> IResult<&[u8], (MBusFrame, u8)> {
    let (input, (control, address, control_information, source_tsap, destination_tsap)) =
        tuple((be_u8, be_u8, be_u8, be_u8, be_u8))(input)?;
    let (input, data) = take(data_len)(input)?;
    let (input, (checksum, stop)) = tuple((be_u8, be_u8))(input)?;
    Ok((
        input,
        (
            MBusFrame {
                control,
                address,
                control_information,
                source_tsap,
                destination_tsap,
                data: data.to_vec(),
                checksum,
            },
            stop,
        ),
    ))
}

/// Parses and validates the frame starting at `offset` of `raw`.
///
/// Returns the frame and the offset just past it.
pub fn parse_frame_at(
    raw: &[u8],
    offset: usize,
    verify_checksum: bool,
) -> Result<(MBusFrame, usize), FramingError> {
    let input = raw.get(offset..).unwrap_or_default();

    let (rest, (start1, length1, length2, start2)) =
        frame_intro(input).map_err(|_| FramingError::Truncated {
            offset,
            declared: MBUS_HEADER_INTRO_LENGTH,
            available: input.len(),
        })?;

    if start1 != MBUS_START_BYTE {
        return Err(FramingError::InvalidStartByte {
            offset: offset + MBUS_START1_OFFSET,
            found: start1,
        });
    }
    if start2 != MBUS_START_BYTE {
        return Err(FramingError::InvalidStartByte {
            offset: offset + MBUS_START2_OFFSET,
            found: start2,
        });
    }
    if length1 != length2 {
        return Err(FramingError::LengthMismatch {
            offset,
            first: length1,
            second: length2,
        });
    }

    let length = length1 as usize;
    let frame_len = MBUS_HEADER_INTRO_LENGTH + length + MBUS_FOOTER_LENGTH;
    if input.len() < frame_len {
        return Err(FramingError::Truncated {
            offset,
            declared: frame_len,
            available: input.len(),
        });
    }
    if length < MBUS_LENGTH_FIELD_OVERHEAD {
        return Err(FramingError::FrameTooShort {
            offset,
            length: length1,
        });
    }

    let (_, (frame, stop)) = frame_body(rest, length - MBUS_LENGTH_FIELD_OVERHEAD).map_err(|_| {
        FramingError::Truncated {
            offset,
            declared: frame_len,
            available: input.len(),
        }
    })?;

    if stop != MBUS_STOP_BYTE {
        return Err(FramingError::InvalidStopByte {
            offset: offset + frame_len - 1,
            found: stop,
        });
    }

    if verify_checksum {
        let calculated = calculate_checksum(&frame);
        if calculated != frame.checksum {
            return Err(FramingError::ChecksumMismatch {
                offset,
                expected: frame.checksum,
                calculated,
            });
        }
    }

    Ok((frame, offset + frame_len))
}

/// Splits a raw telegram into its validated frames.
pub fn parse_frames(raw: &[u8], verify_checksum: bool) -> Result<Vec<MBusFrame>, FramingError> {
    if raw.is_empty() {
        return Err(FramingError::Empty);
    }

    let mut frames = Vec::new();
    let mut offset = 0;
    while offset < raw.len() {
        let (frame, next) = parse_frame_at(raw, offset, verify_checksum)?;
        log::debug!(
            "M-Bus frame at offset {offset}: L={} CI=0x{:02X}, {} data bytes",
            frame.length_field(),
            frame.control_information,
            frame.data.len()
        );
        frames.push(frame);
        offset = next;
    }
    Ok(frames)
}

/// Validates every frame of a raw telegram and concatenates their user data
/// in frame order.
pub fn reassemble(raw: &[u8], verify_checksum: bool) -> Result<Vec<u8>, FramingError> {
    let frames = parse_frames(raw, verify_checksum)?;
    let mut payload = Vec::with_capacity(frames.iter().map(|f| f.data.len()).sum());
    for frame in &frames {
        payload.extend_from_slice(&frame.data);
    }
    Ok(payload)
}

/// Packs a frame into its wire representation.
///
/// Fails when the data does not fit the one-byte L field.
pub fn pack_frame(frame: &MBusFrame) -> Result<Vec<u8>, FramingError> {
    let length = u8::try_from(frame.length_field()).map_err(|_| FramingError::DataTooLong {
        length: frame.data.len(),
        limit: u8::MAX as usize - MBUS_LENGTH_FIELD_OVERHEAD,
    })?;
    let mut data = Vec::with_capacity(frame.wire_len());
    data.push(MBUS_START_BYTE);
    data.push(length);
    data.push(length);
    data.push(MBUS_START_BYTE);
    data.push(frame.control);
    data.push(frame.address);
    data.push(frame.control_information);
    data.push(frame.source_tsap);
    data.push(frame.destination_tsap);
    data.extend_from_slice(&frame.data);
    data.push(frame.checksum);
    data.push(MBUS_STOP_BYTE);
    Ok(data)
}

/// Splits a payload into as many frames as needed, each carrying at most
/// `max_data_per_frame` user data bytes.
pub fn split_into_frames(payload: &[u8], max_data_per_frame: usize) -> Vec<MBusFrame> {
    let chunk = max_data_per_frame
        .clamp(1, MBUS_MAX_FRAME_LENGTH - MBUS_LENGTH_FIELD_OVERHEAD);
    let chunks: Vec<&[u8]> = payload.chunks(chunk).collect();
    let count = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, data)| MBusFrame::segment(data.to_vec(), i as u8, i + 1 == count))
        .collect()
}

/// Packs a payload into a complete raw telegram.
pub fn pack_telegram(payload: &[u8], max_data_per_frame: usize) -> Result<Vec<u8>, FramingError> {
    pack_frames(&split_into_frames(payload, max_data_per_frame))
}

/// Concatenates the wire form of every frame.
pub fn pack_frames(frames: &[MBusFrame]) -> Result<Vec<u8>, FramingError> {
    let mut raw = Vec::with_capacity(frames.iter().map(MBusFrame::wire_len).sum());
    for frame in frames {
        raw.extend_from_slice(&pack_frame(frame)?);
    }
    Ok(raw)
}

/// Arithmetic checksum over every byte counted by the L field.
pub fn calculate_checksum(frame: &MBusFrame) -> u8 {
    [
        frame.control,
        frame.address,
        frame.control_information,
        frame.source_tsap,
        frame.destination_tsap,
    ]
    .iter()
    .chain(frame.data.iter())
    .fold(0u8, |sum, b| sum.wrapping_add(*b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        pack_frame(&MBusFrame::segment(vec![0x01, 0x02, 0x03], 0, true)).unwrap()
    }

    #[test]
    fn test_pack_layout() {
        let bytes = sample();
        assert_eq!(
            bytes,
            vec![0x68, 0x08, 0x08, 0x68, 0x53, 0xFF, 0x10, 0x01, 0x67, 0x01, 0x02, 0x03, 0xD0, 0x16]
        );
    }

    #[test]
    fn test_second_start_byte_checked() {
        let mut bytes = sample();
        bytes[3] = 0x69;
        assert_eq!(
            parse_frame_at(&bytes, 0, false),
            Err(FramingError::InvalidStartByte { offset: 3, found: 0x69 })
        );
    }

    #[test]
    fn test_frame_too_short_for_header() {
        let bytes = [0x68, 0x03, 0x03, 0x68, 0x53, 0xFF, 0x10, 0x53, 0x16];
        assert_eq!(
            parse_frame_at(&bytes, 0, false),
            Err(FramingError::FrameTooShort { offset: 0, length: 3 })
        );
    }

    #[test]
    fn test_checksum_only_checked_on_request() {
        let mut bytes = sample();
        bytes[12] ^= 0xFF;
        assert!(parse_frame_at(&bytes, 0, false).is_ok());
        assert!(matches!(
            parse_frame_at(&bytes, 0, true),
            Err(FramingError::ChecksumMismatch { offset: 0, .. })
        ));
    }

    #[test]
    fn test_pack_rejects_data_beyond_length_field() {
        let largest = MBusFrame::segment(vec![0xAA; 250], 0, true);
        assert_eq!(pack_frame(&largest).unwrap()[1], 0xFF);

        let oversized = MBusFrame::segment(vec![0xAA; 251], 0, true);
        assert_eq!(
            pack_frame(&oversized),
            Err(FramingError::DataTooLong {
                length: 251,
                limit: 250
            })
        );
    }

    #[test]
    fn test_split_sets_final_flag_on_last_segment() {
        let frames = split_into_frames(&[0u8; 10], 4);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].control_information, 0x00);
        assert_eq!(frames[1].control_information, 0x01);
        assert_eq!(frames[2].control_information, 0x12);
        assert_eq!(frames[2].data.len(), 2);
    }
}
