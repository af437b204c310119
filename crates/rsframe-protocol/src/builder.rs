//! Outbound frame assembly.
//!
//! Every variant computes the data CRC over the payload first and then the
//! header CRC over the six header bytes before it. Validation (payload length)
//! happens before anything is written, so a rejected call leaves `dest`
//! untouched.

use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::{crc16, crc16_segments, INITIAL};
use crate::error::{FrameError, Result};
use crate::header::{FrameHeader, Preamble, HEADER_SIZE, MAX_PAYLOAD};

/// Compute the header for `payload`.
pub fn encode_header(preamble: Preamble, payload: &[u8]) -> Result<FrameHeader> {
    let length = payload_length(payload.len())?;
    Ok(FrameHeader::new(preamble, length, crc16(payload, INITIAL)))
}

/// Clear `dest`, then write header and payload into it.
pub fn build_packet(dest: &mut BytesMut, payload: &[u8], preamble: Preamble) -> Result<()> {
    let header = encode_header(preamble, payload)?;
    dest.clear();
    dest.reserve(HEADER_SIZE + payload.len());
    dest.put_slice(header.as_bytes());
    dest.put_slice(payload);
    Ok(())
}

/// Like [`build_packet`], with the payload taken from another growable buffer.
pub fn build_packet_from_buffer(dest: &mut BytesMut, src: &BytesMut, preamble: Preamble) -> Result<()> {
    build_packet(dest, src.as_ref(), preamble)
}

/// Write only the eight header bytes for `payload` into `dest`.
pub fn build_header_in_place(
    dest: &mut [u8; HEADER_SIZE],
    payload: &[u8],
    preamble: Preamble,
) -> Result<()> {
    let header = encode_header(preamble, payload)?;
    dest.copy_from_slice(header.as_bytes());
    Ok(())
}

/// Fill the first [`HEADER_SIZE`] bytes of `frame` for the payload that
/// already occupies the rest of it.
pub fn frame_in_place(frame: &mut [u8], preamble: Preamble) -> Result<()> {
    let size = frame.len();
    let (header, payload) = frame
        .split_first_chunk_mut::<HEADER_SIZE>()
        .ok_or(FrameError::BufferTooShort {
            size,
            min: HEADER_SIZE,
        })?;
    build_header_in_place(header, payload, preamble)
}

/// Append a header for `payload` to `dest` without clearing it.
///
/// The caller appends the payload bytes next; this lets several frames share
/// one output buffer.
pub fn append_header(dest: &mut BytesMut, payload: &[u8], preamble: Preamble) -> Result<()> {
    let header = encode_header(preamble, payload)?;
    dest.put_slice(header.as_bytes());
    Ok(())
}

/// Build one frame into a freshly allocated buffer.
pub fn build_single_param(payload: &[u8], preamble: Preamble) -> Result<Bytes> {
    build_multi_param(&[payload], preamble)
}

/// Build one frame whose payload is the concatenation of `segments`.
pub fn build_multi_param(segments: &[&[u8]], preamble: Preamble) -> Result<Bytes> {
    let total = segments
        .iter()
        .try_fold(0usize, |acc, segment| acc.checked_add(segment.len()))
        .unwrap_or(usize::MAX);
    let length = payload_length(total)?;

    let mut frame = try_allocate(HEADER_SIZE + total)?;
    let header = FrameHeader::new(preamble, length, crc16_segments(segments, INITIAL));
    frame.extend_from_slice(header.as_bytes());
    for segment in segments {
        frame.extend_from_slice(segment);
    }
    Ok(Bytes::from(frame))
}

/// Convert a payload size into the wire length field.
pub fn payload_length(size: usize) -> Result<u16> {
    u16::try_from(size).map_err(|_| FrameError::PayloadTooLarge {
        size,
        max: MAX_PAYLOAD,
    })
}

/// Reserve exactly `size` bytes, reporting failure instead of aborting.
pub(crate) fn try_allocate(size: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| FrameError::AllocationFailure { size })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_CRC_SPAN;

    const PREAMBLE: Preamble = Preamble::new(0xAA, 0x55);

    #[test]
    fn build_packet_layout() {
        let mut dest = BytesMut::new();
        build_packet(&mut dest, b"hello", PREAMBLE).unwrap();

        assert_eq!(dest.len(), HEADER_SIZE + 5);
        assert_eq!(&dest[..4], &[0xAA, 0x55, 0x00, 0x05]);
        assert_eq!(&dest[4..6], &crc16(b"hello", 0).to_be_bytes());
        assert_eq!(&dest[6..8], &crc16(&dest[..HEADER_CRC_SPAN], 0).to_be_bytes());
        assert_eq!(&dest[HEADER_SIZE..], b"hello");
    }

    #[test]
    fn build_packet_resets_destination() {
        let mut dest = BytesMut::from(&b"stale bytes"[..]);
        build_packet(&mut dest, b"x", PREAMBLE).unwrap();
        assert_eq!(dest.len(), HEADER_SIZE + 1);
        assert_eq!(dest[0], 0xAA);
    }

    #[test]
    fn empty_payload_has_zero_data_crc() {
        let mut dest = BytesMut::new();
        build_packet(&mut dest, b"", PREAMBLE).unwrap();
        assert_eq!(dest.len(), HEADER_SIZE);
        assert_eq!(&dest[2..6], &[0, 0, 0, 0]);
    }

    #[test]
    fn from_buffer_matches_slice_variant() {
        let src = BytesMut::from(&b"payload"[..]);
        let mut a = BytesMut::new();
        let mut b = BytesMut::new();
        build_packet_from_buffer(&mut a, &src, PREAMBLE).unwrap();
        build_packet(&mut b, b"payload", PREAMBLE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn header_in_place_matches_built_prefix() {
        let mut header = [0u8; HEADER_SIZE];
        build_header_in_place(&mut header, b"abc", PREAMBLE).unwrap();

        let mut full = BytesMut::new();
        build_packet(&mut full, b"abc", PREAMBLE).unwrap();
        assert_eq!(&full[..HEADER_SIZE], &header);
    }

    #[test]
    fn frame_in_place_uses_trailing_payload() {
        let mut frame = vec![0u8; HEADER_SIZE];
        frame.extend_from_slice(b"zero-copy");
        frame_in_place(&mut frame, PREAMBLE).unwrap();

        let expected = build_single_param(b"zero-copy", PREAMBLE).unwrap();
        assert_eq!(frame.as_slice(), expected.as_ref());
    }

    #[test]
    fn frame_in_place_rejects_short_buffer() {
        let mut frame = [0u8; 3];
        let err = frame_in_place(&mut frame, PREAMBLE).unwrap_err();
        assert!(matches!(err, FrameError::BufferTooShort { size: 3, min: HEADER_SIZE }));
        assert_eq!(frame, [0u8; 3]);
    }

    #[test]
    fn append_header_batches_frames() {
        let mut dest = BytesMut::new();
        append_header(&mut dest, b"one", PREAMBLE).unwrap();
        dest.put_slice(b"one");
        append_header(&mut dest, b"two!", PREAMBLE).unwrap();
        dest.put_slice(b"two!");

        let first = build_single_param(b"one", PREAMBLE).unwrap();
        let second = build_single_param(b"two!", PREAMBLE).unwrap();
        assert_eq!(&dest[..first.len()], first.as_ref());
        assert_eq!(&dest[first.len()..], second.as_ref());
    }

    #[test]
    fn multi_param_equals_concatenation() {
        let segments: [&[u8]; 3] = [b"alpha-", b"", b"omega"];
        let frame = build_multi_param(&segments, PREAMBLE).unwrap();

        let mut expected = BytesMut::new();
        build_packet(&mut expected, b"alpha-omega", PREAMBLE).unwrap();
        assert_eq!(frame.as_ref(), expected.as_ref());
    }

    #[test]
    fn multi_param_with_no_segments_is_empty_frame() {
        let frame = build_multi_param(&[], PREAMBLE).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE);
    }

    #[test]
    fn oversized_payload_rejected_without_side_effects() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        let mut dest = BytesMut::from(&b"keep"[..]);

        let err = build_packet(&mut dest, &payload, PREAMBLE).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size, .. } if size == MAX_PAYLOAD + 1));
        assert_eq!(dest.as_ref(), b"keep");

        let err = append_header(&mut dest, &payload, PREAMBLE).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert_eq!(dest.as_ref(), b"keep");

        let half = vec![0u8; MAX_PAYLOAD / 2 + 1];
        let err = build_multi_param(&[&half, &half], PREAMBLE).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn maximum_payload_accepted() {
        let payload = vec![0x5Au8; MAX_PAYLOAD];
        let frame = build_single_param(&payload, PREAMBLE).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + MAX_PAYLOAD);
        assert_eq!(&frame[2..4], &[0xFF, 0xFF]);
    }
}
