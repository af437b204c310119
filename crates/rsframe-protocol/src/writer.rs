use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::builder::{build_multi_param, build_packet};
use crate::error::{FrameError, Result};
use crate::header::{Preamble, HEADER_SIZE};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    preamble: Preamble,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T, preamble: Preamble) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY + HEADER_SIZE),
            preamble,
        }
    }

    /// Frame `payload` and write it out (blocking).
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        build_packet(&mut self.buf, payload, self.preamble)?;
        write_fully(&mut self.inner, &self.buf)?;
        self.flush()
    }

    /// Frame the concatenation of `segments` and write it out (blocking).
    pub fn send_segments(&mut self, segments: &[&[u8]]) -> Result<()> {
        let frame = build_multi_param(segments, self.preamble)?;
        write_fully(&mut self.inner, &frame)?;
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    pub fn preamble(&self) -> Preamble {
        self.preamble
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn write_fully<T: Write>(inner: &mut T, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}

impl<T> std::fmt::Debug for FrameWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("preamble", &self.preamble)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::builder::build_single_param;
    use crate::header::MAX_PAYLOAD;
    use crate::reader::FrameReader;

    const PREAMBLE: Preamble = Preamble::new(0xAA, 0x55);

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn write_single_frame() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()), PREAMBLE);
        writer.send(b"hello").unwrap();

        let expected = build_single_param(b"hello", PREAMBLE).unwrap();
        assert_eq!(written(writer), expected.to_vec());
    }

    #[test]
    fn write_multiple_frames() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()), PREAMBLE);
        writer.send(b"one").unwrap();
        writer.send(b"two").unwrap();
        writer.send(b"three").unwrap();

        let mut reader = FrameReader::new(Cursor::new(written(writer)), PREAMBLE);
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"one");
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"two");
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"three");
    }

    #[test]
    fn segments_are_concatenated() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()), PREAMBLE);
        writer.send_segments(&[b"scatter", b"-", b"gather"]).unwrap();

        let mut reader = FrameReader::new(Cursor::new(written(writer)), PREAMBLE);
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"scatter-gather");
    }

    #[test]
    fn payload_too_large_rejected() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()), PREAMBLE);
        let payload = vec![0u8; MAX_PAYLOAD + 1];

        let err = writer.send(&payload).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink, PREAMBLE);

        writer.send(b"x").unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()), PREAMBLE);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        assert_eq!(writer.preamble(), PREAMBLE);
        assert!(format!("{writer:?}").contains("FrameWriter"));
        let _inner = writer.into_inner();
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut writer = FrameWriter::new(FlakyWriter::new(ErrorKind::Interrupted), PREAMBLE);
        writer.send(b"retry").unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data.len(), HEADER_SIZE + 5);
    }

    #[test]
    fn handles_would_block_write_and_flush() {
        let mut writer = FrameWriter::new(FlakyWriter::new(ErrorKind::WouldBlock), PREAMBLE);
        writer.send(b"retry").unwrap();

        let inner = writer.into_inner();
        assert_eq!(inner.data.len(), HEADER_SIZE + 5);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter, PREAMBLE);
        let err = writer.send(b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails the first write and the first flush with `kind`, then behaves.
    struct FlakyWriter {
        kind: ErrorKind,
        write_failed: bool,
        flush_failed: bool,
        data: Vec<u8>,
    }

    impl FlakyWriter {
        fn new(kind: ErrorKind) -> Self {
            Self {
                kind,
                write_failed: false,
                flush_failed: false,
                data: Vec::new(),
            }
        }
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.write_failed {
                self.write_failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            // Short writes exercise the offset loop.
            let n = buf.len().min(3);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_failed {
                self.flush_failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
