//! The byte stream an archive is bound to.
//!
//! The archive cursor only ever asks for exact-length reads and writes and
//! absolute seeks, so a backend need not support anything more. Any retry or
//! timeout policy belongs to the backend.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{Error, Result};

/// Caller-supplied stream operations.
///
/// Each call either transfers exactly `buf.len()` bytes or fails.
pub trait Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<()>;

    fn write(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Moves to an absolute byte offset from the start of the stream.
    fn seek(&mut self, pos: u64) -> std::io::Result<()>;

    fn close(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<S: Stream + ?Sized> Stream for &mut S {
    #[inline(always)]
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        (**self).read(buf)
    }

    #[inline(always)]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<()> {
        (**self).write(buf)
    }

    #[inline(always)]
    fn seek(&mut self, pos: u64) -> std::io::Result<()> {
        (**self).seek(pos)
    }

    #[inline(always)]
    fn close(&mut self) -> std::io::Result<()> {
        (**self).close()
    }
}

/// Adapts any `std::io` reader/writer/seeker, such as a `File` or a
/// `Cursor<Vec<u8>>`, to [`Stream`].
#[derive(Debug)]
pub struct IoStream<T> {
    inner: T,
}

impl<T> IoStream<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write + Seek> Stream for IoStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.inner.read_exact(buf)
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(buf)
    }

    fn seek(&mut self, pos: u64) -> std::io::Result<()> {
        self.inner.seek(SeekFrom::Start(pos)).map(|_| ())
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

const ZEROES: [u8; 512] = [0u8; 512];

/// A stream paired with the absolute offset it is believed to be at.
///
/// Range checks on entries are computed against `pos` so that no call to
/// the backend is needed just to learn where it is.
#[derive(Debug)]
pub(crate) struct Tracked<S> {
    inner: S,
    pos: u64,
}

impl<S: Stream> Tracked<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self { inner, pos: 0 }
    }

    #[inline(always)]
    pub(crate) fn pos(&self) -> u64 {
        self.pos
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        tracing::trace!(pos = self.pos, len = buf.len(), "read");
        self.inner.read(buf).map_err(Error::ReadFailed)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    pub(crate) fn write(&mut self, buf: &[u8]) -> Result<()> {
        tracing::trace!(pos = self.pos, len = buf.len(), "write");
        self.inner.write(buf).map_err(Error::WriteFailed)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    pub(crate) fn seek(&mut self, pos: u64) -> Result<()> {
        tracing::trace!(from = self.pos, to = pos, "seek");
        self.inner.seek(pos).map_err(Error::SeekFailed)?;
        self.pos = pos;
        Ok(())
    }

    pub(crate) fn write_zeroes(&mut self, mut n: u64) -> Result<()> {
        while n > 0 {
            let len = n.min(ZEROES.len() as u64) as usize;
            self.write(&ZEROES[..len])?;
            n -= len as u64;
        }
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<()> {
        self.inner.close().map_err(Error::Failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tracks_position() {
        let mut tracked = Tracked::new(IoStream::new(Cursor::new(Vec::new())));
        tracked.write(b"hello").unwrap();
        assert_eq!(tracked.pos(), 5);

        tracked.write_zeroes(1000).unwrap();
        assert_eq!(tracked.pos(), 1005);

        tracked.seek(1).unwrap();
        let mut buf = [0u8; 4];
        tracked.read(&mut buf).unwrap();
        assert_eq!(&buf, b"ello");
        assert_eq!(tracked.pos(), 5);
    }

    #[test]
    fn short_read_fails_without_moving() {
        let mut tracked = Tracked::new(IoStream::new(Cursor::new(vec![1u8, 2, 3])));
        let mut buf = [0u8; 8];
        assert!(matches!(tracked.read(&mut buf), Err(Error::ReadFailed(_))));
        assert_eq!(tracked.pos(), 0);
    }

    #[test]
    fn borrowed_stream() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut stream = IoStream::new(&mut cursor);
            let mut tracked = Tracked::new(&mut stream);
            tracked.write(b"abc").unwrap();
            tracked.close().unwrap();
        }
        assert_eq!(cursor.into_inner(), b"abc");
    }
}
