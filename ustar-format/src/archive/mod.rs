//! The archive cursor: a stream bound in one access mode, plus the state
//! machine that decides which calls are legal next.
//!
//! ```text
//! read:  Rewound --advance--> Positioned --advance--> ... --> AtTerminator
//!          ^------------------- rewind ------------------------'
//!
//! write: AwaitingHeader --write_header--> HeaderWritten --write_data--> DataInProgress
//!              ^-------------------- write_header -----------------------------'
//!        (any) --finalize--> Finalized
//! ```

#[cfg(feature = "reader")]
mod reader;
#[cfg(feature = "writer")]
mod writer;

use crate::codec::RawHeader;
use crate::error::{Error, Result};
use crate::header::{Header, BLOCK_SIZE};
use crate::stream::{Stream, Tracked};

/// Access mode an archive is bound with. An archive is never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// Defaults applied by the convenience header builders.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub file_mode: u32,
    pub dir_mode: u32,
    pub symlink_mode: u32,
    pub owner: u32,
    pub group: u32,
    pub mtime: u64,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            file_mode: 0o644,
            dir_mode: 0o755,
            symlink_mode: 0o777,
            owner: 0,
            group: 0,
            mtime: 0,
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn with_symlink_mode(mut self, mode: u32) -> Self {
        self.symlink_mode = mode;
        self
    }

    pub fn with_owner(mut self, owner: u32, group: u32) -> Self {
        self.owner = owner;
        self.group = group;
        self
    }

    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ReadState {
    /// No header is loaded; the next advance decodes the block at the
    /// current position. Also the state after a failed decode.
    Rewound,
    Positioned { header: Header, offset: u64 },
    AtTerminator,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum WriteState {
    AwaitingHeader,
    HeaderWritten { header: Header, offset: u64 },
    /// Payload bytes were written and the entry still owes its padding.
    DataInProgress { header: Header, offset: u64 },
    Finalized,
}

#[derive(Debug)]
enum State {
    Read(ReadState),
    Write(WriteState),
}

/// Absolute offset one past the last payload byte of the entry whose header
/// starts at `offset`.
#[inline(always)]
pub(crate) fn data_end(offset: u64, header: &Header) -> u64 {
    offset + BLOCK_SIZE as u64 + header.size
}

/// A sequential cursor over a tar archive held in a [`Stream`].
///
/// The stream must be positioned at offset 0 when it is bound, and must not
/// be touched by anything else until the archive is closed.
#[derive(Debug)]
pub struct Archive<S: Stream> {
    stream: Tracked<S>,
    state: State,
    block: RawHeader,
    options: WriterOptions,
    open: bool,
}

impl<S: Stream> Archive<S> {
    pub fn new(stream: S, mode: Mode) -> Archive<S> {
        Self::with_options(stream, mode, WriterOptions::default())
    }

    pub fn with_options(stream: S, mode: Mode, options: WriterOptions) -> Archive<S> {
        let state = match mode {
            Mode::Read => State::Read(ReadState::Rewound),
            Mode::Write => State::Write(WriteState::AwaitingHeader),
        };

        Archive {
            stream: Tracked::new(stream),
            state,
            block: [0u8; BLOCK_SIZE],
            options,
            open: true,
        }
    }

    #[inline(always)]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[inline(always)]
    pub fn mode(&self) -> Mode {
        match self.state {
            State::Read(_) => Mode::Read,
            State::Write(_) => Mode::Write,
        }
    }

    /// Absolute byte offset of the cursor within the stream.
    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.stream.pos()
    }

    #[inline(always)]
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// The header of the current entry: the last one read in read mode, or the
    /// one being written in write mode.
    pub fn header(&self) -> Option<&Header> {
        match &self.state {
            State::Read(ReadState::Positioned { header, .. })
            | State::Write(WriteState::HeaderWritten { header, .. })
            | State::Write(WriteState::DataInProgress { header, .. }) => Some(header),
            _ => None,
        }
    }

    /// Closes the archive. In write mode the archive is finalized first, so
    /// the result is well-formed even if [`Archive::finalize`] was never called.
    ///
    /// If both finalizing and closing the stream fail, the finalize error wins.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::ApiMisuse("archive is already closed"));
        }

        #[cfg(feature = "writer")]
        let finalized = match self.mode() {
            Mode::Write => self.finalize(),
            Mode::Read => Ok(()),
        };
        #[cfg(not(feature = "writer"))]
        let finalized: Result<()> = Ok(());

        self.open = false;
        let closed = self.stream.close();
        tracing::debug!(pos = self.stream.pos(), "closed archive");

        finalized.and(closed)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::ApiMisuse("archive is closed"))
        }
    }

    #[cfg(feature = "reader")]
    fn read_state(&self) -> Result<ReadState> {
        self.ensure_open()?;
        match self.state {
            State::Read(state) => Ok(state),
            State::Write(_) => Err(Error::ApiMisuse("archive was opened for writing")),
        }
    }

    #[cfg(feature = "writer")]
    fn write_state(&self) -> Result<WriteState> {
        self.ensure_open()?;
        match self.state {
            State::Write(state) => Ok(state),
            State::Read(_) => Err(Error::ApiMisuse("archive was opened for reading")),
        }
    }
}

impl<S: Stream> Drop for Archive<S> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::{Cursor, SeekFrom};
    use std::rc::Rc;

    use super::*;
    use crate::codec;
    use crate::header::EntryType;
    use crate::stream::IoStream;

    #[derive(Debug, Default)]
    struct Faults {
        read: Cell<bool>,
        write: Cell<bool>,
        seek: Cell<bool>,
        close: Cell<bool>,
    }

    /// An in-memory stream whose operations can be made to fail on demand.
    #[derive(Debug)]
    struct FlakyStream {
        inner: IoStream<Cursor<Vec<u8>>>,
        faults: Rc<Faults>,
    }

    impl FlakyStream {
        fn new(data: Vec<u8>) -> (FlakyStream, Rc<Faults>) {
            let faults = Rc::new(Faults::default());
            let stream = FlakyStream {
                inner: IoStream::new(Cursor::new(data)),
                faults: faults.clone(),
            };
            (stream, faults)
        }
    }

    fn fault(on: &Cell<bool>, op: &str) -> std::io::Result<()> {
        if on.get() {
            Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{} unavailable", op),
            ))
        } else {
            Ok(())
        }
    }

    impl Stream for FlakyStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
            fault(&self.faults.read, "read")?;
            self.inner.read(buf)
        }

        fn write(&mut self, buf: &[u8]) -> std::io::Result<()> {
            fault(&self.faults.write, "write")?;
            self.inner.write(buf)
        }

        fn seek(&mut self, pos: u64) -> std::io::Result<()> {
            fault(&self.faults.seek, "seek")?;
            self.inner.seek(pos)
        }

        fn close(&mut self) -> std::io::Result<()> {
            fault(&self.faults.close, "close")?;
            self.inner.close()
        }
    }

    fn two_entries() -> Vec<u8> {
        let a = Header::new("a", EntryType::Regular).unwrap().with_size(3);
        let b = Header::new("b", EntryType::Regular).unwrap();

        let mut out = codec::encode(&a).unwrap().to_vec();
        out.extend_from_slice(b"abc");
        out.resize(2 * BLOCK_SIZE, 0);
        out.extend_from_slice(&codec::encode(&b).unwrap());
        out.resize(5 * BLOCK_SIZE, 0);
        out
    }

    #[cfg(feature = "writer")]
    #[test]
    fn write_failures_keep_state() {
        let (stream, faults) = FlakyStream::new(vec![]);
        let mut ar = Archive::new(stream, Mode::Write);

        faults.write.set(true);
        assert!(matches!(
            ar.write_file_header("a", 3),
            Err(Error::WriteFailed(_))
        ));
        assert_eq!(ar.position(), 0);
        assert!(ar.header().is_none());

        faults.write.set(false);
        ar.write_file_header("a", 3).unwrap();

        faults.write.set(true);
        assert!(matches!(ar.write_data(b"abc"), Err(Error::WriteFailed(_))));
        assert_eq!(ar.position(), 512);
        assert_eq!(ar.header().unwrap().name, "a");

        faults.write.set(false);
        assert_eq!(ar.write_data(b"abc").unwrap(), 3);

        // The owed padding fails, so the entry stays open.
        faults.write.set(true);
        assert!(matches!(ar.finalize(), Err(Error::WriteFailed(_))));
        assert_eq!(ar.position(), 515);
        assert_eq!(ar.header().unwrap().name, "a");

        faults.write.set(false);
        ar.finalize().unwrap();
        assert_eq!(ar.position(), 512 + 512 + 1024);
    }

    #[cfg(feature = "writer")]
    #[test]
    fn close_prefers_finalize_error() {
        let (stream, faults) = FlakyStream::new(vec![]);
        let mut ar = Archive::new(stream, Mode::Write);
        ar.write_dir_header("d/").unwrap();

        faults.write.set(true);
        faults.close.set(true);
        assert!(matches!(ar.close(), Err(Error::WriteFailed(_))));
        assert!(!ar.is_open());
        assert!(matches!(ar.close(), Err(Error::ApiMisuse(_))));

        let (stream, faults) = FlakyStream::new(vec![]);
        let mut ar = Archive::new(stream, Mode::Write);
        faults.close.set(true);
        assert!(matches!(ar.close(), Err(Error::Failure(_))));
        assert!(!ar.is_open());
    }

    #[cfg(feature = "reader")]
    #[test]
    fn seek_failures_keep_position() {
        let (stream, faults) = FlakyStream::new(two_entries());
        let mut ar = Archive::new(stream, Mode::Read);

        assert_eq!(ar.advance().unwrap().name, "a");

        faults.seek.set(true);
        assert!(matches!(ar.advance(), Err(Error::SeekFailed(_))));
        assert!(matches!(
            ar.seek_data(SeekFrom::Start(1)),
            Err(Error::SeekFailed(_))
        ));
        assert_eq!(ar.position(), 512);
        assert_eq!(ar.header().unwrap().name, "a");

        // Still on "a", so its payload can be read without seeking.
        let mut buf = [0u8; 8];
        assert_eq!(ar.read_data(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");

        faults.seek.set(false);
        assert_eq!(ar.advance().unwrap().name, "b");

        faults.seek.set(true);
        assert!(matches!(ar.rewind(), Err(Error::SeekFailed(_))));
        assert_eq!(ar.header().unwrap().name, "b");

        faults.seek.set(false);
        ar.rewind().unwrap();
        assert!(ar.header().is_none());
        assert_eq!(ar.advance().unwrap().name, "a");
    }

    #[cfg(feature = "reader")]
    #[test]
    fn read_failure_leaves_cursor_in_place() {
        let (stream, faults) = FlakyStream::new(two_entries());
        let mut ar = Archive::new(stream, Mode::Read);

        faults.read.set(true);
        assert!(matches!(ar.advance(), Err(Error::ReadFailed(_))));
        assert_eq!(ar.position(), 0);

        faults.read.set(false);
        assert_eq!(ar.advance().unwrap().name, "a");

        // A failed read after a successful skip resumes at the next header.
        faults.read.set(true);
        assert!(matches!(ar.advance(), Err(Error::ReadFailed(_))));
        assert_eq!(ar.position(), 1024);
        assert!(ar.header().is_none());

        faults.read.set(false);
        assert_eq!(ar.advance().unwrap().name, "b");
    }
}
