use std::io::SeekFrom;
use std::ops::ControlFlow;

use super::{data_end, Archive, ReadState, State};
use crate::codec;
use crate::error::{Error, Result};
use crate::header::{round_up, Header, BLOCK_SIZE};
use crate::stream::Stream;

impl<S: Stream> Archive<S> {
    /// Seeks back to the start of the archive and forgets the current header.
    pub fn rewind(&mut self) -> Result<()> {
        self.read_state()?;
        self.stream.seek(0)?;
        self.state = State::Read(ReadState::Rewound);
        tracing::debug!("rewound archive");
        Ok(())
    }

    /// Moves to the next entry and decodes its header.
    ///
    /// The first call after [`Archive::rewind`] decodes the block at the
    /// current position. Later calls first skip the current entry's payload
    /// and padding. Reaching the end-of-archive block yields
    /// [`Error::NullRecord`], which is the normal end of iteration.
    pub fn advance(&mut self) -> Result<&Header> {
        match self.read_state()? {
            ReadState::AtTerminator => return Err(Error::NullRecord),
            ReadState::Positioned { header, offset } => {
                let next = offset + BLOCK_SIZE as u64 + round_up(header.size);
                self.stream.seek(next)?;
                self.state = State::Read(ReadState::Rewound);
            }
            ReadState::Rewound => {}
        }

        let offset = self.stream.pos();
        self.stream.read(&mut self.block)?;

        match codec::decode(&self.block) {
            Ok(header) => {
                tracing::debug!(offset, name = %header.name, size = header.size, "read header");
                self.state = State::Read(ReadState::Positioned { header, offset });
                self.header()
                    .ok_or(Error::ApiMisuse("header was not retained"))
            }
            Err(Error::NullRecord) => {
                tracing::debug!(offset, "reached end of archive");
                self.state = State::Read(ReadState::AtTerminator);
                Err(Error::NullRecord)
            }
            Err(e) => {
                tracing::debug!(offset, error = %e, "could not decode header");
                Err(e)
            }
        }
    }

    /// Visits every entry from the start of the archive.
    ///
    /// Returns `Ok(None)` once the end of the archive is reached, or
    /// `Ok(Some(value))` as soon as `f` breaks with `value`. Any other error
    /// stops the iteration and is returned.
    pub fn for_each<B, F>(&mut self, mut f: F) -> Result<Option<B>>
    where
        F: FnMut(&Header) -> ControlFlow<B>,
    {
        self.rewind()?;

        loop {
            let header = match self.advance() {
                Ok(header) => header,
                Err(Error::NullRecord) => return Ok(None),
                Err(e) => return Err(e),
            };

            if let ControlFlow::Break(value) = f(header) {
                return Ok(Some(value));
            }
        }
    }

    /// Positions the archive at the first entry named exactly `name`.
    pub fn find<N: AsRef<[u8]>>(&mut self, name: N) -> Result<&Header> {
        let name = name.as_ref();

        let found = self.for_each(|header| {
            if header.name.as_bytes() == name {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })?;

        match found {
            Some(()) => self
                .header()
                .ok_or(Error::ApiMisuse("header was not retained")),
            None => Err(Error::NotFound(String::from_utf8_lossy(name).into_owned())),
        }
    }

    fn positioned(&self) -> Result<(Header, u64)> {
        match self.read_state()? {
            ReadState::Positioned { header, offset } => Ok((header, offset)),
            _ => Err(Error::ApiMisuse("no entry header has been read")),
        }
    }

    /// Reads payload bytes of the current entry into `buf`, never past the
    /// entry's declared size. Returns the number of bytes read, which is `0`
    /// once the payload is exhausted.
    pub fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        let (header, offset) = self.positioned()?;
        let end = data_end(offset, &header);
        let pos = self.stream.pos();

        if pos >= end {
            return Ok(0);
        }

        let len = (buf.len() as u64).min(end - pos) as usize;
        self.stream.read(&mut buf[..len])?;
        Ok(len)
    }

    /// Reads the rest of the current entry's payload onto the end of `out`.
    pub fn read_to_end_data(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut chunk = [0u8; BLOCK_SIZE];
        let mut total = 0;

        loop {
            let n = self.read_data(&mut chunk)?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&chunk[..n]);
            total += n;
        }
    }

    /// Moves within the current entry's payload. `SeekFrom::Start` and
    /// `SeekFrom::End` are relative to the payload's first byte and one past
    /// its last byte. Returns the new offset from the start of the payload.
    pub fn seek_data(&mut self, pos: SeekFrom) -> Result<u64> {
        let (header, offset) = self.positioned()?;
        let start = offset + BLOCK_SIZE as u64;
        let len = header.size;

        let requested: i128 = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(delta) => self.stream.pos() as i128 - start as i128 + delta as i128,
            SeekFrom::End(delta) => len as i128 + delta as i128,
        };

        if requested < 0 || requested > len as i128 {
            return Err(Error::SeekOutOfRange { requested, len });
        }

        let target = requested as u64;
        self.stream.seek(start + target)?;
        Ok(target)
    }

    /// Whether the current entry has no payload left to read. Also true when
    /// there is no current entry.
    pub fn eof_data(&self) -> bool {
        match self.positioned() {
            Ok((header, offset)) => self.stream.pos() >= data_end(offset, &header),
            Err(_) => true,
        }
    }
}
