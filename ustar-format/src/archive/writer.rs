use super::{data_end, Archive, State, WriteState};
use crate::codec;
use crate::error::{Error, Result};
use crate::header::{round_up, EntryName, EntryType, Header, BLOCK_SIZE};
use crate::stream::Stream;

impl<S: Stream> Archive<S> {
    /// Pads the previous entry to the block boundary if it wrote payload.
    ///
    /// Padding is deferred to here so a caller never has to announce which
    /// `write_data` call is its last.
    fn finish_entry(&mut self, state: WriteState) -> Result<()> {
        match state {
            WriteState::DataInProgress { header, offset } => {
                let pos = self.stream.pos();
                let end = data_end(offset, &header);
                if pos < end {
                    tracing::warn!(
                        name = %header.name,
                        declared = header.size,
                        missing = end - pos,
                        "entry closed before its declared size was written"
                    );
                }
                self.stream.write_zeroes(round_up(pos) - pos)?;
            }
            WriteState::HeaderWritten { header, .. } if header.size > 0 => {
                tracing::warn!(
                    name = %header.name,
                    declared = header.size,
                    "entry closed without any of its payload"
                );
            }
            _ => {}
        }

        self.state = State::Write(WriteState::AwaitingHeader);
        Ok(())
    }

    /// Writes the header block for a new entry. Exactly `header.size` bytes
    /// of payload are expected to follow through [`Archive::write_data`].
    pub fn write_header(&mut self, header: &Header) -> Result<()> {
        let state = self.write_state()?;
        if let WriteState::Finalized = state {
            return Err(Error::ApiMisuse("cannot write a header after finalize"));
        }

        self.finish_entry(state)?;

        codec::encode_into(header, &mut self.block)?;
        let offset = self.stream.pos();
        self.stream.write(&self.block)?;

        tracing::debug!(offset, name = %header.name, size = header.size, "wrote header");
        self.state = State::Write(WriteState::HeaderWritten {
            header: *header,
            offset,
        });
        Ok(())
    }

    fn entry_header<N: AsRef<[u8]>>(&self, name: N, kind: EntryType, mode: u32) -> Result<Header> {
        Ok(Header::new(name, kind)?
            .with_mode(mode)
            .with_owner(self.options.owner, self.options.group)
            .with_mtime(self.options.mtime))
    }

    /// Writes the header of a regular file of `size` bytes.
    pub fn write_file_header<N: AsRef<[u8]>>(&mut self, name: N, size: u64) -> Result<()> {
        self.write_state()?;
        let header = self
            .entry_header(name, EntryType::Regular, self.options.file_mode)?
            .with_size(size);
        self.write_header(&header)
    }

    pub fn write_dir_header<N: AsRef<[u8]>>(&mut self, name: N) -> Result<()> {
        self.write_state()?;
        let header = self.entry_header(name, EntryType::Directory, self.options.dir_mode)?;
        self.write_header(&header)
    }

    pub fn write_symlink_header<N: AsRef<[u8]>, T: AsRef<[u8]>>(
        &mut self,
        name: N,
        target: T,
    ) -> Result<()> {
        self.write_state()?;
        let mut header = self.entry_header(name, EntryType::Symlink, self.options.symlink_mode)?;
        header.linkname = EntryName::new(target)?;
        self.write_header(&header)
    }

    /// Writes payload for the current entry.
    ///
    /// Bytes past the size declared in the header are dropped rather than
    /// written, since the header is already in the stream. Returns how many
    /// bytes were written, which is `0` once the entry is full.
    pub fn write_data(&mut self, data: &[u8]) -> Result<usize> {
        let (header, offset) = match self.write_state()? {
            WriteState::HeaderWritten { header, offset }
            | WriteState::DataInProgress { header, offset } => (header, offset),
            WriteState::AwaitingHeader => {
                return Err(Error::ApiMisuse("write_data called before write_header"))
            }
            WriteState::Finalized => {
                return Err(Error::ApiMisuse("cannot write data after finalize"))
            }
        };

        let end = data_end(offset, &header);
        let pos = self.stream.pos();
        let len = (data.len() as u64).min(end.saturating_sub(pos)) as usize;

        if len < data.len() {
            tracing::warn!(
                name = %header.name,
                declared = header.size,
                discarded = data.len() - len,
                "discarding bytes past the declared entry size"
            );
        }
        if len == 0 {
            return Ok(0);
        }

        self.stream.write(&data[..len])?;
        self.state = State::Write(WriteState::DataInProgress { header, offset });
        Ok(len)
    }

    /// Pads the last entry and writes the two zero blocks that end an archive.
    /// Calling it again does nothing.
    pub fn finalize(&mut self) -> Result<()> {
        let state = self.write_state()?;
        if let WriteState::Finalized = state {
            return Ok(());
        }

        self.finish_entry(state)?;
        self.stream.write_zeroes(2 * BLOCK_SIZE as u64)?;
        self.state = State::Write(WriteState::Finalized);

        tracing::debug!(pos = self.stream.pos(), "finalized archive");
        Ok(())
    }
}
