//! Opening archives stored in files.

use std::fs::File;
use std::path::Path;

use crate::archive::{Archive, Mode, WriterOptions};
use crate::error::{Error, Result};
use crate::stream::IoStream;

/// An archive backed by a file on disk.
pub type FileArchive = Archive<IoStream<File>>;

impl Archive<IoStream<File>> {
    /// Opens the archive at `path`.
    ///
    /// In [`Mode::Read`] the first block is checked to be either a valid
    /// header or the end of an empty archive before the archive is returned.
    /// In [`Mode::Write`] the file is created, or truncated if it exists.
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<FileArchive> {
        Self::open_with_options(path, mode, WriterOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        mode: Mode,
        options: WriterOptions,
    ) -> Result<FileArchive> {
        let path = path.as_ref();
        let file = match mode {
            Mode::Read => File::open(path),
            Mode::Write => File::create(path),
        }
        .map_err(|source| Error::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let mut archive = Archive::with_options(IoStream::new(file), mode, options);
        if mode == Mode::Read {
            check_first_block(&mut archive)?;
        }

        tracing::debug!(path = %path.display(), ?mode, "opened archive");
        Ok(archive)
    }

    /// Creates a new archive at `path` for writing.
    #[inline]
    pub fn create<P: AsRef<Path>>(path: P) -> Result<FileArchive> {
        Self::open(path, Mode::Write)
    }
}

#[cfg(feature = "reader")]
fn check_first_block(archive: &mut FileArchive) -> Result<()> {
    match archive.advance() {
        Ok(_) | Err(Error::NullRecord) => {}
        Err(e) => return Err(e),
    }
    archive.rewind()
}

#[cfg(not(feature = "reader"))]
fn check_first_block(_archive: &mut FileArchive) -> Result<()> {
    Ok(())
}
