//! Sequential reading and writing of USTAR tar archives over any seekable
//! byte stream, without holding the archive in memory.
//!
//! Bind a [`Stream`] to an [`Archive`] in [`Mode::Read`] to walk entries with
//! [`Archive::advance`] and pull their payload with [`Archive::read_data`], or
//! in [`Mode::Write`] to emit entries with [`Archive::write_header`] followed by
//! [`Archive::write_data`], ending with [`Archive::finalize`].
//!
//! ```no_run
//! use ustar_format::{Archive, Mode};
//!
//! # fn main() -> ustar_format::Result<()> {
//! let mut ar = Archive::create("out.tar")?;
//! ar.write_dir_header("dir/")?;
//! ar.write_file_header("dir/a.txt", 5)?;
//! ar.write_data(b"hello")?;
//! ar.close()?;
//!
//! let mut ar = Archive::open("out.tar", Mode::Read)?;
//! ar.find("dir/a.txt")?;
//! let mut contents = vec![];
//! ar.read_to_end_data(&mut contents)?;
//! # Ok(())
//! # }
//! ```

mod archive;
pub mod codec;
mod error;
pub mod fs;
pub mod header;
pub mod stream;

pub use archive::{Archive, Mode, WriterOptions};
pub use error::{Error, ErrorKind, Result};
pub use fs::FileArchive;
pub use header::{EntryName, EntryType, Header, BLOCK_SIZE, NAME_MAX};
pub use stream::{IoStream, Stream};
