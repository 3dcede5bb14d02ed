//! The decoded form of a tar header block and its on-disk layout.

use std::fmt;

use crate::error::{Error, Result};

/// Size of every header block, and the alignment of every entry.
pub const BLOCK_SIZE: usize = 512;

pub(crate) mod layout {
    //! Byte offsets and widths of the fixed header fields.

    pub const NAME: usize = 0;
    pub const NAME_LEN: usize = 100;
    pub const MODE: usize = 100;
    pub const MODE_LEN: usize = 8;
    pub const OWNER: usize = 108;
    pub const OWNER_LEN: usize = 8;
    pub const GROUP: usize = 116;
    pub const GROUP_LEN: usize = 8;
    pub const SIZE: usize = 124;
    pub const SIZE_LEN: usize = 12;
    pub const MTIME: usize = 136;
    pub const MTIME_LEN: usize = 12;
    pub const CHECKSUM: usize = 148;
    pub const CHECKSUM_LEN: usize = 8;
    pub const TYPE: usize = 156;
    pub const LINKNAME: usize = 157;
    pub const LINKNAME_LEN: usize = 100;
}

/// Maximum length in bytes of an entry name or link target.
pub const NAME_MAX: usize = layout::NAME_LEN;

/// The type tag stored in byte 156 of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryType {
    #[default]
    Regular,
    HardLink,
    Symlink,
    CharDevice,
    BlockDevice,
    Directory,
    Fifo,
    Other(u8),
}

impl EntryType {
    /// A NUL tag is read as a regular file, as old archivers wrote it.
    pub fn from_byte(byte: u8) -> EntryType {
        match byte {
            b'0' | b'\0' => EntryType::Regular,
            b'1' => EntryType::HardLink,
            b'2' => EntryType::Symlink,
            b'3' => EntryType::CharDevice,
            b'4' => EntryType::BlockDevice,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            other => EntryType::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            EntryType::Regular => b'0',
            EntryType::HardLink => b'1',
            EntryType::Symlink => b'2',
            EntryType::CharDevice => b'3',
            EntryType::BlockDevice => b'4',
            EntryType::Directory => b'5',
            EntryType::Fifo => b'6',
            EntryType::Other(0) => b'0',
            EntryType::Other(byte) => byte,
        }
    }

    #[inline(always)]
    pub fn is_file(self) -> bool {
        self == EntryType::Regular
    }

    #[inline(always)]
    pub fn is_dir(self) -> bool {
        self == EntryType::Directory
    }

    #[inline(always)]
    pub fn is_symlink(self) -> bool {
        self == EntryType::Symlink
    }
}

/// A name field of at most [`NAME_MAX`] bytes, stored inline.
///
/// Tar does not mandate an encoding for names, so the bytes are kept as-is;
/// use [`EntryName::to_str`] when UTF-8 is expected.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryName {
    buf: [u8; NAME_MAX],
    len: u8,
}

impl EntryName {
    pub const fn empty() -> EntryName {
        EntryName {
            buf: [0; NAME_MAX],
            len: 0,
        }
    }

    pub fn new<B: AsRef<[u8]>>(name: B) -> Result<EntryName> {
        let name = name.as_ref();
        if name.len() > NAME_MAX {
            return Err(Error::NameTooLong {
                len: name.len(),
                limit: NAME_MAX,
            });
        }
        if name.contains(&0) {
            return Err(Error::ApiMisuse("entry names cannot contain NUL bytes"));
        }

        let mut out = EntryName::empty();
        out.buf[..name.len()].copy_from_slice(name);
        out.len = name.len() as u8;
        Ok(out)
    }

    /// Reads a field up to its first NUL, or the whole field if it has none.
    pub(crate) fn from_field(field: &[u8]) -> EntryName {
        let field = &field[..field.len().min(NAME_MAX)];
        let len = field.iter().position(|b| *b == 0).unwrap_or(field.len());

        let mut out = EntryName::empty();
        out.buf[..len].copy_from_slice(&field[..len]);
        out.len = len as u8;
        out
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    pub fn to_str(&self) -> std::result::Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self.as_bytes())
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for EntryName {
    fn default() -> Self {
        EntryName::empty()
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl PartialEq<str> for EntryName {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for EntryName {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

/// One archive entry's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub name: EntryName,

    /// Target of a symlink or hard link; empty otherwise.
    pub linkname: EntryName,

    /// POSIX permission bits.
    pub mode: u32,
    pub owner: u32,
    pub group: u32,

    /// The exact length of the payload that follows the header. Entries are
    /// padded with zeroes to the next block boundary after this many bytes.
    pub size: u64,

    /// Modification time in seconds since the Unix epoch.
    pub mtime: u64,
    pub kind: EntryType,
}

impl Header {
    pub fn new<B: AsRef<[u8]>>(name: B, kind: EntryType) -> Result<Header> {
        Ok(Header {
            name: EntryName::new(name)?,
            kind,
            ..Default::default()
        })
    }

    pub fn with_size(mut self, size: u64) -> Header {
        self.size = size;
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Header {
        self.mode = mode;
        self
    }

    pub fn with_mtime(mut self, mtime: u64) -> Header {
        self.mtime = mtime;
        self
    }

    pub fn with_owner(mut self, owner: u32, group: u32) -> Header {
        self.owner = owner;
        self.group = group;
        self
    }

    pub fn with_linkname<B: AsRef<[u8]>>(mut self, linkname: B) -> Result<Header> {
        self.linkname = EntryName::new(linkname)?;
        Ok(self)
    }

    /// Bytes the payload occupies on disk, including the trailing padding.
    #[inline(always)]
    pub fn padded_size(&self) -> u64 {
        round_up(self.size)
    }
}

/// Rounds `n` up to the next multiple of [`BLOCK_SIZE`].
#[inline(always)]
pub fn round_up(n: u64) -> u64 {
    let block = BLOCK_SIZE as u64;
    n + (block - n % block) % block
}
