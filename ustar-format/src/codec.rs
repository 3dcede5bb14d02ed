//! Conversion between raw 512-byte header blocks and [`Header`]s.
//!
//! These functions do no I/O; the archive cursor feeds them its scratch block.

use crate::error::{Error, Result};
use crate::header::{layout, EntryName, EntryType, Header, BLOCK_SIZE};

/// A raw header block as stored in the archive.
pub type RawHeader = [u8; BLOCK_SIZE];

/// Sum of the checksum field when it holds eight ASCII spaces.
const CHECKSUM_BIAS: u64 = 8 * b' ' as u64;

/// Computes the header checksum, treating the checksum field as spaces.
pub fn checksum(raw: &RawHeader) -> u64 {
    let head = &raw[..layout::CHECKSUM];
    let tail = &raw[layout::CHECKSUM + layout::CHECKSUM_LEN..];

    head.iter()
        .chain(tail.iter())
        .fold(CHECKSUM_BIAS, |sum, byte| sum + *byte as u64)
}

/// Parses an octal field. Leading spaces are skipped, and the digits end at
/// the first NUL or space or at the end of the field. Only NULs and spaces
/// may follow the digits; anything else is malformed.
pub fn parse_octal(field: &[u8]) -> Result<u64> {
    let start = field
        .iter()
        .position(|b| *b != b' ')
        .unwrap_or(field.len());
    let field = &field[start..];
    let end = field
        .iter()
        .position(|b| *b == 0 || *b == b' ')
        .unwrap_or(field.len());
    let (digits, rest) = field.split_at(end);

    if rest.iter().any(|b| *b != 0 && *b != b' ') {
        return Err(Error::Overflow);
    }

    let mut n: u64 = 0;
    for byte in digits.iter().copied() {
        if !(b'0'..=b'7').contains(&byte) {
            return Err(Error::Overflow);
        }

        n = n
            .checked_mul(8)
            .and_then(|n| n.checked_add((byte - b'0') as u64))
            .ok_or(Error::Overflow)?;
    }

    Ok(n)
}

/// Writes `value` right-aligned and zero-padded into all but the last byte of
/// `field`, which is left as a NUL terminator.
pub fn print_octal(field: &mut [u8], value: u64) -> Result<()> {
    let (last, digits) = match field.split_last_mut() {
        Some(v) => v,
        None => return Err(Error::Overflow),
    };
    *last = 0;

    let mut value = value;
    for slot in digits.iter_mut().rev() {
        *slot = b'0' + (value % 8) as u8;
        value /= 8;
    }

    if value != 0 {
        return Err(Error::Overflow);
    }
    Ok(())
}

fn parse_field<T: TryFrom<u64>>(raw: &RawHeader, offset: usize, len: usize) -> Result<T> {
    let value = parse_octal(&raw[offset..offset + len])?;
    T::try_from(value).map_err(|_| Error::Overflow)
}

/// Decodes a header block.
///
/// Returns [`Error::NullRecord`] for a block whose checksum field starts with
/// NUL, which is how the end-of-archive blocks present.
pub fn decode(raw: &RawHeader) -> Result<Header> {
    let checksum_field = &raw[layout::CHECKSUM..layout::CHECKSUM + layout::CHECKSUM_LEN];
    if checksum_field[0] == 0 {
        return Err(Error::NullRecord);
    }

    let stored = parse_octal(checksum_field)?;
    let computed = checksum(raw);
    if stored != computed {
        return Err(Error::BadChecksum { stored, computed });
    }

    Ok(Header {
        mode: parse_field(raw, layout::MODE, layout::MODE_LEN)?,
        owner: parse_field(raw, layout::OWNER, layout::OWNER_LEN)?,
        group: parse_field(raw, layout::GROUP, layout::GROUP_LEN)?,
        size: parse_field(raw, layout::SIZE, layout::SIZE_LEN)?,
        mtime: parse_field(raw, layout::MTIME, layout::MTIME_LEN)?,
        kind: EntryType::from_byte(raw[layout::TYPE]),
        name: EntryName::from_field(&raw[layout::NAME..layout::NAME + layout::NAME_LEN]),
        linkname: EntryName::from_field(
            &raw[layout::LINKNAME..layout::LINKNAME + layout::LINKNAME_LEN],
        ),
    })
}

/// Encodes `header` into `raw`, overwriting all 512 bytes.
pub fn encode_into(header: &Header, raw: &mut RawHeader) -> Result<()> {
    raw.fill(0);

    print_octal(
        &mut raw[layout::MODE..layout::MODE + layout::MODE_LEN],
        header.mode as u64,
    )?;
    print_octal(
        &mut raw[layout::OWNER..layout::OWNER + layout::OWNER_LEN],
        header.owner as u64,
    )?;
    print_octal(
        &mut raw[layout::GROUP..layout::GROUP + layout::GROUP_LEN],
        header.group as u64,
    )?;
    print_octal(
        &mut raw[layout::SIZE..layout::SIZE + layout::SIZE_LEN],
        header.size,
    )?;
    print_octal(
        &mut raw[layout::MTIME..layout::MTIME + layout::MTIME_LEN],
        header.mtime,
    )?;

    raw[layout::TYPE] = header.kind.as_byte();

    let name = header.name.as_bytes();
    raw[layout::NAME..layout::NAME + name.len()].copy_from_slice(name);
    let linkname = header.linkname.as_bytes();
    raw[layout::LINKNAME..layout::LINKNAME + linkname.len()].copy_from_slice(linkname);

    // Seven digits, then a space where print_octal left its NUL.
    let sum = checksum(raw);
    let field = &mut raw[layout::CHECKSUM..layout::CHECKSUM + layout::CHECKSUM_LEN];
    print_octal(field, sum)?;
    field[layout::CHECKSUM_LEN - 1] = b' ';

    Ok(())
}

pub fn encode(header: &Header) -> Result<RawHeader> {
    let mut raw = [0u8; BLOCK_SIZE];
    encode_into(header, &mut raw)?;
    Ok(raw)
}
