use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way an archive operation can fail.
///
/// Stream failures carry the I/O error reported by the [`Stream`](crate::Stream)
/// implementation and are never retried here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failure")]
    Failure(#[source] std::io::Error),

    #[error("could not open archive. Path: '{}'", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read")]
    ReadFailed(#[source] std::io::Error),

    #[error("could not write")]
    WriteFailed(#[source] std::io::Error),

    #[error("could not seek")]
    SeekFailed(#[source] std::io::Error),

    #[error("seek out of range of entry data (requested offset {requested}, data is {len} bytes)")]
    SeekOutOfRange { requested: i128, len: u64 },

    #[error("bad checksum (stored {stored}, computed {computed})")]
    BadChecksum { stored: u64, computed: u64 },

    /// An all-zero block. At an iteration boundary this is the end of the archive.
    #[error("null record")]
    NullRecord,

    #[error("file not found: '{0}'")]
    NotFound(String),

    #[error("overflow")]
    Overflow,

    /// The caller broke the cursor's call protocol.
    #[error("api misuse: {0}")]
    ApiMisuse(&'static str),

    #[error("name too long ({len} bytes, limit {limit})")]
    NameTooLong { len: usize, limit: usize },
}

/// The closed set of result kinds, including success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Success,
    Failure,
    OpenFailed,
    ReadFailed,
    WriteFailed,
    SeekFailed,
    SeekOutOfRange,
    BadChecksum,
    NullRecord,
    NotFound,
    Overflow,
    ApiMisuse,
    NameTooLong,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Success => "success",
            ErrorKind::Failure => "failure",
            ErrorKind::OpenFailed => "could not open",
            ErrorKind::ReadFailed => "could not read",
            ErrorKind::WriteFailed => "could not write",
            ErrorKind::SeekFailed => "could not seek",
            ErrorKind::SeekOutOfRange => "seek out of range",
            ErrorKind::BadChecksum => "bad checksum",
            ErrorKind::NullRecord => "null record",
            ErrorKind::NotFound => "file not found",
            ErrorKind::Overflow => "overflow",
            ErrorKind::ApiMisuse => "api misuse",
            ErrorKind::NameTooLong => "name too long",
        }
    }

    /// Kind of a finished operation; `Ok` maps to [`ErrorKind::Success`].
    pub fn of<T>(result: &Result<T>) -> ErrorKind {
        match result {
            Ok(_) => ErrorKind::Success,
            Err(e) => e.kind(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Failure(_) => ErrorKind::Failure,
            Error::OpenFailed { .. } => ErrorKind::OpenFailed,
            Error::ReadFailed(_) => ErrorKind::ReadFailed,
            Error::WriteFailed(_) => ErrorKind::WriteFailed,
            Error::SeekFailed(_) => ErrorKind::SeekFailed,
            Error::SeekOutOfRange { .. } => ErrorKind::SeekOutOfRange,
            Error::BadChecksum { .. } => ErrorKind::BadChecksum,
            Error::NullRecord => ErrorKind::NullRecord,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Overflow => ErrorKind::Overflow,
            Error::ApiMisuse(_) => ErrorKind::ApiMisuse,
            Error::NameTooLong { .. } => ErrorKind::NameTooLong,
        }
    }

    #[inline(always)]
    pub fn is_null_record(&self) -> bool {
        matches!(self, Error::NullRecord)
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        use std::io::ErrorKind as Io;

        let kind = match &e {
            Error::Failure(source)
            | Error::OpenFailed { source, .. }
            | Error::ReadFailed(source)
            | Error::WriteFailed(source)
            | Error::SeekFailed(source) => source.kind(),
            Error::NotFound(_) => Io::NotFound,
            Error::ApiMisuse(_) | Error::NameTooLong { .. } | Error::SeekOutOfRange { .. } => {
                Io::InvalidInput
            }
            Error::NullRecord => Io::UnexpectedEof,
            Error::BadChecksum { .. } | Error::Overflow => Io::InvalidData,
        };
        std::io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(ErrorKind::Success.as_str(), "success");
        assert_eq!(ErrorKind::NullRecord.as_str(), "null record");
        assert_eq!(ErrorKind::NotFound.as_str(), "file not found");
        assert_eq!(Error::Overflow.to_string(), "overflow");
    }

    #[test]
    fn kind_of_result() {
        let ok: Result<()> = Ok(());
        assert_eq!(ErrorKind::of(&ok), ErrorKind::Success);

        let err: Result<()> = Err(Error::BadChecksum {
            stored: 1,
            computed: 2,
        });
        assert_eq!(ErrorKind::of(&err), ErrorKind::BadChecksum);
    }

    #[test]
    fn into_io_error() {
        let io: std::io::Error = Error::NotFound("a".into()).into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);

        let io: std::io::Error = Error::Overflow.into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);

        let io: std::io::Error =
            Error::ReadFailed(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)).into();
        assert_eq!(io.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
