use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A required field of a request was absent.
    MissingField(&'static str),
    /// A field was present but its value can not be used.
    InvalidField(&'static str),
    /// Document record or artifact does not exist for this user.
    NotFound(String),
    /// The stored bytes could not be parsed as a PDF.
    CorruptDocument(lopdf::Error),
    PageOutOfRange {
        index: i64,
        page_count: usize,
    },
    StorageFailure(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    LoPdfError(lopdf::Error),
    Other(String),
}

/// Coarse classification of an [`Error`], used by transport adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingField,
    InvalidField,
    NotFound,
    CorruptDocument,
    PageOutOfRange,
    StorageFailure,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::MissingField | ErrorKind::InvalidField => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::CorruptDocument
            | ErrorKind::PageOutOfRange
            | ErrorKind::StorageFailure
            | ErrorKind::Internal => 500,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingField(_) => ErrorKind::MissingField,
            Error::InvalidField(_) => ErrorKind::InvalidField,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::CorruptDocument(_) => ErrorKind::CorruptDocument,
            Error::PageOutOfRange { .. } => ErrorKind::PageOutOfRange,
            Error::StorageFailure(_) | Error::Io(_) | Error::Json(_) => ErrorKind::StorageFailure,
            Error::LoPdfError(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingField(field) => write!(f, "Missing required field `{}`", field),
            Error::InvalidField(field) => write!(f, "Field `{}` must be a finite number", field),
            Error::NotFound(what) => write!(f, "{}", what),
            Error::CorruptDocument(err) => write!(f, "Not a valid PDF document: {}", err),
            Error::PageOutOfRange { index, page_count } => write!(
                f,
                "Page {} is out of range, document has {} page(s)",
                index, page_count
            ),
            Error::StorageFailure(msg) => write!(f, "Storage failure: {}", msg),
            Error::Io(err) => write!(f, "Storage failure: {}", err),
            Error::Json(err) => write!(f, "Storage failure: {}", err),
            Error::LoPdfError(err) => write!(f, "PDF error: {}", err),
            Error::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Self::LoPdfError(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Self::Other(err.to_owned())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_failure_kind() {
        assert_eq!(Error::MissingField("filename").kind().status_code(), 400);
        assert_eq!(Error::InvalidField("xPercent").kind().status_code(), 400);
        assert_eq!(Error::NotFound("Document not found".into()).kind().status_code(), 404);
        let page = Error::PageOutOfRange {
            index: 3,
            page_count: 1,
        };
        assert_eq!(page.kind(), ErrorKind::PageOutOfRange);
        assert_eq!(page.kind().status_code(), 500);
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(io.kind(), ErrorKind::StorageFailure);
    }

    #[test]
    fn display_includes_cause() {
        let err = Error::PageOutOfRange {
            index: -1,
            page_count: 2,
        };
        assert_eq!(
            err.to_string(),
            "Page -1 is out of range, document has 2 page(s)"
        );
        assert_eq!(
            Error::MissingField("xPercent").to_string(),
            "Missing required field `xPercent`"
        );
    }
}
