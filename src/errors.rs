//! The engine's error taxonomy: one enum, converted to a status code at
//! the single point where `handle()` turns a `Result` into a `Response`.

use std::fmt;
use std::io;

use http::StatusCode;

/// Errors surfaced by the resource backend.
#[derive(Debug)]
pub enum FsError {
    NotFound,
    Exists,
    Forbidden,
    NotImplemented,
    GeneralFailure,
    Io(io::Error),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "not found"),
            FsError::Exists => write!(f, "already exists"),
            FsError::Forbidden => write!(f, "forbidden"),
            FsError::NotImplemented => write!(f, "not implemented"),
            FsError::GeneralFailure => write!(f, "general failure"),
            FsError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for FsError {}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => FsError::NotFound,
            io::ErrorKind::AlreadyExists => FsError::Exists,
            io::ErrorKind::PermissionDenied => FsError::Forbidden,
            _ => FsError::Io(e),
        }
    }
}

/// Top-level engine error. Every handler returns `DavResult<Response<Body>>`;
/// `DavHandler::handle` is the only place this is turned into an actual
/// HTTP error response.
#[derive(Debug)]
pub enum DavError {
    /// Malformed header, illegal header combination, invalid XML, or
    /// unexpected body shape. Carries a short diagnostic for logging.
    BadRequest(&'static str),
    /// ACL denied the operation.
    Forbidden,
    /// A plain status code with no further detail (used for the
    /// conditional-code state machine: 404, 405, 409, 412, 415, ...).
    Status(StatusCode),
    /// Cross-origin COPY/MOVE destination.
    BadGateway,
    /// LOCK/UNLOCK/PROPPATCH: stubbed surface.
    NotImplemented,
    /// Backend I/O failure.
    Fs(FsError),
}

pub type DavResult<T> = Result<T, DavError>;

impl DavError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DavError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DavError::Forbidden => StatusCode::FORBIDDEN,
            DavError::Status(s) => *s,
            DavError::BadGateway => StatusCode::BAD_GATEWAY,
            DavError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            DavError::Fs(e) => match e {
                FsError::NotFound => StatusCode::NOT_FOUND,
                FsError::Exists => StatusCode::METHOD_NOT_ALLOWED,
                FsError::Forbidden => StatusCode::FORBIDDEN,
                FsError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
                FsError::GeneralFailure | FsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DavError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            DavError::Forbidden => write!(f, "forbidden"),
            DavError::Status(s) => write!(f, "{s}"),
            DavError::BadGateway => write!(f, "bad gateway"),
            DavError::NotImplemented => write!(f, "not implemented"),
            DavError::Fs(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DavError {}

impl From<io::Error> for DavError {
    fn from(e: io::Error) -> Self {
        DavError::Fs(e.into())
    }
}

impl From<FsError> for DavError {
    fn from(e: FsError) -> Self {
        DavError::Fs(e)
    }
}

impl From<StatusCode> for DavError {
    fn from(s: StatusCode) -> Self {
        DavError::Status(s)
    }
}
