//! Capability set of an object-store client and its native error codes.

use std::fmt;
use thiserror::Error;

/// Native operation of an object-store client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectOperation {
    /// Fetch an object.
    Get,
    /// Create or replace an object.
    Put,
    /// Delete an object.
    Delete,
    /// Check an object's existence.
    Head,
}

impl ObjectOperation {
    /// Wire name of the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GET" => Some(Self::Get),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error codes an object-store client can report.
///
/// `Unknown` carries any code this crate was not built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectStoreErrorCode {
    /// The object does not exist.
    NoSuchKey,
    /// The bucket does not exist.
    NoSuchBucket,
    /// The credentials lack permission.
    AccessDenied,
    /// The access key is not recognised.
    InvalidAccessKeyId,
    /// The request signature is wrong.
    SignatureDoesNotMatch,
    /// The connection failed.
    NetworkConnection,
    /// The request timed out.
    RequestTimeout,
    /// The service is throttling requests.
    SlowDown,
    /// The service is temporarily unavailable.
    ServiceUnavailable,
    /// The service failed internally.
    InternalError,
    /// The request was malformed.
    InvalidRequest,
    /// A code outside the known set.
    Unknown(u16),
}

impl ObjectStoreErrorCode {
    /// Every known code, excluding `Unknown`.
    pub const KNOWN: [Self; 11] = [
        Self::NoSuchKey,
        Self::NoSuchBucket,
        Self::AccessDenied,
        Self::InvalidAccessKeyId,
        Self::SignatureDoesNotMatch,
        Self::NetworkConnection,
        Self::RequestTimeout,
        Self::SlowDown,
        Self::ServiceUnavailable,
        Self::InternalError,
        Self::InvalidRequest,
    ];

    /// Numeric code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::NoSuchKey => 1,
            Self::NoSuchBucket => 2,
            Self::AccessDenied => 3,
            Self::InvalidAccessKeyId => 4,
            Self::SignatureDoesNotMatch => 5,
            Self::NetworkConnection => 6,
            Self::RequestTimeout => 7,
            Self::SlowDown => 8,
            Self::ServiceUnavailable => 9,
            Self::InternalError => 10,
            Self::InvalidRequest => 11,
            Self::Unknown(code) => code,
        }
    }

    /// Looks up a numeric code, yielding `Unknown` for unassigned values.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|c| c.code() == code)
            .unwrap_or(Self::Unknown(code))
    }

    /// Upper-case wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NoSuchKey => "NO_SUCH_KEY",
            Self::NoSuchBucket => "NO_SUCH_BUCKET",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::InvalidAccessKeyId => "INVALID_ACCESS_KEY_ID",
            Self::SignatureDoesNotMatch => "SIGNATURE_DOES_NOT_MATCH",
            Self::NetworkConnection => "NETWORK_CONNECTION",
            Self::RequestTimeout => "REQUEST_TIMEOUT",
            Self::SlowDown => "SLOW_DOWN",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for ObjectStoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "UNKNOWN({code})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Failure reported by an object-store client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ObjectStoreClientError {
    /// Native error code.
    pub code: ObjectStoreErrorCode,
    /// Human-readable message from the service.
    pub message: String,
    /// Whether the client considers the failure transient.
    pub retryable: bool,
}

impl ObjectStoreClientError {
    /// Creates a client error.
    pub fn new(code: ObjectStoreErrorCode, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            retryable,
        }
    }
}

/// Result type of client calls.
pub type ClientResult<T> = Result<T, ObjectStoreClientError>;

/// The calls [`super::ObjectStoreStorage`] makes against a remote store.
///
/// Objects are addressed by bucket and object name. `put_object` creates or
/// replaces. `get_object`, `delete_object` and `head_object` report an absent
/// object as [`ObjectStoreErrorCode::NoSuchKey`].
pub trait ObjectStoreClient: Send + Sync {
    /// Creates or replaces an object.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn put_object(&self, bucket: &str, name: &str, body: Vec<u8>) -> ClientResult<()>;

    /// Fetches an object's body.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn get_object(&self, bucket: &str, name: &str) -> ClientResult<Vec<u8>>;

    /// Deletes an object.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn delete_object(&self, bucket: &str, name: &str) -> ClientResult<()>;

    /// Checks that an object exists.
    ///
    /// # Errors
    ///
    /// Returns the native failure.
    fn head_object(&self, bucket: &str, name: &str) -> ClientResult<()>;
}
