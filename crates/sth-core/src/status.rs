//! Remote status codes and the status sets used by the execution engine.
//!
//! Every call through the engine admits one *expected* set and one
//! *retriable* set. The two may overlap; a status in neither is terminal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Status code reported by the cluster for a single request.
///
/// Server statuses live in the 400000 range, transport statuses raised by
/// the client side in the 401000 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Success,
    BadRequest,
    Unauthorized,
    InternalError,
    Aborted,
    Unavailable,
    Overloaded,
    SchemeError,
    GenericError,
    Timeout,
    BadSession,
    PreconditionFailed,
    AlreadyExists,
    NotFound,
    SessionExpired,
    Cancelled,
    Undetermined,
    Unsupported,
    SessionBusy,
    ConnectionLost,
    ConnectionFailure,
    DeadlineExceeded,
    ClientInternalError,
    Unimplemented,
}

impl StatusCode {
    /// Numeric wire code.
    pub fn code(&self) -> u32 {
        match self {
            StatusCode::Success => 400000,
            StatusCode::BadRequest => 400010,
            StatusCode::Unauthorized => 400020,
            StatusCode::InternalError => 400030,
            StatusCode::Aborted => 400040,
            StatusCode::Unavailable => 400050,
            StatusCode::Overloaded => 400060,
            StatusCode::SchemeError => 400070,
            StatusCode::GenericError => 400080,
            StatusCode::Timeout => 400090,
            StatusCode::BadSession => 400100,
            StatusCode::PreconditionFailed => 400120,
            StatusCode::AlreadyExists => 400130,
            StatusCode::NotFound => 400140,
            StatusCode::SessionExpired => 400150,
            StatusCode::Cancelled => 400160,
            StatusCode::Undetermined => 400170,
            StatusCode::Unsupported => 400180,
            StatusCode::SessionBusy => 400190,
            StatusCode::ConnectionLost => 401010,
            StatusCode::ConnectionFailure => 401020,
            StatusCode::DeadlineExceeded => 401030,
            StatusCode::ClientInternalError => 401040,
            StatusCode::Unimplemented => 401050,
        }
    }

    /// Upper-case name as printed in failure messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Success => "SUCCESS",
            StatusCode::BadRequest => "BAD_REQUEST",
            StatusCode::Unauthorized => "UNAUTHORIZED",
            StatusCode::InternalError => "INTERNAL_ERROR",
            StatusCode::Aborted => "ABORTED",
            StatusCode::Unavailable => "UNAVAILABLE",
            StatusCode::Overloaded => "OVERLOADED",
            StatusCode::SchemeError => "SCHEME_ERROR",
            StatusCode::GenericError => "GENERIC_ERROR",
            StatusCode::Timeout => "TIMEOUT",
            StatusCode::BadSession => "BAD_SESSION",
            StatusCode::PreconditionFailed => "PRECONDITION_FAILED",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::SessionExpired => "SESSION_EXPIRED",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::Undetermined => "UNDETERMINED",
            StatusCode::Unsupported => "UNSUPPORTED",
            StatusCode::SessionBusy => "SESSION_BUSY",
            StatusCode::ConnectionLost => "CONNECTION_LOST",
            StatusCode::ConnectionFailure => "CONNECTION_FAILURE",
            StatusCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            StatusCode::ClientInternalError => "CLIENT_INTERNAL_ERROR",
            StatusCode::Unimplemented => "UNIMPLEMENTED",
        }
    }

    /// Statuses a driver may retry on its own without side-effect risk.
    pub fn is_transport_retriable(&self) -> bool {
        matches!(
            self,
            StatusCode::Overloaded
                | StatusCode::Unavailable
                | StatusCode::BadSession
                | StatusCode::SessionBusy
                | StatusCode::Aborted
                | StatusCode::ConnectionLost
                | StatusCode::ConnectionFailure
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The retriable set used when a caller does not supply one.
pub const DEFAULT_RETRIABLE_STATUSES: [StatusCode; 4] = [
    StatusCode::Overloaded,
    StatusCode::BadSession,
    StatusCode::ConnectionLost,
    StatusCode::Unavailable,
];

/// An unordered set of statuses.
///
/// Constructible from a single status, an array or a vector, so call
/// sites can write `StatusCode::Success.into()` or
/// `[StatusCode::Success, StatusCode::SchemeError].into()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct StatusSet(BTreeSet<StatusCode>);

impl StatusSet {
    /// Empty set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// `{SUCCESS}`.
    pub fn success() -> Self {
        StatusCode::Success.into()
    }

    /// The module-wide default retriable set.
    pub fn default_retriable() -> Self {
        DEFAULT_RETRIABLE_STATUSES.into()
    }

    pub fn contains(&self, status: StatusCode) -> bool {
        self.0.contains(&status)
    }

    /// Add a status.
    pub fn with(mut self, status: StatusCode) -> Self {
        self.0.insert(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the set is exactly `{SUCCESS}`.
    pub fn is_success_only(&self) -> bool {
        self.0.len() == 1 && self.contains(StatusCode::Success)
    }

    pub fn iter(&self) -> impl Iterator<Item = StatusCode> + '_ {
        self.0.iter().copied()
    }
}

impl From<StatusCode> for StatusSet {
    fn from(status: StatusCode) -> Self {
        Self(BTreeSet::from([status]))
    }
}

impl<const N: usize> From<[StatusCode; N]> for StatusSet {
    fn from(statuses: [StatusCode; N]) -> Self {
        Self(statuses.into_iter().collect())
    }
}

impl From<Vec<StatusCode>> for StatusSet {
    fn from(statuses: Vec<StatusCode>) -> Self {
        Self(statuses.into_iter().collect())
    }
}

impl FromIterator<StatusCode> for StatusSet {
    fn from_iter<I: IntoIterator<Item = StatusCode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, status) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", status)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_set_from_single() {
        let set: StatusSet = StatusCode::Success.into();
        assert!(set.contains(StatusCode::Success));
        assert!(!set.contains(StatusCode::SchemeError));
        assert!(set.is_success_only());
    }

    #[test]
    fn test_status_set_from_array() {
        let set: StatusSet = [StatusCode::Success, StatusCode::SchemeError].into();
        assert_eq!(set.len(), 2);
        assert!(!set.is_success_only());
        assert_eq!(set.to_string(), "{SUCCESS, SCHEME_ERROR}");
    }

    #[test]
    fn test_default_retriable() {
        let set = StatusSet::default_retriable();
        assert_eq!(set.len(), 4);
        assert!(set.contains(StatusCode::Overloaded));
        assert!(set.contains(StatusCode::BadSession));
        assert!(set.contains(StatusCode::ConnectionLost));
        assert!(set.contains(StatusCode::Unavailable));
        assert!(!set.contains(StatusCode::Timeout));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StatusCode::Success.code(), 400000);
        assert_eq!(StatusCode::SchemeError.code(), 400070);
        assert_eq!(StatusCode::ConnectionLost.code(), 401010);
        assert_eq!(StatusCode::BadSession.to_string(), "BAD_SESSION");
    }

    #[test]
    fn test_status_set_deserialize() {
        #[derive(Deserialize)]
        struct Holder {
            statuses: StatusSet,
        }

        let holder: Holder = toml::from_str(r#"statuses = ["overloaded", "scheme_error"]"#).unwrap();
        assert!(holder.statuses.contains(StatusCode::Overloaded));
        assert!(holder.statuses.contains(StatusCode::SchemeError));
    }
}
