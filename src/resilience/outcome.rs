//! Call outcomes and failure classification shared by the retry and circuit
//! breaker wrappers.

use std::io;

use serde::Serialize;

// == Call Result ==
/// Uniform result record produced by a retried call.
///
/// A record with `success == false` is a logical failure reported by the
/// callee. It is returned as-is and never retried; only `Err` values from the
/// wrapped closure trigger retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> CallResult<T> {
    /// Successful call carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed call with a message and no data.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Converts the record into a `Result`, using the error message (or an
    /// empty string) for failures.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_default())
        }
    }
}

// == Failure Kind ==
/// Coarse classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// The provider rejected the call for exceeding its quota
    RateLimited,
    /// The connection was refused
    ConnectionRefused,
    /// The connection was reset or aborted mid-call
    ConnectionReset,
    /// The call did not complete in time
    Timeout,
    /// The provider returned a server-side error
    Server,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Kinds raised by the transport rather than by the provider.
    pub const TRANSPORT: [FailureKind; 3] = [
        FailureKind::ConnectionRefused,
        FailureKind::ConnectionReset,
        FailureKind::Timeout,
    ];

    pub fn is_transport(self) -> bool {
        Self::TRANSPORT.contains(&self)
    }
}

/// Errors that can report which `FailureKind` they belong to.
pub trait ClassifyFailure {
    fn failure_kind(&self) -> FailureKind;
}

impl ClassifyFailure for io::Error {
    fn failure_kind(&self) -> FailureKind {
        match self.kind() {
            io::ErrorKind::ConnectionRefused => FailureKind::ConnectionRefused,
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                FailureKind::ConnectionReset
            }
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FailureKind::Timeout,
            _ => FailureKind::Other,
        }
    }
}

// == Failure Filter ==
/// Set of failure kinds a wrapper reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureFilter {
    /// Every failure matches
    Any,
    /// Only the listed kinds match
    Kinds(Vec<FailureKind>),
}

impl FailureFilter {
    /// Transport-level failures: refused, reset, timed out.
    pub fn transport() -> Self {
        FailureFilter::Kinds(FailureKind::TRANSPORT.to_vec())
    }

    pub fn matches(&self, kind: FailureKind) -> bool {
        match self {
            FailureFilter::Any => true,
            FailureFilter::Kinds(kinds) => kinds.contains(&kind),
        }
    }

    pub fn matches_error<E: ClassifyFailure>(&self, err: &E) -> bool {
        self.matches(err.failure_kind())
    }
}

impl Default for FailureFilter {
    fn default() -> Self {
        FailureFilter::Any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_result_constructors() {
        let ok = CallResult::ok("reply");
        assert!(ok.is_success());
        assert_eq!(ok.data, Some("reply"));
        assert_eq!(ok.error, None);

        let failed: CallResult<()> = CallResult::failed("quota exceeded");
        assert!(!failed.is_success());
        assert_eq!(failed.error.as_deref(), Some("quota exceeded"));
    }

    #[test]
    fn test_call_result_into_result() {
        assert_eq!(CallResult::ok(3).into_result(), Ok(Some(3)));
        assert_eq!(
            CallResult::<i32>::failed("boom").into_result(),
            Err("boom".to_string())
        );
    }

    #[test]
    fn test_call_result_serializes() {
        let json = serde_json::to_value(CallResult::ok("hi")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "hi");
        assert!(json["error"].is_null());
    }

    #[test]
    fn test_io_error_classification() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let timeout = io::Error::new(io::ErrorKind::TimedOut, "slow");
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");

        assert_eq!(refused.failure_kind(), FailureKind::ConnectionRefused);
        assert_eq!(timeout.failure_kind(), FailureKind::Timeout);
        assert_eq!(reset.failure_kind(), FailureKind::ConnectionReset);
        assert_eq!(denied.failure_kind(), FailureKind::Other);
    }

    #[test]
    fn test_failure_filter() {
        let transport = FailureFilter::transport();
        assert!(transport.matches(FailureKind::Timeout));
        assert!(transport.matches(FailureKind::ConnectionRefused));
        assert!(!transport.matches(FailureKind::RateLimited));
        assert!(!transport.matches(FailureKind::Other));

        assert!(FailureFilter::Any.matches(FailureKind::Other));
        assert_eq!(FailureFilter::default(), FailureFilter::Any);
    }

    #[test]
    fn test_is_transport() {
        assert!(FailureKind::Timeout.is_transport());
        assert!(!FailureKind::Server.is_transport());
    }
}
