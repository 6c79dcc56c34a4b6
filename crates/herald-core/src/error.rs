//! Error types.
//!
//! - [`MediatorError`]: everything a dispatch call (`send*` / `publish`) can return
//! - [`RegistryError`]: handler registration
//! - [`BuildError`]: `MediatorBuilder::build` の起動時検証
//! - [`SetupError`]: config loading and logger initialisation

use thiserror::Error;

/// Boxed error raised by user handlers and behaviors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the mediator to its callers.
///
/// Handler and behavior failures travel through the chain untouched: the
/// mediator itself only ever produces `InvalidArgument`, `HandlerNotFound`,
/// `MisconfiguredBehavior` and (for concurrent fan-out) `Aggregate`.
#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("handler not found for request type={0}")]
    HandlerNotFound(&'static str),

    /// Error raised by a handler or a pipeline behavior.
    #[error(transparent)]
    Handler(BoxError),

    #[error("operation cancelled")]
    Cancelled,

    /// More than one notification handler failed under concurrent fan-out.
    /// Errors are kept in handler order.
    #[error("{}", summarize(.0))]
    Aggregate(Vec<MediatorError>),

    #[error("misconfigured behavior: {0}")]
    MisconfiguredBehavior(String),
}

impl MediatorError {
    /// Wrap an arbitrary error raised inside a handler or behavior.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The first observed failure. For anything other than `Aggregate` this is `self`.
    pub fn first_failure(&self) -> &MediatorError {
        match self {
            Self::Aggregate(errors) => errors.first().map_or(self, |e| e.first_failure()),
            _ => self,
        }
    }
}

fn summarize(errors: &[MediatorError]) -> String {
    match errors.first() {
        Some(first) => format!("{} notification handlers failed; first: {first}", errors.len()),
        None => "notification handlers failed".to_string(),
    }
}

/// Registration errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate handler for request type={0}")]
    DuplicateHandler(&'static str),
}

/// Fail-fast validation errors raised by `MediatorBuilder::build`.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Missing request types: {0:?}. These requests were expected but no handler was registered.")]
    MissingRequestTypes(Vec<String>),

    #[error("misconfigured behavior: {0}")]
    MisconfiguredBehavior(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors from config loading and logging setup.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(String),

    #[error("logger error: {0}")]
    Logger(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[derive(Debug, Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn handler_error_is_transparent() {
        let err = MediatorError::handler(DiskFull);
        assert_eq!(err.to_string(), "disk full");
        let _: &dyn Error = &err;
    }

    #[test]
    fn handler_error_can_be_recovered_by_downcast() {
        let err = MediatorError::handler(DiskFull);
        let MediatorError::Handler(inner) = err else {
            panic!("expected handler error");
        };
        assert!(inner.downcast_ref::<DiskFull>().is_some());
    }

    #[test]
    fn aggregate_reports_first_failure() {
        let err = MediatorError::Aggregate(vec![
            MediatorError::handler("first"),
            MediatorError::Cancelled,
        ]);
        assert!(err.to_string().starts_with("2 notification handlers failed"));
        assert_eq!(err.first_failure().to_string(), "first");
    }

    #[test]
    fn cancelled_is_distinct() {
        assert!(MediatorError::Cancelled.is_cancelled());
        assert!(!MediatorError::handler("boom").is_cancelled());
    }

    #[test]
    fn missing_request_types_lists_names() {
        let err = BuildError::MissingRequestTypes(vec!["app::Ping".to_string()]);
        assert!(err.to_string().contains("app::Ping"));
    }
}
