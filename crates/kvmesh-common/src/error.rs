//! Error types for kvmesh
//!
//! Every storage, composition layer and the resolver report failures through
//! this one enum so that `NotFound` stays distinguishable from all other
//! errors no matter how deeply stores are nested.

use thiserror::Error;

/// Common result type for kvmesh operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for kvmesh
#[derive(Debug, Error)]
pub enum Error {
    /// Key absent. Every backend must report absence with exactly this variant.
    #[error("key not found")]
    NotFound,

    /// Several independent failures from a fan-out operation
    #[error("{}", join_messages(.0))]
    Aggregated(Vec<Error>),

    // Construction errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported storage scheme: {0}")]
    UnsupportedScheme(String),

    #[error("cycle detected while resolving '{0}'")]
    CycleDetected(String),

    // State errors
    #[error("data corruption detected: {0}")]
    Corrupted(String),

    // Backend errors
    #[error("backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

fn join_messages(list: &[Error]) -> String {
    list.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a corruption error
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Wrap the error with a description of what was being done
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Join collected errors into one.
    ///
    /// Returns `None` for an empty list and the error itself for a single
    /// entry, so a lone `NotFound` keeps its identity.
    #[must_use]
    pub fn aggregate(mut list: Vec<Self>) -> Option<Self> {
        match list.len() {
            0 => None,
            1 => list.pop(),
            _ => Some(Self::Aggregated(list)),
        }
    }

    /// Like [`Error::aggregate`], as a `Result`
    pub fn aggregate_result(list: Vec<Self>) -> Result<()> {
        Self::aggregate(list).map_or(Ok(()), Err)
    }

    /// Check if this is a not found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound => true,
            Self::Context { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error was raised while building a store graph
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::UnsupportedScheme(_) | Self::CycleDetected(_) => true,
            Self::Context { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// Number of underlying failures carried by this error
    #[must_use]
    pub fn failure_count(&self) -> usize {
        match self {
            Self::Aggregated(list) => list.len(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_not_found() {
        assert!(Error::NotFound.is_not_found());
        assert!(Error::NotFound.context("load shard").is_not_found());
        assert!(!Error::backend("down").is_not_found());
        assert!(!Error::Aggregated(vec![Error::NotFound, Error::NotFound]).is_not_found());
    }

    #[test]
    fn test_aggregate_keeps_single_error() {
        assert!(Error::aggregate(Vec::new()).is_none());

        let single = Error::aggregate(vec![Error::NotFound]).unwrap();
        assert!(single.is_not_found());

        let many = Error::aggregate(vec![Error::backend("a"), Error::backend("b")]).unwrap();
        assert_eq!(many.failure_count(), 2);
        assert_eq!(many.to_string(), "backend error: a; backend error: b");
    }

    #[test]
    fn test_aggregate_result() {
        assert!(Error::aggregate_result(Vec::new()).is_ok());
        assert!(Error::aggregate_result(vec![Error::backend("x")]).is_err());
    }

    #[test]
    fn test_configuration_kinds() {
        assert!(Error::configuration("bad").is_configuration());
        assert!(Error::CycleDetected("a".into()).is_configuration());
        assert!(Error::UnsupportedScheme("ftp".into()).context("shard 'a'").is_configuration());
        assert!(!Error::corrupted("oldest").is_configuration());
    }
}
