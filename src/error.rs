//! Error types for dnssd-topology.

use std::time::Duration;

use thiserror::Error;

use crate::query::RecordKind;

/// Errors returned by a single DNS query.
///
/// "No records" is not represented here: a query that completes without
/// matching data returns an empty answer list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Timeout, unreachable server, SERVFAIL or a malformed response.
    #[error("transport failure querying {kind} {name}: {reason}")]
    Transport {
        /// Queried name.
        name: String,
        /// Queried record kind.
        kind: RecordKind,
        /// Resolver-provided description.
        reason: String,
    },

    /// The name could not be turned into a DNS name.
    #[error("invalid query name {name:?}: {reason}")]
    InvalidName {
        /// Offending name.
        name: String,
        /// Parser-provided description.
        reason: String,
    },
}

/// Presentation-format label decoding failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LabelError {
    /// Escape sequence or byte run that cannot be decoded.
    #[error("malformed label {label:?} at byte {position}: {reason}")]
    Malformed {
        /// The raw label as received.
        label: String,
        /// Byte offset of the offending escape.
        position: usize,
        /// What went wrong.
        reason: &'static str,
    },
}

/// Errors that abort a whole topology traversal.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The router enumeration query failed; no meaningful tree exists.
    #[error("router enumeration failed: {0}")]
    Query(#[from] QueryError),

    /// Traversal did not finish in time; no partial tree is returned.
    #[error("traversal timed out after {0:?}")]
    TimedOut(Duration),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Resolver construction error.
    #[error("resolver setup failed: {0}")]
    Resolver(#[from] hickory_resolver::ResolveError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
