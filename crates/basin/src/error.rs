// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Error types for the basin maintenance layer.

use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of errors.
///
/// Per-file delete failures during a clean run are deliberately NOT errors:
/// they are absorbed into the partition stats and surfaced as data. The kinds
/// below cover the fatal paths only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A failure with no recovery action beyond surfacing it to the
    /// caller, for example an underlying filesystem error.
    Unexpected,

    /// Input data is invalid: malformed properties, mismatched partition
    /// paths during a stat merge, an unknown version code.
    DataInvalid,

    /// The operation's precondition does not hold, for example attempting
    /// to register a non-adjacent version transition.
    PreconditionFailed,

    /// The parallel execution substrate itself is unusable. Propagated to
    /// the caller unmodified, never retried.
    ExecutionFault,

    /// No handler is registered for the requested `(from, to)` version
    /// pair. Carries both version codes and the direction as context.
    UnsupportedVersionTransition,

    /// An I/O failure while applying a version transition. Carries the
    /// target version as context. The persisted version is unchanged.
    MigrationFailed,
}

impl ErrorKind {
    /// Error kind as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::DataInvalid => "DataInvalid",
            ErrorKind::PreconditionFailed => "PreconditionFailed",
            ErrorKind::ExecutionFault => "ExecutionFault",
            ErrorKind::UnsupportedVersionTransition => "UnsupportedVersionTransition",
            ErrorKind::MigrationFailed => "MigrationFailed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by maintenance operations.
///
/// Built from a kind and a message, then enriched with key/value context and
/// an optional source error:
///
/// ```
/// use basin::{Error, ErrorKind};
///
/// let err = Error::new(ErrorKind::MigrationFailed, "commit of table metadata failed")
///     .with_context("target-version", "2");
/// assert_eq!(err.kind(), ErrorKind::MigrationFailed);
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    /// Attach a key/value context pair to the error.
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying source error.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source should be set only once");
        self.source = Some(source.into());
        self
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Context value for the given key, if present.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.kind, self.message)?;
        if !self.context.is_empty() {
            write!(f, ", context: {{ ")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}: {value}")?;
            }
            write!(f, " }}")?;
        }
        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Error");
        dbg.field("kind", &self.kind).field("message", &self.message);
        if !self.context.is_empty() {
            dbg.field("context", &self.context);
        }
        if let Some(source) = &self.source {
            dbg.field("source", source);
        }
        dbg.finish()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|v| v.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::new(ErrorKind::Unexpected, "encountered an i/o error").with_source(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::new(ErrorKind::DataInvalid, "failed to serialize or deserialize json")
            .with_source(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_context_and_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::new(ErrorKind::MigrationFailed, "commit of table metadata failed")
            .with_context("target-version", "2")
            .with_source(io_err);

        let rendered = err.to_string();
        assert!(rendered.starts_with("MigrationFailed => commit of table metadata failed"));
        assert!(rendered.contains("target-version: 2"));
        assert!(rendered.contains("denied"));
    }

    #[test]
    fn test_context_value_lookup() {
        let err = Error::new(ErrorKind::UnsupportedVersionTransition, "no handler")
            .with_context("from-version", "0")
            .with_context("to-version", "2");

        assert_eq!(err.context_value("from-version"), Some("0"));
        assert_eq!(err.context_value("to-version"), Some("2"));
        assert_eq!(err.context_value("direction"), None);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(std::error::Error::source(&err).is_some());
    }
}
