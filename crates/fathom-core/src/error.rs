//! Error types for Fathom.
//!
//! Every failure surfaced while building, compiling or executing a search
//! query is a variant of [`Error`]. Variants carry the offending field path
//! and index names so callers can report them without parsing messages.

/// Errors that can occur while building, compiling or executing a query.
///
/// All error variants are marked with `#[non_exhaustive]` to allow
/// adding new error types without breaking changes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The field path is not declared by any index in the scope.
    #[error("Unknown field '{path}' in indexes {}", format_indexes(.indexes))]
    UnknownField {
        /// Absolute field path
        path: String,
        /// Indexes that were searched
        indexes: Vec<String>,
    },

    /// The index name is not registered.
    #[error("Unknown index '{name}'")]
    UnknownIndex {
        /// Index name that was requested
        name: String,
    },

    /// The field exists but predicates are disabled for it.
    #[error(
        "Field '{path}' is not searchable in indexes {}; make sure the field is marked as searchable",
        format_indexes(.indexes)
    )]
    NotSearchable {
        /// Absolute field path
        path: String,
        /// Indexes where the field is not searchable
        indexes: Vec<String>,
    },

    /// The field exists but sorts are disabled for it.
    #[error(
        "Field '{path}' is not sortable in indexes {}; make sure the field is marked as sortable",
        format_indexes(.indexes)
    )]
    NotSortable {
        /// Absolute field path
        path: String,
        /// Indexes where the field is not sortable
        indexes: Vec<String>,
    },

    /// The field exists but projections are disabled for it.
    #[error(
        "Field '{path}' is not projectable in indexes {}; make sure the field is marked as projectable",
        format_indexes(.indexes)
    )]
    NotProjectable {
        /// Absolute field path
        path: String,
        /// Indexes where the field is not projectable
        indexes: Vec<String>,
    },

    /// The predicate, sort or projection kind cannot be applied to this field.
    #[error("{kind} are not supported by field '{path}' of type {field_type}")]
    UnsupportedPredicateForFieldType {
        /// Absolute field path
        path: String,
        /// Human-readable kind, e.g. "Text predicates"
        kind: String,
        /// Declared type of the field
        field_type: String,
    },

    /// Indexes in scope declare the field with different types or codecs.
    #[error(
        "Multiple conflicting types for field '{path}' in indexes {}",
        format_indexes(.indexes)
    )]
    FieldTypeConflict {
        /// Absolute field path
        path: String,
        /// Indexes whose declarations disagree
        indexes: Vec<String>,
    },

    /// Indexes in scope declare the field with different search analyzers.
    #[error(
        "Multiple conflicting analyzers for field '{path}' in indexes {}; \
         use an explicit analyzer override or skip analysis",
        format_indexes(.indexes)
    )]
    AnalyzerConflict {
        /// Absolute field path
        path: String,
        /// Indexes whose declarations disagree
        indexes: Vec<String>,
    },

    /// Indexes in scope declare the field with different normalizers.
    #[error(
        "Multiple conflicting normalizers for field '{path}' in indexes {}",
        format_indexes(.indexes)
    )]
    NormalizerConflict {
        /// Absolute field path
        path: String,
        /// Indexes whose declarations disagree
        indexes: Vec<String>,
    },

    /// Skip-analysis was requested on a field without an analysis step.
    #[error("Cannot skip analysis on field '{path}': the field is a keyword field with no analyzer")]
    SkipAnalysisOnKeywordField {
        /// Absolute field path
        path: String,
    },

    /// The value passed to a predicate is missing or of the wrong type.
    #[error("Invalid value for field '{path}': {reason}")]
    InvalidMatchingValue {
        /// Absolute field path
        path: String,
        /// What is wrong with the value
        reason: String,
    },

    /// An explicit analyzer override names an analyzer that does not exist.
    #[error("Unknown analyzer '{name}'")]
    UnresolvableAnalyzerName {
        /// Analyzer name that was requested
        name: String,
    },

    /// A predicate, sort or projection was built for a narrower scope.
    #[error(
        "{kind} built for indexes {} cannot be used in a query targeting indexes {}",
        format_indexes(.declared),
        format_indexes(.requested)
    )]
    IndexScopeMismatch {
        /// "Predicate", "Sort" or "Projection"
        kind: String,
        /// Indexes the element was built for
        declared: Vec<String>,
        /// Indexes the query targets
        requested: Vec<String>,
    },

    /// An option value is out of range or otherwise invalid.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What is wrong with the argument
        message: String,
    },

    /// The entity loader violated its contract.
    #[error("Loading error: {message}")]
    Loading {
        /// What went wrong
        message: String,
    },

    /// The search engine failed to execute the query.
    #[error("Backend error ({backend}): {message}")]
    Backend {
        /// Backend name
        backend: String,
        /// Human-readable error message
        message: String,
        /// Source error if available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Dispatch was cancelled before the backend produced a result.
    #[error("Query aborted: {message}")]
    Aborted {
        /// Why the query was aborted
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience `Result` type alias for Fathom operations.
pub type Result<T> = std::result::Result<T, Error>;

fn format_indexes(indexes: &[String]) -> String {
    format!("[{}]", indexes.join(", "))
}

impl Error {
    /// Returns whether this error stems from the query definition itself,
    /// as opposed to a failure of the engine or its collaborators.
    pub fn is_query_error(&self) -> bool {
        !matches!(
            self,
            Error::Backend { .. }
                | Error::Aborted { .. }
                | Error::Loading { .. }
                | Error::Io(_)
                | Error::Config { .. }
        )
    }

    /// Creates a new unknown-field error.
    pub fn unknown_field<S: Into<String>>(path: S, indexes: &[String]) -> Self {
        Error::UnknownField {
            path: path.into(),
            indexes: indexes.to_vec(),
        }
    }

    /// Creates a new unsupported-kind error.
    pub fn unsupported<P, K, T>(path: P, kind: K, field_type: T) -> Self
    where
        P: Into<String>,
        K: Into<String>,
        T: std::fmt::Display,
    {
        Error::UnsupportedPredicateForFieldType {
            path: path.into(),
            kind: kind.into(),
            field_type: field_type.to_string(),
        }
    }

    /// Creates a new invalid-value error.
    pub fn invalid_value<P, R>(path: P, reason: R) -> Self
    where
        P: Into<String>,
        R: Into<String>,
    {
        Error::InvalidMatchingValue {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new invalid-argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a new loading error.
    pub fn loading<S: Into<String>>(message: S) -> Self {
        Error::Loading {
            message: message.into(),
        }
    }

    /// Creates a new backend error with a message.
    pub fn backend<B, M>(backend: B, message: M) -> Self
    where
        B: Into<String>,
        M: Into<String>,
    {
        Error::Backend {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new backend error with a message and source error.
    pub fn backend_with_source<B, M, E>(backend: B, message: M, source: E) -> Self
    where
        B: Into<String>,
        M: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Backend {
            backend: backend.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new aborted error.
    pub fn aborted<S: Into<String>>(message: S) -> Self {
        Error::Aborted {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
