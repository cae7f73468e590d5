use netvault_core_types::RequestId;
use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by the archive maps onto one of these kinds. Each
/// kind has a stable code used in log fields (`err.code`) and in tests.
///
/// "Nothing to commit" and "everything up-to-date" are deliberately absent:
/// they are outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,

    // Remote
    /// clone/fetch/pull/push against the remote failed
    Transport,
    /// The working directory cannot be populated from the remote
    Clone,
    /// The local branch cannot be linked to `origin/<branch>`
    Upstream,

    // Local history
    /// add/rm/commit failed for a reason other than "nothing to commit"
    Commit,

    // Entries
    /// An entry's first line is not an RFC3339 timestamp
    Parse,

    // Ingestion
    /// Submission to an ingestion queue that has been closed
    QueueClosed,

    // Environment
    Io,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Transport => "ERR_TRANSPORT",
            ExErrorKind::Clone => "ERR_CLONE",
            ExErrorKind::Upstream => "ERR_UPSTREAM",
            ExErrorKind::Commit => "ERR_COMMIT",
            ExErrorKind::Parse => "ERR_PARSE",
            ExErrorKind::QueueClosed => "ERR_QUEUE_CLOSED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether the failure came from talking to the remote
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Transport | ExErrorKind::Clone | ExErrorKind::Upstream
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling plus the
/// context needed to find the failing entry in the logs.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    identity: Option<String>,
    path: Option<String>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            identity: None,
            path: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add device identity context
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Add archive path context (relative to the archive root when possible)
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the device identity context, if any
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Get the archive path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(identity) = &self.identity {
            write!(f, " (identity: {})", identity)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain failures raised by the archive model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArchiveError {
    /// The identity cannot be used as an archive file name
    #[error("Invalid device identity '{identity}': {reason}")]
    InvalidIdentity { identity: String, reason: String },

    /// The entry has no first line to read a timestamp from
    #[error("Entry has no timestamp header: {path}")]
    MissingHeader { path: String },

    /// The entry's first line is not an RFC3339 timestamp
    #[error("Invalid timestamp header '{line}': {reason}")]
    InvalidTimestamp { line: String, reason: String },

    /// The ingestion queue no longer accepts snapshots
    #[error("Ingestion queue is closed; snapshot for {identity} rejected")]
    QueueClosed { identity: String },

    /// A configuration value is out of range or missing
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<ArchiveError> for ExError {
    fn from(err: ArchiveError) -> Self {
        let message = err.to_string();
        match err {
            ArchiveError::InvalidIdentity { identity, .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("validate_identity")
                    .with_identity(identity)
                    .with_message(message)
            }
            ArchiveError::MissingHeader { path } => ExError::new(ExErrorKind::Parse)
                .with_op("read_entry_header")
                .with_path(path)
                .with_message(message),
            ArchiveError::InvalidTimestamp { .. } => ExError::new(ExErrorKind::Parse)
                .with_op("read_entry_header")
                .with_message(message),
            ArchiveError::QueueClosed { identity } => ExError::new(ExErrorKind::QueueClosed)
                .with_op("submit")
                .with_identity(identity)
                .with_message(message),
            ArchiveError::InvalidConfig { .. } => ExError::new(ExErrorKind::Config)
                .with_op("load_config")
                .with_message(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::Transport, "ERR_TRANSPORT"),
            (ExErrorKind::Clone, "ERR_CLONE"),
            (ExErrorKind::Upstream, "ERR_UPSTREAM"),
            (ExErrorKind::Commit, "ERR_COMMIT"),
            (ExErrorKind::Parse, "ERR_PARSE"),
            (ExErrorKind::QueueClosed, "ERR_QUEUE_CLOSED"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_transport_family() {
        assert!(ExErrorKind::Transport.is_transport());
        assert!(ExErrorKind::Clone.is_transport());
        assert!(ExErrorKind::Upstream.is_transport());
        assert!(!ExErrorKind::Commit.is_transport());
        assert!(!ExErrorKind::Io.is_transport());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExError::new(ExErrorKind::Commit)
            .with_op("commit")
            .with_identity("co01.test01")
            .with_path("Core/co01.test01")
            .with_message("index.lock exists");

        let rendered = err.to_string();
        assert!(rendered.starts_with("[ERR_COMMIT] in operation 'commit'"));
        assert!(rendered.contains("index.lock exists"));
        assert!(rendered.contains("(identity: co01.test01)"));
        assert!(rendered.contains("(path: Core/co01.test01)"));
    }

    #[test]
    fn test_source_chain() {
        let root = ExError::new(ExErrorKind::Io).with_message("disk full");
        let err = ExError::new(ExErrorKind::Commit).with_source(root);

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("disk full"));
        assert_eq!(err.source_error().unwrap().kind(), ExErrorKind::Io);
    }
}
