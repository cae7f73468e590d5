//! Version-control backends
//!
//! A backend owns one working directory and performs the primitive
//! operations the store composes. Backends are not required to be safe for
//! concurrent use: `VersionedStore` holds them behind a single lock and every
//! method takes `&mut self`.

pub mod git_cli;
pub mod memory;

use crate::errors::Result;
use async_trait::async_trait;
use std::path::Path;

/// Result of a commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new revision was recorded
    Committed { revision: String },
    /// The staged tree equals the last revision; nothing was recorded
    NothingToCommit,
}

impl CommitOutcome {
    /// Whether the commit was a no-op
    pub fn is_noop(&self) -> bool {
        matches!(self, CommitOutcome::NothingToCommit)
    }

    /// Revision id of a recorded commit
    pub fn revision(&self) -> Option<&str> {
        match self {
            CommitOutcome::Committed { revision } => Some(revision),
            CommitOutcome::NothingToCommit => None,
        }
    }
}

/// Result of a pull or push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Revisions moved between local and remote
    Transferred,
    /// Both sides already agreed
    UpToDate,
}

/// Primitive operations against one working directory
#[async_trait]
pub trait VcsBackend: Send + Sync {
    /// Working directory this backend operates on
    fn workdir(&self) -> &Path;

    /// Branch pulled and pushed
    fn branch(&self) -> &str;

    /// Whether the working directory is already under version control
    async fn is_repository(&self) -> Result<bool>;

    /// Turn the (existing) working directory into a repository on `branch`
    async fn init(&mut self) -> Result<()>;

    /// Populate the working directory from `remote`
    ///
    /// On an existing repository this attaches or verifies `origin` and
    /// fetches; on a missing or empty directory it clones.
    async fn clone_remote(&mut self, remote: &str) -> Result<()>;

    /// Link the local branch to `origin/<branch>`
    async fn set_upstream(&mut self) -> Result<()>;

    async fn pull(&mut self) -> Result<SyncOutcome>;

    async fn push(&mut self) -> Result<SyncOutcome>;

    /// Stage the current content of `relative`
    async fn add(&mut self, relative: &Path) -> Result<()>;

    /// Stage the removal of `relative`; a path that was never tracked is not an error
    async fn remove(&mut self, relative: &Path) -> Result<()>;

    /// Reset the index entries of `paths` to the last revision
    ///
    /// Paths the last revision does not track are dropped from the index;
    /// the working tree is left alone.
    async fn unstage(&mut self, paths: &[&Path]) -> Result<()>;

    /// Record everything staged as one revision
    async fn commit(&mut self, message: &str) -> Result<CommitOutcome>;
}
