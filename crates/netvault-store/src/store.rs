//! The versioned archive
//!
//! `VersionedStore` owns one working directory and its backend. The backend
//! sits behind a single async mutex: every operation, whether called
//! directly on the store or through a `StoreSession`, runs with exactly one
//! mutation in flight. Multi-step sequences that must not interleave with
//! other writers (a sweep's move + stage + commit) hold one session for the
//! whole sequence.

use crate::backend::git_cli::{CommitAuthor, GitCli};
use crate::backend::{CommitOutcome, SyncOutcome, VcsBackend};
use crate::errors::{io_error, Result};
use crate::worktree::{atomic_write, validate_relative};
use netvault_core::{log_op_end, log_op_error, log_op_start, ArchiveConfig};
use netvault_core_types::schema::{
    OP_CLONE, OP_COMMIT, OP_INITIALIZE, OP_PULL, OP_PUSH, OP_RESTORE, OP_SET_UPSTREAM,
    OP_WRITE_AND_COMMIT,
};
use netvault_core_types::Sensitive;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};

/// Serialized access to one version-controlled working directory
pub struct VersionedStore {
    workdir: PathBuf,
    backend: Mutex<Box<dyn VcsBackend>>,
}

/// Exclusive access to the store for a sequence of operations
///
/// Holding a session blocks every other caller of the store.
pub struct StoreSession<'a> {
    workdir: &'a Path,
    backend: MutexGuard<'a, Box<dyn VcsBackend>>,
}

impl VersionedStore {
    pub fn new(backend: impl VcsBackend + 'static) -> Self {
        Self {
            workdir: backend.workdir().to_path_buf(),
            backend: Mutex::new(Box::new(backend)),
        }
    }

    /// Store backed by the `git` binary, as configured
    pub fn git(config: &ArchiveConfig) -> Self {
        let author = CommitAuthor {
            name: config.author_name.clone(),
            email: config.author_email.clone(),
        };
        Self::new(GitCli::new(&config.archive_root, &config.branch).with_author(author))
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Wait for exclusive access
    pub async fn session(&self) -> StoreSession<'_> {
        StoreSession {
            workdir: &self.workdir,
            backend: self.backend.lock().await,
        }
    }

    /// Ensure the working directory exists and is a repository
    ///
    /// # Errors
    ///
    /// `ERR_IO` when the directory cannot be created or initialized.
    pub async fn initialize(&self) -> Result<()> {
        self.session().await.initialize().await
    }

    /// Populate the working directory from `remote`
    ///
    /// # Errors
    ///
    /// `ERR_CLONE` for an incompatible directory or unreachable remote.
    pub async fn clone_remote(&self, remote: &Sensitive<String>) -> Result<()> {
        self.session().await.clone_remote(remote).await
    }

    /// Link the local branch to `origin/<branch>`
    ///
    /// # Errors
    ///
    /// `ERR_UPSTREAM` when the remote branch does not exist.
    pub async fn set_upstream(&self) -> Result<()> {
        self.session().await.set_upstream().await
    }

    /// # Errors
    ///
    /// `ERR_TRANSPORT` when the remote cannot be reached or merged.
    pub async fn pull(&self) -> Result<SyncOutcome> {
        self.session().await.pull().await
    }

    /// # Errors
    ///
    /// `ERR_TRANSPORT` when the remote rejects or cannot be reached.
    pub async fn push(&self) -> Result<SyncOutcome> {
        self.session().await.push().await
    }

    /// Write `content` to `relative`, stage it and commit it as one revision
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` for paths outside the tree, `ERR_IO` when the
    /// write fails, `ERR_COMMIT` when staging or committing fails.
    pub async fn write_and_commit(
        &self,
        relative: &Path,
        content: &[u8],
        message: &str,
    ) -> Result<CommitOutcome> {
        self.session()
            .await
            .write_and_commit(relative, content, message)
            .await
    }

    /// # Errors
    ///
    /// `ERR_COMMIT` when the path cannot be staged.
    pub async fn stage_add(&self, relative: &Path) -> Result<()> {
        self.session().await.stage_add(relative).await
    }

    /// # Errors
    ///
    /// `ERR_COMMIT` when the removal cannot be staged.
    pub async fn stage_removal(&self, relative: &Path) -> Result<()> {
        self.session().await.stage_removal(relative).await
    }

    /// # Errors
    ///
    /// `ERR_COMMIT` when the commit fails.
    pub async fn commit(&self, message: &str) -> Result<CommitOutcome> {
        self.session().await.commit(message).await
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Log the end (or failure) of a store operation and pass the result through
fn finish<T>(op: &'static str, started: Instant, result: Result<T>) -> Result<T> {
    let duration_ms = elapsed_ms(started);
    match &result {
        Ok(_) => log_op_end!(op, duration_ms = duration_ms),
        Err(err) => log_op_error!(op, err, duration_ms = duration_ms),
    }
    result
}

impl StoreSession<'_> {
    pub fn workdir(&self) -> &Path {
        self.workdir
    }

    /// # Errors
    ///
    /// See [`VersionedStore::initialize`].
    pub async fn initialize(&mut self) -> Result<()> {
        let started = Instant::now();
        log_op_start!(OP_INITIALIZE, path = %self.workdir.display());

        let result = async {
            tokio::fs::create_dir_all(self.workdir)
                .await
                .map_err(|e| io_error(OP_INITIALIZE, self.workdir, e))?;
            if self.backend.is_repository().await? {
                tracing::debug!(path = %self.workdir.display(), "Archive already initialized");
                return Ok(());
            }
            self.backend.init().await?;
            tracing::info!(
                path = %self.workdir.display(),
                branch = self.backend.branch(),
                "Initialized archive repository"
            );
            Ok(())
        }
        .await;

        finish(OP_INITIALIZE, started, result)
    }

    /// # Errors
    ///
    /// See [`VersionedStore::clone_remote`].
    pub async fn clone_remote(&mut self, remote: &Sensitive<String>) -> Result<()> {
        let started = Instant::now();
        log_op_start!(OP_CLONE, path = %self.workdir.display());
        let result = self.backend.clone_remote(remote.expose()).await;
        finish(OP_CLONE, started, result)
    }

    /// # Errors
    ///
    /// See [`VersionedStore::set_upstream`].
    pub async fn set_upstream(&mut self) -> Result<()> {
        let started = Instant::now();
        log_op_start!(OP_SET_UPSTREAM, branch = self.backend.branch());
        let result = self.backend.set_upstream().await;
        finish(OP_SET_UPSTREAM, started, result)
    }

    /// # Errors
    ///
    /// See [`VersionedStore::pull`].
    pub async fn pull(&mut self) -> Result<SyncOutcome> {
        let started = Instant::now();
        log_op_start!(OP_PULL, branch = self.backend.branch());
        let result = self.backend.pull().await;
        finish(OP_PULL, started, result)
    }

    /// # Errors
    ///
    /// See [`VersionedStore::push`].
    pub async fn push(&mut self) -> Result<SyncOutcome> {
        let started = Instant::now();
        log_op_start!(OP_PUSH, branch = self.backend.branch());
        let result = self.backend.push().await;
        finish(OP_PUSH, started, result)
    }

    /// # Errors
    ///
    /// See [`VersionedStore::write_and_commit`].
    pub async fn write_and_commit(
        &mut self,
        relative: &Path,
        content: &[u8],
        message: &str,
    ) -> Result<CommitOutcome> {
        let started = Instant::now();
        log_op_start!(OP_WRITE_AND_COMMIT, path = %relative.display());

        let result = async {
            validate_relative(relative)?;
            atomic_write(&self.workdir.join(relative), content).await?;
            self.backend.add(relative).await?;
            self.backend.commit(message).await
        }
        .await;

        match &result {
            Ok(outcome) => log_op_end!(
                OP_WRITE_AND_COMMIT,
                duration_ms = elapsed_ms(started),
                path = %relative.display(),
                revision = outcome.revision().unwrap_or("none"),
                noop = outcome.is_noop(),
            ),
            Err(err) => log_op_error!(
                OP_WRITE_AND_COMMIT,
                err,
                duration_ms = elapsed_ms(started),
                path = %relative.display(),
            ),
        }
        result
    }

    /// Move a file inside the tree, creating the destination's parents
    ///
    /// Nothing is staged; callers record the move with `stage_add`,
    /// `stage_removal` and `commit`.
    ///
    /// # Errors
    ///
    /// `ERR_INVALID_INPUT` for paths outside the tree, `ERR_IO` when the
    /// rename fails (including a source that no longer exists).
    pub async fn relocate(&mut self, from: &Path, to: &Path) -> Result<()> {
        validate_relative(from)?;
        validate_relative(to)?;

        let source = self.workdir.join(from);
        let destination = self.workdir.join(to);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("relocate", parent, e))?;
        }
        tokio::fs::rename(&source, &destination)
            .await
            .map_err(|e| io_error("relocate", from, e))?;

        tracing::debug!(from = %from.display(), to = %to.display(), "Relocated entry");
        Ok(())
    }

    /// Undo a `relocate` whose move was never committed
    ///
    /// Resets the index entries of both paths to the last revision, then
    /// moves `to` back to `from`.
    ///
    /// # Errors
    ///
    /// `ERR_COMMIT` when the index cannot be reset, `ERR_IO` when the file
    /// cannot be moved back.
    pub async fn restore_relocation(&mut self, from: &Path, to: &Path) -> Result<()> {
        let started = Instant::now();
        log_op_start!(OP_RESTORE, path = %from.display());

        let result = async {
            validate_relative(from)?;
            validate_relative(to)?;
            self.backend.unstage(&[from, to]).await?;
            tokio::fs::rename(self.workdir.join(to), self.workdir.join(from))
                .await
                .map_err(|e| io_error(OP_RESTORE, to, e))
        }
        .await;

        finish(OP_RESTORE, started, result)
    }

    /// # Errors
    ///
    /// See [`VersionedStore::stage_add`].
    pub async fn stage_add(&mut self, relative: &Path) -> Result<()> {
        validate_relative(relative)?;
        self.backend.add(relative).await
    }

    /// # Errors
    ///
    /// See [`VersionedStore::stage_removal`].
    pub async fn stage_removal(&mut self, relative: &Path) -> Result<()> {
        validate_relative(relative)?;
        self.backend.remove(relative).await
    }

    /// # Errors
    ///
    /// See [`VersionedStore::commit`].
    pub async fn commit(&mut self, message: &str) -> Result<CommitOutcome> {
        let started = Instant::now();
        log_op_start!(OP_COMMIT);
        let result = self.backend.commit(message).await;
        finish(OP_COMMIT, started, result)
    }
}
