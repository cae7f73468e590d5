//! In-memory backend
//!
//! Keeps the index, history and remote bookkeeping in memory while reading
//! file content from the real working directory, so the store and the sweep
//! behave exactly as they do over git. A `MemoryHandle` shares the state for
//! inspection and failure injection.

use crate::backend::{CommitOutcome, SyncOutcome, VcsBackend};
use crate::errors::{commit_error, io_error, transport_error, Result};
use async_trait::async_trait;
use netvault_core::errors::{ExError, ExErrorKind};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

type Tree = BTreeMap<PathBuf, Vec<u8>>;

/// One recorded revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRevision {
    pub id: String,
    pub message: String,
    /// Paths whose content differs from the previous revision (added, changed or removed)
    pub changed: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct MemoryState {
    initialized: bool,
    remote: Option<String>,
    upstream: bool,
    index: Tree,
    head: Tree,
    revisions: Vec<MemoryRevision>,
    pushed: usize,
    push_attempts: usize,
    fail_push: bool,
    fail_add: HashSet<PathBuf>,
}

/// In-memory `VcsBackend`
pub struct MemoryBackend {
    workdir: PathBuf,
    branch: String,
    state: Arc<Mutex<MemoryState>>,
}

/// Shared view of a `MemoryBackend`'s state
#[derive(Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Uninitialized backend for `workdir`
    pub fn new(workdir: impl Into<PathBuf>) -> (Self, MemoryHandle) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        let backend = Self {
            workdir: workdir.into(),
            branch: "main".to_string(),
            state: state.clone(),
        };
        (backend, MemoryHandle { state })
    }

    /// Backend that already has `origin` configured with an upstream
    pub fn with_remote(workdir: impl Into<PathBuf>, remote: &str) -> (Self, MemoryHandle) {
        let (backend, handle) = Self::new(workdir);
        {
            let mut state = handle.lock();
            state.remote = Some(remote.to_string());
            state.upstream = true;
        }
        (backend, handle)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MemoryHandle {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All recorded revisions, oldest first
    pub fn revisions(&self) -> Vec<MemoryRevision> {
        self.lock().revisions.clone()
    }

    pub fn revision_count(&self) -> usize {
        self.lock().revisions.len()
    }

    /// Committed content of `relative` at the latest revision
    pub fn committed(&self, relative: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().head.get(relative.as_ref()).cloned()
    }

    /// Paths tracked at the latest revision
    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        self.lock().head.keys().cloned().collect()
    }

    /// Number of revisions the remote has received
    pub fn pushed_count(&self) -> usize {
        self.lock().pushed
    }

    /// Number of push calls, successful or not
    pub fn push_attempts(&self) -> usize {
        self.lock().push_attempts
    }

    /// Make every push fail with a transport error until reset
    pub fn set_push_failure(&self, fail: bool) {
        self.lock().fail_push = fail;
    }

    /// Make staging `relative` fail with a commit error
    pub fn fail_add(&self, relative: impl Into<PathBuf>) {
        self.lock().fail_add.insert(relative.into());
    }

    /// Undo a `fail_add` for `relative`
    pub fn allow_add(&self, relative: impl AsRef<Path>) {
        self.lock().fail_add.remove(relative.as_ref());
    }
}

fn diff_paths(previous: &Tree, next: &Tree) -> Vec<PathBuf> {
    let mut changed: Vec<PathBuf> = next
        .iter()
        .filter(|(path, content)| previous.get(*path) != Some(*content))
        .map(|(path, _)| path.clone())
        .collect();
    changed.extend(
        previous
            .keys()
            .filter(|path| !next.contains_key(*path))
            .cloned(),
    );
    changed.sort();
    changed
}

#[async_trait]
impl VcsBackend for MemoryBackend {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn branch(&self) -> &str {
        &self.branch
    }

    async fn is_repository(&self) -> Result<bool> {
        Ok(self.lock().initialized)
    }

    async fn init(&mut self) -> Result<()> {
        self.lock().initialized = true;
        Ok(())
    }

    async fn clone_remote(&mut self, remote: &str) -> Result<()> {
        let initialized = self.lock().initialized;
        if !initialized {
            match std::fs::read_dir(&self.workdir) {
                Ok(mut entries) => {
                    if entries.next().is_some() {
                        return Err(ExError::new(ExErrorKind::Clone)
                            .with_op("clone")
                            .with_message("directory is not empty and is not a repository"));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error("clone", &self.workdir, e)),
            }
            std::fs::create_dir_all(&self.workdir)
                .map_err(|e| io_error("clone", &self.workdir, e))?;
        }

        let mut state = self.lock();
        match &state.remote {
            Some(existing) if existing != remote => {
                return Err(ExError::new(ExErrorKind::Clone)
                    .with_op("clone")
                    .with_message("existing repository has a different origin"));
            }
            _ => {}
        }
        state.remote = Some(remote.to_string());
        state.initialized = true;
        Ok(())
    }

    async fn set_upstream(&mut self) -> Result<()> {
        let mut state = self.lock();
        if state.remote.is_none() {
            return Err(ExError::new(ExErrorKind::Upstream)
                .with_op("set_upstream")
                .with_message(format!("origin/{} does not exist", self.branch)));
        }
        state.upstream = true;
        Ok(())
    }

    async fn pull(&mut self) -> Result<SyncOutcome> {
        if self.lock().remote.is_none() {
            return Err(transport_error("pull", "no origin configured"));
        }
        Ok(SyncOutcome::UpToDate)
    }

    async fn push(&mut self) -> Result<SyncOutcome> {
        let mut state = self.lock();
        state.push_attempts += 1;
        if state.fail_push {
            return Err(transport_error("push", "injected transport failure"));
        }
        if state.remote.is_none() {
            return Err(transport_error("push", "no origin configured"));
        }
        if state.pushed == state.revisions.len() {
            return Ok(SyncOutcome::UpToDate);
        }
        state.pushed = state.revisions.len();
        Ok(SyncOutcome::Transferred)
    }

    async fn add(&mut self, relative: &Path) -> Result<()> {
        if self.lock().fail_add.contains(relative) {
            return Err(commit_error("add", "injected staging failure")
                .with_path(relative.display().to_string()));
        }

        let absolute = self.workdir.join(relative);
        let content = match tokio::fs::read(&absolute).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(commit_error("add", "pathspec did not match any files")
                    .with_path(relative.display().to_string()));
            }
            Err(e) => return Err(io_error("add", &absolute, e)),
        };

        self.lock().index.insert(relative.to_path_buf(), content);
        Ok(())
    }

    async fn remove(&mut self, relative: &Path) -> Result<()> {
        self.lock().index.remove(relative);
        Ok(())
    }

    async fn unstage(&mut self, paths: &[&Path]) -> Result<()> {
        let mut state = self.lock();
        for path in paths {
            match state.head.get(*path).cloned() {
                Some(content) => {
                    state.index.insert(path.to_path_buf(), content);
                }
                None => {
                    state.index.remove(*path);
                }
            }
        }
        Ok(())
    }

    async fn commit(&mut self, message: &str) -> Result<CommitOutcome> {
        let mut state = self.lock();
        if !state.initialized {
            return Err(commit_error("commit", "not a repository"));
        }
        if state.index == state.head {
            return Ok(CommitOutcome::NothingToCommit);
        }

        let changed = diff_paths(&state.head, &state.index);
        state.head = state.index.clone();
        let id = format!("{:08x}", state.revisions.len() + 1);
        state.revisions.push(MemoryRevision {
            id: id.clone(),
            message: message.to_string(),
            changed,
        });
        Ok(CommitOutcome::Committed { revision: id })
    }
}
