//! netvault store - the versioned archive
//!
//! Provides:
//! - `VersionedStore`: every mutation of the working directory runs under one
//!   lock, either as a single call or inside a `StoreSession`
//! - `VcsBackend`: the seam between the store and a version-control engine
//! - `GitCli`: backend driving the `git` binary
//! - `MemoryBackend`: in-memory backend with failure injection for tests
//! - Atomic working-tree writes

pub mod backend;
pub mod errors;
pub mod store;
pub mod worktree;

// Re-export key types
pub use backend::git_cli::{CommitAuthor, GitCli};
pub use backend::memory::{MemoryBackend, MemoryHandle, MemoryRevision};
pub use backend::{CommitOutcome, SyncOutcome, VcsBackend};
pub use errors::Result;
pub use store::{StoreSession, VersionedStore};
