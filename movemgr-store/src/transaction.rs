//! Scoped store transactions.
//!
//! Every mutating sync session brackets its writes in a [`StoreTransaction`]
//! obtained from [`LocalStore::transaction`](crate::LocalStore::transaction).
//! Commit keeps the work; dropping the guard discards whatever was not
//! committed, so a failure on any path (validation, transport, panic) leaves
//! the store at its last committed state instead of a dirty working tree.
//!
//! Cleaning removes untracked files but not ignored ones — bundle content
//! under `sets/` survives a rollback of metadata, matching `git clean -f`
//! without `-x`.

use std::fs;
use std::path::Path;

use git2::{ObjectType, Repository, ResetType, Status, StatusOptions};

use crate::error::{io_err, StoreError};
use crate::store::LocalStore;

/// Guard over one update session. See the module docs.
pub struct StoreTransaction<'a> {
    store: &'a LocalStore,
}

impl<'a> StoreTransaction<'a> {
    pub(crate) fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// Stage everything and commit with `message`.
    ///
    /// A clean tree is a logged no-op, not an error: "nothing changed" must
    /// never abort a sync session. May be called more than once to record
    /// intermediate steps (e.g. a new device before its first download);
    /// only writes after the last commit are discarded on drop.
    pub fn commit(&mut self, message: &str) -> Result<(), StoreError> {
        let repo = self.store.repo();
        if is_clean(repo)? {
            log::debug!("nothing to commit for {message:?}");
            return Ok(());
        }

        let mut index = repo.index()?;
        index.add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let sig = repo.signature()?;
        let parent = repo.head()?.peel_to_commit()?;
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;
        log::info!("committed store update: {message}");
        Ok(())
    }
}

impl Drop for StoreTransaction<'_> {
    fn drop(&mut self) {
        match rollback_if_dirty(self.store.repo(), self.store.root()) {
            Ok(false) => {}
            Ok(true) => log::warn!("discarded uncommitted store changes"),
            Err(err) => log::error!("failed to roll back store transaction: {err}"),
        }
    }
}

fn rollback_if_dirty(repo: &Repository, root: &Path) -> Result<bool, StoreError> {
    if is_clean(repo)? {
        return Ok(false);
    }
    reset_and_clean(repo, root)?;
    Ok(true)
}

/// Whether the working tree matches HEAD (untracked files count as dirty,
/// ignored files do not).
fn is_clean(repo: &Repository) -> Result<bool, StoreError> {
    let statuses = repo.statuses(Some(&mut status_options()))?;
    Ok(statuses.is_empty())
}

fn status_options() -> StatusOptions {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    opts
}

/// Hard-reset tracked files to HEAD and remove untracked files, the
/// equivalent of `git reset --hard && git clean -fd` (ignored files kept).
/// Idempotent: running it on a clean tree changes nothing.
pub(crate) fn reset_and_clean(repo: &Repository, root: &Path) -> Result<(), StoreError> {
    let head = repo.head()?.peel(ObjectType::Commit)?;
    repo.reset(&head, ResetType::Hard, None)?;

    let statuses = repo.statuses(Some(&mut status_options()))?;
    for entry in statuses.iter() {
        if !entry.status().contains(Status::WT_NEW) {
            continue;
        }
        let Some(rel) = entry.path() else { continue };
        let path = root.join(rel);
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(&path, err)),
        }
    }
    Ok(())
}
