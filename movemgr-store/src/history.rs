//! Revision queries over a set's primary content file.
//!
//! The store commits once per sync session, so the history of
//! `sets/<id>/_set/Song.abl` is the set's change log. Queries walk commits
//! newest-first and follow the file across renames, the same view
//! `git log --follow -- <path>` gives.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::{Commit, Delta, DiffFindOptions, ObjectType, Oid, Repository, Sort, Tree};
use std::path::Path;

use movemgr_core::device::{SET_FOLDER_PLACEHOLDER, SET_SONG_FILE};
use movemgr_core::{RevisionAuthor, RevisionRecord};

use crate::error::StoreError;
use crate::store::{LocalStore, SETS_DIR};

/// Repo-relative path of a set's primary content file.
fn song_file_path(set_id: &str) -> String {
    format!("{SETS_DIR}/{set_id}/{SET_FOLDER_PLACEHOLDER}/{SET_SONG_FILE}")
}

impl LocalStore {
    /// Content of the set's primary file at `revision`, via a
    /// `<revision>:<path>` object reference.
    pub fn set_version_at_revision(
        &self,
        set_id: &str,
        revision: &str,
    ) -> Result<String, StoreError> {
        let spec = format!("{revision}:{}", song_file_path(set_id));
        let object = self.repo().revparse_single(&spec)?;
        let blob = object
            .peel_to_blob()
            .map_err(|_| StoreError::NotAFile { spec })?;
        Ok(String::from_utf8_lossy(blob.content()).into_owned())
    }

    /// Full commit history touching the set's primary file, newest first.
    ///
    /// History retrieval failure is not fatal for callers rendering a
    /// change log; it is logged and reduces to an empty list.
    pub fn set_file_revisions(&self, set_id: &str) -> Vec<RevisionRecord> {
        match revisions(self.repo(), &song_file_path(set_id)) {
            Ok(records) => records,
            Err(err) => {
                log::error!("error getting revisions for set {set_id}: {err}");
                Vec::new()
            }
        }
    }
}

fn revisions(repo: &Repository, start_path: &str) -> Result<Vec<RevisionRecord>, StoreError> {
    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(Sort::TIME)?;

    let mut tracked_path = start_path.to_string();
    let mut records = Vec::new();

    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        let tree = commit.tree()?;
        let current = blob_id_at(&tree, &tracked_path);
        let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
        let previous = parent_tree
            .as_ref()
            .and_then(|t| blob_id_at(t, &tracked_path));

        match (current, previous) {
            (Some(cur), Some(prev)) => {
                if cur != prev {
                    records.push(to_record(repo, &commit)?);
                }
            }
            (Some(_), None) => {
                // The file first appears here — either created, or renamed
                // from another path we should keep following.
                records.push(to_record(repo, &commit)?);
                if let Some(parent_tree) = &parent_tree {
                    if let Some(old_path) =
                        rename_source(repo, parent_tree, &tree, &tracked_path)?
                    {
                        tracked_path = old_path;
                    }
                }
            }
            (None, _) => {}
        }
    }
    Ok(records)
}

fn blob_id_at(tree: &Tree<'_>, path: &str) -> Option<Oid> {
    let entry = tree.get_path(Path::new(path)).ok()?;
    (entry.kind() == Some(ObjectType::Blob)).then(|| entry.id())
}

/// If the diff from `parent` to `commit` renamed something onto `path`,
/// return the old path.
fn rename_source(
    repo: &Repository,
    parent: &Tree<'_>,
    commit: &Tree<'_>,
    path: &str,
) -> Result<Option<String>, StoreError> {
    let mut diff = repo.diff_tree_to_tree(Some(parent), Some(commit), None)?;
    let mut opts = DiffFindOptions::new();
    opts.renames(true);
    diff.find_similar(Some(&mut opts))?;

    for delta in diff.deltas() {
        if delta.status() == Delta::Renamed && delta.new_file().path() == Some(Path::new(path)) {
            return Ok(delta
                .old_file()
                .path()
                .map(|p| p.to_string_lossy().into_owned()));
        }
    }
    Ok(None)
}

fn to_record(repo: &Repository, commit: &Commit<'_>) -> Result<RevisionRecord, StoreError> {
    let short = commit.as_object().short_id()?;
    let author = commit.author();
    let when = author.when();

    Ok(RevisionRecord {
        commit: commit.id().to_string(),
        abbreviated_commit: short.as_str().unwrap_or_default().to_string(),
        author: RevisionAuthor {
            name: author.name().unwrap_or_default().to_string(),
            email: author.email().unwrap_or_default().to_string(),
        },
        date: format_author_date(when.seconds(), when.offset_minutes()),
        timestamp: when.seconds().to_string(),
        message: commit.summary().unwrap_or_default().to_string(),
        full_message: commit.body().unwrap_or_default().trim().to_string(),
    })
}

/// `2024-05-01 10:00:00 +0200`, the author-date format git itself prints.
fn format_author_date(seconds: i64, offset_minutes: i32) -> String {
    let offset: FixedOffset =
        FixedOffset::east_opt(offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    DateTime::from_timestamp(seconds, 0)
        .map(|utc| {
            utc.with_timezone(&offset)
                .format("%Y-%m-%d %H:%M:%S %z")
                .to_string()
        })
        .unwrap_or_default()
}
