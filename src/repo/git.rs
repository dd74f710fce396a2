//! repo::git
//!
//! Git checkouts via `git2`, plus `git lfs` for large-file transfer.
//!
//! History and diffs are read in-process through `git2`. LFS has no
//! libgit2 implementation, so [`GitRepo::push_lfs`] shells out to
//! `git lfs`. Endpoints are handed to that subprocess through
//! `GIT_CONFIG_COUNT`/`GIT_CONFIG_KEY_n`/`GIT_CONFIG_VALUE_n` environment
//! variables (git 2.31+), which keeps credentials out of the process
//! argument list.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};

use super::changeset::{hunks_only, sort_diffs, ChangeKind, Changeset, Diff};
use super::{join_args, RepoError, Repository, VcsKind};
use crate::auth::SecretUrl;
use crate::core::types::{BranchName, ChangesetId};

/// An open Git checkout.
pub struct GitRepo {
    repo: git2::Repository,
    path: PathBuf,
    branch: BranchName,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("path", &self.path)
            .field("branch", &self.branch)
            .finish()
    }
}

impl GitRepo {
    /// Open the checkout rooted at `path` and check that `branch` exists.
    ///
    /// An empty repository is accepted when HEAD is an unborn symbolic ref
    /// to `refs/heads/<branch>`.
    ///
    /// # Errors
    ///
    /// - [`RepoError::NotARepo`] if `path` is not the root of a non-bare checkout
    /// - [`RepoError::BranchNotFound`] if the branch does not exist
    pub fn open(path: &Path, branch: &BranchName) -> Result<Self, RepoError> {
        let repo = git2::Repository::open(path).map_err(|_| RepoError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(RepoError::NotARepo {
                path: path.to_path_buf(),
            });
        }

        let this = Self {
            repo,
            path: path.to_path_buf(),
            branch: branch.clone(),
        };

        if !this.branch_exists()? && !this.is_unborn_on_branch() {
            return Err(RepoError::BranchNotFound {
                path: path.to_path_buf(),
                branch: branch.to_string(),
            });
        }

        Ok(this)
    }

    fn refname(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    fn branch_exists(&self) -> Result<bool, RepoError> {
        match self.repo.find_reference(&self.refname()) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) if e.code() == git2::ErrorCode::InvalidSpec => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// HEAD points at our branch but the branch has no commits yet.
    fn is_unborn_on_branch(&self) -> bool {
        let refname = self.refname();
        self.repo
            .find_reference("HEAD")
            .ok()
            .and_then(|head| head.symbolic_target().map(|t| t == refname))
            .unwrap_or(false)
    }

    fn branch_tip(&self) -> Result<Option<git2::Commit<'_>>, RepoError> {
        match self.repo.find_reference(&self.refname()) {
            Ok(reference) => Ok(Some(reference.peel_to_commit()?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn changeset_for(&self, commit: &git2::Commit<'_>) -> Result<Changeset, RepoError> {
        let id = ChangesetId::new(commit.id().to_string()).map_err(|e| RepoError::InvalidOutput {
            vcs: VcsKind::Git,
            message: e.to_string(),
        })?;

        let author = commit.author();
        let mut builder = Changeset::builder(id)
            .author(format!(
                "{} <{}>",
                author.name().unwrap_or(""),
                author.email().unwrap_or("")
            ))
            .message(String::from_utf8_lossy(commit.message_bytes()).into_owned())
            .diffs(self.diffs_for(commit)?);

        if let Some(ts) = DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0) {
            builder = builder.timestamp(ts);
        }

        Ok(builder.build())
    }

    fn diffs_for(&self, commit: &git2::Commit<'_>) -> Result<Vec<Diff>, RepoError> {
        let tree = commit.tree()?;
        let parent_tree = match commit.parent_count() {
            0 => None,
            _ => Some(commit.parent(0)?.tree()?),
        };

        let mut opts = git2::DiffOptions::new();
        opts.include_typechange(true);
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

        let mut diffs = Vec::with_capacity(diff.deltas().len());
        for (idx, delta) in diff.deltas().enumerate() {
            let kind = match delta.status() {
                git2::Delta::Added => ChangeKind::Added,
                git2::Delta::Deleted => ChangeKind::Deleted,
                _ => ChangeKind::Modified,
            };

            let file = match kind {
                ChangeKind::Deleted => delta.old_file(),
                ChangeKind::Added | ChangeKind::Modified => delta.new_file(),
            };
            let path = file
                .path_bytes()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .ok_or_else(|| RepoError::InvalidOutput {
                    vcs: VcsKind::Git,
                    message: "diff delta without a path".into(),
                })?;

            let body = match git2::Patch::from_diff(&diff, idx)? {
                Some(mut patch) => {
                    let buf = patch.to_buf()?;
                    hunks_only(&String::from_utf8_lossy(&buf))
                }
                None => String::new(),
            };

            diffs.push(Diff::new(path, kind, body));
        }

        sort_diffs(&mut diffs);
        Ok(diffs)
    }

    /// Run `git` in the checkout with extra config passed via environment.
    fn run_git(&self, config: &[(&str, &str)], args: &[&str]) -> Result<(), GitLfsFailure> {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_CONFIG_COUNT", config.len().to_string());
        for (i, (key, value)) in config.iter().enumerate() {
            cmd.env(format!("GIT_CONFIG_KEY_{}", i), key)
                .env(format!("GIT_CONFIG_VALUE_{}", i), value);
        }

        let output = cmd.output().map_err(|e| GitLfsFailure {
            args: join_args(args),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(GitLfsFailure {
                args: join_args(args),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// A failed `git lfs` invocation, before redaction.
struct GitLfsFailure {
    args: String,
    message: String,
}

impl Repository for GitRepo {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn head_changeset(&self) -> Result<Option<Changeset>, RepoError> {
        match self.branch_tip()? {
            Some(commit) => Ok(Some(self.changeset_for(&commit)?)),
            None => Ok(None),
        }
    }

    fn diffs(&self, id: &ChangesetId) -> Result<Vec<Diff>, RepoError> {
        let oid = git2::Oid::from_str(id.as_str())?;
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(|_| RepoError::ChangesetNotFound {
                id: id.to_string(),
            })?;
        self.diffs_for(&commit)
    }

    fn push_lfs(&self, pull: &str, push: &SecretUrl) -> Result<(), RepoError> {
        if self.repo.find_remote("origin").is_err() {
            return Err(RepoError::Transfer {
                endpoint: push.redacted(),
                message: format!("{} has no 'origin' remote", self.path.display()),
            });
        }

        self.run_git(&[("lfs.url", pull)], &["lfs", "fetch", "--all", "origin"])
            .map_err(|f| RepoError::Transfer {
                endpoint: pull.to_string(),
                message: format!("git {}: {}", f.args, push.redact_in(&f.message)),
            })?;

        self.run_git(
            &[("lfs.url", pull), ("lfs.pushurl", push.expose_secret())],
            &["lfs", "push", "--all", "origin"],
        )
        .map_err(|f| RepoError::Transfer {
            endpoint: push.redacted(),
            message: format!("git {}: {}", f.args, push.redact_in(&f.message)),
        })?;

        Ok(())
    }
}
