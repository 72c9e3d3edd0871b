//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::Path;

use git2::{Oid, Repository, Signature};

use commitcraft::GitRepository;

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository with a committer identity.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config
                .set_str("user.name", "Test User")
                .expect("Failed to set user.name");
            config
                .set_str("user.email", "test@example.com")
                .expect("Failed to set user.email");
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Open the repository through the crate's own backend.
    pub fn open(&self) -> GitRepository {
        GitRepository::discover(self.path()).expect("Failed to open test repo")
    }

    /// Write a file without staging it.
    pub fn write(&self, path: &str, content: &str) {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(full, content).expect("Failed to write file");
    }

    /// Write a file and add it to the index.
    pub fn write_and_stage(&self, path: &str, content: &str) {
        self.write(path, content);
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(path)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Delete a file from the work tree and the index.
    pub fn remove_and_stage(&self, path: &str) {
        std::fs::remove_file(self.path().join(path)).expect("Failed to remove file");
        let mut index = self.repo.index().expect("Failed to get index");
        index.remove_path(Path::new(path)).expect("Failed to unstage file");
        index.write().expect("Failed to write index");
    }

    /// Commit whatever is staged. Returns the commit OID.
    pub fn commit_all(&self, message: &str) -> Oid {
        let sig = Signature::now("Test User", "test@example.com")
            .expect("Failed to create signature");
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Stage a throwaway change and commit it with `message`.
    pub fn commit_message(&self, message: &str) -> Oid {
        let count = std::fs::read_to_string(self.path().join("history.txt"))
            .map(|s| s.lines().count())
            .unwrap_or(0);
        let content = "x\n".repeat(count + 1);
        self.write_and_stage("history.txt", &content);
        self.commit_all(message)
    }

    /// Create a branch at HEAD and switch to it.
    pub fn checkout_branch(&self, name: &str) {
        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("Branching needs a commit");
        self.repo
            .branch(name, &head, false)
            .expect("Failed to create branch");
        self.repo
            .set_head(&format!("refs/heads/{name}"))
            .expect("Failed to switch branch");
    }

    /// Message of the commit HEAD points at.
    pub fn head_message(&self) -> String {
        self.repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map(|c| c.message().unwrap_or("").to_string())
            .expect("Failed to read HEAD commit")
    }
}
