//! Git fixtures shared by the integration tests

#![allow(dead_code)]

use git2::{Repository, Signature};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A bare "origin" plus one working clone with an initial commit on `main`
pub struct Fixture {
    pub root: TempDir,
    pub remote_path: PathBuf,
    pub work_path: PathBuf,
}

impl Fixture {
    pub fn new(manifest_version: &str) -> Self {
        let root = TempDir::new().expect("Could not create temp dir");
        let remote_path = root.path().join("origin.git");
        let work_path = root.path().join("work");

        let remote = Repository::init_bare(&remote_path).expect("Could not init bare remote");
        let work = Repository::init(&work_path).expect("Could not init git repo");
        configure_user(&work);

        write_manifest(&work_path, manifest_version);
        commit_all(&work, "Initial commit");

        work.remote("origin", remote_path.to_str().unwrap())
            .expect("Could not add remote");
        {
            let mut origin = work.find_remote("origin").unwrap();
            origin
                .push(&["refs/heads/main:refs/heads/main"], None)
                .expect("Could not push main");
        }
        remote
            .set_head("refs/heads/main")
            .expect("Could not set remote HEAD");

        Fixture {
            root,
            remote_path,
            work_path,
        }
    }

    pub fn work(&self) -> Repository {
        Repository::open(&self.work_path).unwrap()
    }

    pub fn remote(&self) -> Repository {
        Repository::open_bare(&self.remote_path).unwrap()
    }

    /// Clone origin into a second working copy
    pub fn clone_into(&self, name: &str) -> PathBuf {
        let path = self.root.path().join(name);
        let repo = Repository::clone(self.remote_path.to_str().unwrap(), &path)
            .expect("Could not clone remote");
        configure_user(&repo);
        path
    }

    pub fn remote_has_tag(&self, tag: &str) -> bool {
        self.remote()
            .find_reference(&format!("refs/tags/{}", tag))
            .is_ok()
    }

    /// Push a tag from a throwaway clone, as another CI run would
    pub fn push_tag_elsewhere(&self, tag: &str) {
        let path = self.clone_into(&format!("elsewhere-{}", tag));
        let repo = Repository::open(&path).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        repo.tag_lightweight(tag, head.as_object(), false).unwrap();
        let mut origin = repo.find_remote("origin").unwrap();
        let refspec = format!("refs/tags/{0}:refs/tags/{0}", tag);
        origin.push(&[refspec.as_str()], None).unwrap();
    }
}

fn configure_user(repo: &Repository) {
    let mut config = repo.config().expect("Could not get config");
    config
        .set_str("user.name", "Test User")
        .expect("Could not set user.name");
    config
        .set_str("user.email", "test@example.com")
        .expect("Could not set user.email");
}

pub fn write_manifest(dir: &Path, version: &str) {
    let manifest = format!(
        "{{\n  \"domain\": \"widget\",\n  \"name\": \"Widget\",\n  \"version\": \"{}\"\n}}\n",
        version
    );
    fs::write(dir.join("manifest.json"), manifest).expect("Could not write manifest");
}

/// Commit every file in the working directory onto `refs/heads/main`
pub fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().expect("Could not get index");
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .expect("Could not add files");
    index.write().expect("Could not write index");
    let tree_id = index.write_tree().expect("Could not write tree");
    let tree = repo.find_tree(tree_id).expect("Could not find tree");

    let sig = Signature::now("Test User", "test@example.com").unwrap();
    let parent = repo
        .find_reference("refs/heads/main")
        .ok()
        .and_then(|r| r.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    repo.commit(Some("refs/heads/main"), &sig, &sig, message, &tree, &parents)
        .expect("Could not create commit");
    repo.set_head("refs/heads/main").expect("Could not set HEAD");
}
