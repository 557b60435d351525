//! Mirror working directory management
//!
//! All filesystem changes to the temp root and the per-repository mirror
//! directories go through [`MirrorStore`]. Under dry-run every mutation is
//! logged and skipped.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Owner of the temp root and the mirror directories under it
#[derive(Debug, Clone)]
pub struct MirrorStore {
    root: PathBuf,
    dry_run: bool,
}

impl MirrorStore {
    pub fn new(root: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            dry_run,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the temp root if it does not exist yet
    pub async fn ensure_root(&self) -> Result<()> {
        if self.dry_run {
            info!("[dry-run] Would ensure working directory {}", self.root.display());
            return Ok(());
        }

        if !self.root.exists() {
            info!("Creating working directory {}", self.root.display());
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create working directory {}", self.root.display()))
    }

    /// Whether a mirror directory is present at `path`
    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Recursively remove `path`, best effort
    ///
    /// Returns `true` when nothing is left at `path` afterwards. A plain file
    /// sitting where a mirror should be is removed as well. Failures are
    /// logged as warnings and never abort the run.
    pub async fn purge(&self, path: &Path) -> bool {
        if self.dry_run {
            info!("[dry-run] Would remove {}", path.display());
            return true;
        }

        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return true,
            Err(e) => {
                warn!("Failed to inspect {}: {}", path.display(), e);
                return false;
            }
        };

        debug!("Removing {}", path.display());
        let removed = if metadata.is_dir() {
            remove_dir_forced(path).await
        } else {
            tokio::fs::remove_file(path)
                .await
                .context("Failed to remove file")
        };

        match removed {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to remove {}: {:#}", path.display(), e);
                false
            }
        }
    }
}

async fn remove_dir_forced(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        // Windows refuses to delete read-only files, and git marks pack files read-only
        #[cfg(windows)]
        Err(first) if first.kind() == std::io::ErrorKind::PermissionDenied => {
            clear_readonly(path.to_path_buf())
                .await
                .context("Failed to clear read-only flags")?;
            tokio::fs::remove_dir_all(path)
                .await
                .context("Failed to remove directory")
        }
        Err(e) => Err(e).context("Failed to remove directory"),
    }
}

#[cfg(windows)]
async fn clear_readonly(root: PathBuf) -> Result<()> {
    let mut pending = vec![root];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                pending.push(entry.path());
            }
            let mut permissions = metadata.permissions();
            if permissions.readonly() {
                // Only clears FILE_ATTRIBUTE_READONLY on Windows
                #[allow(clippy::permissions_set_readonly_false)]
                permissions.set_readonly(false);
                tokio::fs::set_permissions(entry.path(), permissions).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_root_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = MirrorStore::new(temp_dir.path().join("work").join("mirrors"), false);

        store.ensure_root().await.unwrap();
        store.ensure_root().await.unwrap();

        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn test_purge_removes_nested_tree() {
        let temp_dir = TempDir::new().unwrap();
        let mirror = temp_dir.path().join("x.git");
        std::fs::create_dir_all(mirror.join("refs/heads")).unwrap();
        std::fs::write(mirror.join("HEAD"), "ref: refs/heads/main\n").unwrap();

        let store = MirrorStore::new(temp_dir.path(), false);
        assert!(store.purge(&mirror).await);
        assert!(!mirror.exists());
    }

    #[tokio::test]
    async fn test_purge_missing_directory_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let store = MirrorStore::new(temp_dir.path(), false);
        assert!(store.purge(&temp_dir.path().join("absent.git")).await);
    }

    #[tokio::test]
    async fn test_purge_removes_plain_file_at_mirror_path() {
        let temp_dir = TempDir::new().unwrap();
        let stray = temp_dir.path().join("x.git");
        std::fs::write(&stray, b"not a mirror").unwrap();

        let store = MirrorStore::new(temp_dir.path(), false);
        assert!(store.purge(&stray).await);
        assert!(std::fs::symlink_metadata(&stray).is_err());
    }

    #[tokio::test]
    async fn test_purge_removes_read_only_files() {
        let temp_dir = TempDir::new().unwrap();
        let mirror = temp_dir.path().join("ro.git");
        let pack = mirror.join("objects/pack/pack-1.pack");
        std::fs::create_dir_all(pack.parent().unwrap()).unwrap();
        std::fs::write(&pack, b"PACK").unwrap();
        let mut permissions = std::fs::metadata(&pack).unwrap().permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(&pack, permissions).unwrap();

        let store = MirrorStore::new(temp_dir.path(), false);
        assert!(store.purge(&mirror).await);
        assert!(!mirror.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_purge_leaves_permissions_of_survivors_alone() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let mirror = temp_dir.path().join("ro.git");
        let pack = mirror.join("objects/pack/pack-1.pack");
        std::fs::create_dir_all(pack.parent().unwrap()).unwrap();
        std::fs::write(&pack, b"PACK").unwrap();
        std::fs::set_permissions(&pack, std::fs::Permissions::from_mode(0o444)).unwrap();

        // A non-writable parent directory makes the removal fail
        let pack_dir = pack.parent().unwrap().to_path_buf();
        std::fs::set_permissions(&pack_dir, std::fs::Permissions::from_mode(0o555)).unwrap();

        let store = MirrorStore::new(temp_dir.path(), false);
        let removed = store.purge(&mirror).await;

        let pack_mode = std::fs::metadata(&pack).map(|m| m.permissions().mode() & 0o777);
        std::fs::set_permissions(&pack_dir, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Running as root can delete regardless, in which case nothing survives
        if !removed {
            assert_eq!(pack_mode.unwrap(), 0o444);
        }
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("mirrors");
        let existing = temp_dir.path().join("keep.git");
        std::fs::create_dir_all(&existing).unwrap();

        let store = MirrorStore::new(&root, true);
        store.ensure_root().await.unwrap();
        assert!(store.purge(&existing).await);

        assert!(!root.exists());
        assert!(existing.exists());
    }
}
