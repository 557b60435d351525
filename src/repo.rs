use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Suffix of every local mirror directory and pushed target
pub const MIRROR_SUFFIX: &str = ".git";

/// One entry from the repository list with its derived locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Clone URL or path as written in the list
    pub source: String,

    /// Repository name, e.g. "widgets" for "https://host/org/widgets.git"
    pub name: String,

    /// Local mirror directory, `<temp_root>/<name>.git`
    pub destination: PathBuf,

    /// Push URL, `<target_group>/<name>.git`
    pub target_url: String,
}

impl RepoSpec {
    /// Derive name, destination and target URL for a list entry
    pub fn new(source: &str, temp_root: &Path, target_group: &str) -> Result<Self> {
        let name = repo_name(source);
        if name.is_empty() || name == "." || name == ".." {
            bail!("Cannot derive a repository name from '{}'", source);
        }

        let destination = temp_root.join(format!("{}{}", name, MIRROR_SUFFIX));
        let target_url = target_url(target_group, &name);

        Ok(Self {
            source: source.to_string(),
            name,
            destination,
            target_url,
        })
    }
}

/// Last segment of a URL, scp-style address or filesystem path, minus `.git`
pub fn repo_name(source: &str) -> String {
    let trimmed = source.trim().trim_end_matches(['/', '\\']);
    let last = trimmed
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or(trimmed);

    last.strip_suffix(MIRROR_SUFFIX).unwrap_or(last).to_string()
}

fn target_url(target_group: &str, name: &str) -> String {
    let group = target_group.trim();
    if group.ends_with('/') || group.ends_with(':') {
        format!("{}{}{}", group, name, MIRROR_SUFFIX)
    } else {
        format!("{}/{}{}", group, name, MIRROR_SUFFIX)
    }
}
