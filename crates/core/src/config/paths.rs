use std::path::{Path, PathBuf};

/// Name of the per-project state directory
pub const STATE_DIR_NAME: &str = ".qualis";

/// Locations of the files qualis reads and writes for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    project_root: PathBuf,
    state_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let state_dir = project_root.join(STATE_DIR_NAME);
        Self {
            project_root,
            state_dir,
        }
    }

    /// Paths rooted at the current working directory
    pub fn from_current_dir() -> std::io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::new(cwd.canonicalize().unwrap_or(cwd)))
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.state_dir.join("config.toml")
    }

    pub fn history_file(&self) -> PathBuf {
        self.state_dir.join("history.json")
    }

    /// Artifact directory owned by a single module
    pub fn module_dir(&self, name: &str) -> PathBuf {
        self.state_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_state_dir() {
        let paths = ProjectPaths::new("/work/app");
        assert_eq!(paths.state_dir(), Path::new("/work/app/.qualis"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/work/app/.qualis/config.toml")
        );
        assert_eq!(
            paths.history_file(),
            PathBuf::from("/work/app/.qualis/history.json")
        );
        assert_eq!(
            paths.module_dir("coverage"),
            PathBuf::from("/work/app/.qualis/coverage")
        );
    }
}
