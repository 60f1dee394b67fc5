// File: ./src/context.rs
/*! Application context abstraction for filesystem paths.

`AppContext` decides where snapcal keeps its config file and the per-user
event files. `StandardContext` follows the OS conventions through
`directories::ProjectDirs` (or an explicit `--root`), `TestContext` lives in a
throwaway temp directory that is removed on drop.

Code that touches the filesystem takes a `&dyn AppContext`; there are no
global path helpers.
*/

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub trait AppContext: Send + Sync + std::fmt::Debug {
    fn get_data_dir(&self) -> Result<PathBuf>;
    fn get_config_dir(&self) -> Result<PathBuf>;

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_config_dir()?.join("config.toml"))
    }

    /// Directory holding one `<user>.json` file per user.
    fn get_events_dir(&self) -> Result<PathBuf> {
        let dir = self.get_data_dir()?.join("events");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        Ok(dir)
    }
}

// --- Production Implementation ---

#[derive(Clone, Debug)]
pub struct StandardContext {
    override_root: Option<PathBuf>,
}

impl StandardContext {
    /// With `Some(root)`, everything goes under `root/data` and `root/config`.
    pub fn new(override_root: Option<PathBuf>) -> Self {
        Self { override_root }
    }

    fn ensure_exists(path: PathBuf) -> Result<PathBuf> {
        if !path.exists() {
            std::fs::create_dir_all(&path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(path)
    }

    fn get_proj_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("app", "snapcal", "snapcal")
    }
}

impl AppContext for StandardContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Self::ensure_exists(root.join("data"));
        }
        let proj = Self::get_proj_dirs().ok_or_else(|| anyhow::anyhow!("No home directory"))?;
        Self::ensure_exists(proj.data_dir().to_path_buf())
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Self::ensure_exists(root.join("config"));
        }
        let proj = Self::get_proj_dirs().ok_or_else(|| anyhow::anyhow!("No home directory"))?;
        Self::ensure_exists(proj.config_dir().to_path_buf())
    }
}

// --- Test Implementation ---

#[derive(Clone, Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    /// Creates a unique directory under the OS temp dir, removed on drop.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let root = std::env::temp_dir().join(format!("snapcal_test_{}", uuid));
        std::fs::create_dir_all(&root).expect("failed to create TestContext temp dir");
        Self { root }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_data_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("data");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }

    fn get_config_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("config");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_root_layout() {
        let scratch = TestContext::new();
        let ctx = StandardContext::new(Some(scratch.root.clone()));
        assert_eq!(ctx.get_data_dir().unwrap(), scratch.root.join("data"));
        assert_eq!(
            ctx.get_config_file_path().unwrap(),
            scratch.root.join("config").join("config.toml")
        );
        let events = ctx.get_events_dir().unwrap();
        assert!(events.is_dir());
        assert!(events.ends_with("events"));
    }

    #[test]
    fn test_test_context_cleans_up() {
        let root = {
            let ctx = TestContext::new();
            ctx.get_data_dir().unwrap();
            ctx.root.clone()
        };
        assert!(!root.exists());
    }
}
