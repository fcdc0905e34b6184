//! Where template sources come from.

use std::{collections::HashMap, fs::read_to_string, path::{Path, PathBuf}, sync::RwLock};

use anyhow::{anyhow, bail, Context, Result};
use kstring::KString;


pub trait Loader: Send + Sync {
    fn stat(&self, filename: &str) -> bool;
    fn load(&self, filename: &str) -> Result<String>;
}

pub fn my_read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    read_to_string(&path).with_context(
        || anyhow!("opening path for reading: {:?}", path.as_ref()))
}


/// Loads files below a root directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsLoader { root: root.into() }
    }

    /// Paths leaving the root (absolute, or with `..`) are refused.
    fn path(&self, filename: &str) -> Result<PathBuf> {
        let rel = Path::new(filename);
        if rel.is_absolute()
            || rel.components().any(|c| matches!(c, std::path::Component::ParentDir))
        {
            bail!("template path {filename:?} leaves the template directory")
        }
        Ok(self.root.join(rel))
    }
}

impl Loader for FsLoader {
    fn stat(&self, filename: &str) -> bool {
        self.path(filename).map_or(false, |p| p.is_file())
    }

    fn load(&self, filename: &str) -> Result<String> {
        my_read_to_string(self.path(filename)?)
    }
}


/// Templates held in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemLoader {
    files: RwLock<HashMap<KString, String>>,
}

impl MemLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, filename: &str, source: &str) -> Self {
        self.insert(filename, source);
        self
    }

    pub fn insert(&self, filename: &str, source: &str) {
        self.files.write().unwrap_or_else(|e| e.into_inner())
            .insert(KString::from_ref(filename), source.to_string());
    }
}

impl Loader for MemLoader {
    fn stat(&self, filename: &str) -> bool {
        self.files.read().unwrap_or_else(|e| e.into_inner()).contains_key(filename)
    }

    fn load(&self, filename: &str) -> Result<String> {
        self.files.read().unwrap_or_else(|e| e.into_inner())
            .get(filename)
            .cloned()
            .ok_or_else(|| anyhow!("no template named {filename:?}"))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_mem_loader() -> Result<()> {
        let l = MemLoader::new().with("a.vuego", "<p>a</p>");
        assert!(l.stat("a.vuego"));
        assert!(! l.stat("b.vuego"));
        assert_eq!(l.load("a.vuego")?, "<p>a</p>");
        assert!(l.load("b.vuego").is_err());
        Ok(())
    }

    #[test]
    fn t_fs_loader() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("vuego-t-fs-loader-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("layouts"))?;
        std::fs::write(dir.join("layouts/base.vuego"), "<main></main>")?;
        let l = FsLoader::new(&dir);
        assert!(l.stat("layouts/base.vuego"));
        assert_eq!(l.load("layouts/base.vuego")?, "<main></main>");
        assert!(! l.stat("missing.vuego"));
        assert!(l.load("../etc/passwd").is_err());
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
