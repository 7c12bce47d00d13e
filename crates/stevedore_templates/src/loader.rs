//! Template loading functionality.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use stevedore_spec::ConfigFile;

use crate::error::{TemplateError, TemplateResult};

/// Template sources keyed by template name.
pub type TemplateSet = BTreeMap<String, String>;

/// Locates templates by name across an ordered list of directories.
///
/// The usual order is the service's own directory first, then the shared
/// `templates/` directory.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    search_paths: Vec<PathBuf>,
}

impl TemplateLoader {
    /// Create a new template loader.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Loader for a service directory plus the shared templates directory under `root`.
    pub fn for_service(service_dir: impl Into<PathBuf>, root: impl AsRef<Path>) -> Self {
        Self::new(vec![service_dir.into(), root.as_ref().join("templates")])
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first existing file for a template name.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Read a single template.
    pub fn load(&self, name: &str) -> TemplateResult<String> {
        let path = self.locate(name).ok_or_else(|| TemplateError::NotFound {
            name: name.to_string(),
            searched: self.search_paths.clone(),
        })?;
        debug!("Reading template {} from {:?}", name, path);
        Ok(fs::read_to_string(path)?)
    }

    /// Read every template bound by `files`. Fails on the first missing source.
    pub fn load_all(&self, files: &[ConfigFile]) -> TemplateResult<TemplateSet> {
        let mut set = TemplateSet::new();
        for file in files {
            if !set.contains_key(&file.name) {
                set.insert(file.name.clone(), self.load(&file.name)?);
            }
        }
        Ok(set)
    }
}
