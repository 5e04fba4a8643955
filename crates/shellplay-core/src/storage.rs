//! Imported workflow documents, one pretty-printed JSON file each

use crate::error::{Error, ErrorCode, Result};
use crate::workflow::WorkflowDocument;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXT: &str = "json";

pub struct WorkflowStorage {
    dir: PathBuf,
}

impl WorkflowStorage {
    /// `~/.shellplay`
    pub fn new() -> Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| Error::new(ErrorCode::Io, "HOME not set"))?;
        Self::with_dir(PathBuf::from(home).join(".shellplay"))
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Store under `<name>_<timestamp>.json`
    pub fn save(&self, workflow: &WorkflowDocument) -> Result<PathBuf> {
        let ts = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let stem = if workflow.name.is_empty() { &workflow.id } else { &workflow.name };
        let filename = format!("{}_{}.{}", sanitize(stem), ts, EXT);
        let path = self.dir.join(&filename);

        let json = serde_json::to_string_pretty(workflow)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "workflow saved");
        Ok(path)
    }

    /// Load by file name, with or without the extension
    pub fn load(&self, name: &str) -> Result<WorkflowDocument> {
        let path = self.locate(name)?;
        WorkflowDocument::from_file(path)
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(s) = name.to_str() {
                if s.ends_with(".json") {
                    files.push(s.to_string());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.locate(name)?;
        fs::remove_file(path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn locate(&self, name: &str) -> Result<PathBuf> {
        let exact = self.dir.join(name);
        if exact.is_file() {
            return Ok(exact);
        }
        let with_ext = self.dir.join(format!("{}.{}", name, EXT));
        if with_ext.is_file() {
            return Ok(with_ext);
        }
        Err(Error::workflow_not_found(name))
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Screen;

    #[test]
    fn save_list_load_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = WorkflowStorage::with_dir(tmp.path()).unwrap();
        let doc = WorkflowDocument::new("Expense report").with_screen(Screen::new("home", "Home"));

        let path = storage.save(&doc).unwrap();
        let file = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(file.starts_with("Expense_report_"));

        assert_eq!(storage.list().unwrap(), vec![file.clone()]);
        let stem = file.trim_end_matches(".json");
        let loaded = storage.load(stem).unwrap();
        assert_eq!(loaded.name, "Expense report");
        assert_eq!(loaded.screens.len(), 1);

        storage.delete(&file).unwrap();
        assert!(storage.list().unwrap().is_empty());
    }

    #[test]
    fn missing_workflow_has_suggestions() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = WorkflowStorage::with_dir(tmp.path()).unwrap();
        let err = storage.load("nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::WorkflowNotFound);
        assert!(!err.suggestions.is_empty());
    }
}
