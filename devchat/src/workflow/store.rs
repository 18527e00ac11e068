//! Durable workflow storage: one YAML file per workflow in a directory
//! the store exclusively owns.
//!
//! Writes go through a temp file and rename, so a failed write never
//! leaves a half-written record behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::Workflow;

pub struct WorkflowStore {
    dir: PathBuf,
}

impl WorkflowStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// The directory is an explicit argument; nothing here reaches for
    /// a home-directory default.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create workflow directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.yaml"))
    }

    /// Persist `workflow` under its name, silently overwriting any
    /// existing record.
    pub fn put(&self, workflow: &Workflow) -> Result<()> {
        workflow.validate()?;

        let yaml = serde_yaml::to_string(workflow)
            .with_context(|| format!("failed to serialize workflow '{}'", workflow.name))?;

        let path = self.path_for(&workflow.name);
        let tmp = self.dir.join(format!(".{}.yaml.tmp", workflow.name));
        fs::write(&tmp, yaml)
            .with_context(|| format!("failed to write workflow file {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace workflow file {}", path.display()))?;

        debug!(workflow = %workflow.name, path = %path.display(), "workflow saved");
        Ok(())
    }

    /// Load a workflow, or `None` if no record exists for `name`.
    pub fn get(&self, name: &str) -> Result<Option<Workflow>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read workflow file {}", path.display()))?;
        let workflow = serde_yaml::from_str(&raw)
            .with_context(|| format!("malformed workflow file {}", path.display()))?;
        Ok(Some(workflow))
    }

    /// Names of all persisted workflows, sorted for stable output.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to read workflow directory {}", self.dir.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                // Leftover temp files from interrupted writes are not records.
                if !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a workflow; returns whether a record existed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("failed to delete workflow file {}", path.display()))?;
        debug!(workflow = %name, "workflow deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(name: &str) -> Workflow {
        Workflow {
            name: name.to_string(),
            description: "sample".to_string(),
            steps: vec![super::super::WorkflowStep {
                step_type: "ask".to_string(),
                name: "s1".to_string(),
                description: String::new(),
                parameters: Default::default(),
            }],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn list_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::open(dir.path()).unwrap();
        store.put(&sample("alpha")).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a workflow").unwrap();
        fs::write(dir.path().join(".beta.yaml.tmp"), "leftover").unwrap();

        assert_eq!(store.list().unwrap(), vec!["alpha"]);
    }

    #[test]
    fn invalid_workflow_never_reaches_disk() {
        let dir = tempdir().unwrap();
        let store = WorkflowStore::open(dir.path()).unwrap();
        let mut workflow = sample("dup");
        workflow.steps.push(workflow.steps[0].clone());

        assert!(store.put(&workflow).is_err());
        assert_eq!(store.get("dup").unwrap(), None);
    }
}
