//! Workflow definitions loaded from YAML files.
//!
//! ```yaml
//! name: storefront
//! items:
//!   - id: schema
//!     capability: backend
//!     estimated_duration_secs: 120
//!   - id: ui
//!     capability: frontend
//!     depends_on: [schema]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::work_item::WorkItem;
use crate::domain::errors::{DomainError, DomainResult};

/// A named set of work items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<WorkItem>,
}

impl Workflow {
    /// Parse a workflow from YAML text. Items without a name are named
    /// after their id.
    pub fn from_yaml(text: &str) -> DomainResult<Self> {
        let mut workflow: Self = serde_yaml::from_str(text)?;
        for item in &mut workflow.items {
            if item.name.is_empty() {
                item.name.clone_from(&item.id);
            }
        }
        workflow.check_unique_ids()?;
        Ok(workflow)
    }

    /// Read and parse a workflow file.
    pub fn from_file(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DomainError::ValidationFailed(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut workflow = Self::from_yaml(&text)?;
        if workflow.name.is_empty() {
            workflow.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(workflow)
    }

    fn check_unique_ids(&self) -> DomainResult<()> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(DomainError::DuplicateWorkItem(item.id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::work_item::Capability;
    use std::io::Write;

    const YAML: &str = r"
name: storefront
items:
  - id: schema
    capability: backend
    priority: 9
    estimated_duration_secs: 120
  - id: ui
    name: Storefront UI
    capability: frontend
    depends_on: [schema]
";

    #[test]
    fn test_parse_workflow() {
        let workflow = Workflow::from_yaml(YAML).unwrap();
        assert_eq!(workflow.name, "storefront");
        assert_eq!(workflow.items.len(), 2);
        assert_eq!(workflow.items[0].name, "schema");
        assert_eq!(workflow.items[0].priority, 9);
        assert_eq!(workflow.items[1].name, "Storefront UI");
        assert_eq!(workflow.items[1].capability, Capability::Frontend);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let yaml = "items:\n  - {id: a, capability: ops}\n  - {id: a, capability: ops}\n";
        let err = Workflow::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateWorkItem(id) if id == "a"));
    }

    #[test]
    fn test_from_file_names_workflow_after_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "items:\n  - {{id: a, capability: ops}}\n").unwrap();
        let workflow = Workflow::from_file(file.path()).unwrap();
        assert!(!workflow.name.is_empty());
        assert_eq!(workflow.items.len(), 1);
    }
}
