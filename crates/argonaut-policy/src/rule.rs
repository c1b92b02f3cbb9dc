use crate::resource::{ProjectResourceKind, ResourceKind};
use serde::{Deserialize, Serialize};

/// A single permission grant in a global role: one resource kind, any number
/// of verbs, any number of objects. Expansion is the full verb × object
/// cross product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub resource: ResourceKind,
    pub verbs: Vec<String>,
    pub objects: Vec<String>,
}

/// A permission grant in a project-scoped role. Identical shape to [`Rule`]
/// but restricted to the project-scoped resource vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRule {
    pub resource: ProjectResourceKind,
    pub verbs: Vec<String>,
    pub objects: Vec<String>,
}
