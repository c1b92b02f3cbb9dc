use super::meta::ObjectMeta;
use serde::{Deserialize, Serialize};

/// An external project resource owned by the CD tool. Only the role list is
/// modeled and mutated here; the patcher must never write any other field so
/// concurrent edits elsewhere in the project survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub spec: ProjectSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<ProjectRoleEntry>,
}

/// One named role inside a project's role list. `policies` entries follow
/// the `p, proj:<project>:<role>, <resource>, <verb>, <object>, allow`
/// grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRoleEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,
}

impl Project {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec: ProjectSpec::default(),
        }
    }
}
