use super::condition::{Condition, set_conditions};
use super::meta::ObjectMeta;
use argonaut_policy::ProjectSubject;
use serde::{Deserialize, Serialize};

/// Finalizer deferring ProjectRoleBinding deletion until its role entries
/// are removed from every subject project.
pub const PROJECT_ROLE_BINDING_FINALIZER: &str = "rbac.argonaut.dev/finalizer";

/// Reference to the role a binding grants. The name must not carry the
/// policy language's reserved `role:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub name: String,
}

/// Grants a project-scoped role to groups within one or more projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRoleBinding {
    pub meta: ObjectMeta,
    pub spec: ProjectRoleBindingSpec,
    #[serde(default)]
    pub status: ProjectRoleBindingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRoleBindingSpec {
    pub subjects: Vec<ProjectSubject>,
    pub role_ref: RoleRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRoleBindingStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Projects currently carrying the compiled role entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects_bound: Vec<String>,
}

impl ProjectRoleBinding {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        role_ref: impl Into<String>,
        subjects: Vec<ProjectSubject>,
    ) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec: ProjectRoleBindingSpec {
                subjects,
                role_ref: RoleRef {
                    name: role_ref.into(),
                },
            },
            status: ProjectRoleBindingStatus::default(),
        }
    }

    pub fn set_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        set_conditions(&mut self.status.conditions, conditions);
    }
}
