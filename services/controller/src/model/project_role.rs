use super::condition::{Condition, set_conditions};
use super::meta::ObjectMeta;
use argonaut_policy::ProjectRule;
use serde::{Deserialize, Serialize};

/// Finalizer deferring ProjectRole deletion until its compiled entries are
/// removed from every bound project.
pub const PROJECT_ROLE_FINALIZER: &str = "rbac.argonaut.dev/finalizer";

/// A project-scoped role: description plus rules, compiled into a named role
/// entry on each project its binding targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRole {
    pub meta: ObjectMeta,
    pub spec: ProjectRoleSpec,
    #[serde(default)]
    pub status: ProjectRoleStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRoleSpec {
    pub description: String,
    pub rules: Vec<ProjectRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRoleStatus {
    /// Name of the ProjectRoleBinding granting this role, once one has bound it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_role_binding_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ProjectRole {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        rules: Vec<ProjectRule>,
    ) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec: ProjectRoleSpec {
                description: description.into(),
                rules,
            },
            status: ProjectRoleStatus::default(),
        }
    }

    pub fn has_project_role_binding_ref(&self) -> bool {
        self.status
            .project_role_binding_ref
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }

    pub fn set_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        set_conditions(&mut self.status.conditions, conditions);
    }
}
