use super::condition::{Condition, set_conditions};
use super::meta::ObjectMeta;
use argonaut_policy::Rule;
use serde::{Deserialize, Serialize};

/// Finalizer deferring Role deletion until its policy overlay is removed.
pub const ROLE_FINALIZER: &str = "role.rbac.argonaut.dev";

/// A global role: a named set of permission rules compiled into the shared
/// policy ConfigMap under `policy.<namespace>.<name>.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub meta: ObjectMeta,
    pub spec: RoleSpec,
    #[serde(default)]
    pub status: RoleStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStatus {
    /// Name of the RoleBinding granting this role, once one has bound it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_binding_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Role {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec: RoleSpec { rules },
            status: RoleStatus::default(),
        }
    }

    pub fn has_role_binding_ref(&self) -> bool {
        self.status
            .role_binding_ref
            .as_deref()
            .is_some_and(|name| !name.is_empty())
    }

    pub fn set_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        set_conditions(&mut self.status.conditions, conditions);
    }
}
