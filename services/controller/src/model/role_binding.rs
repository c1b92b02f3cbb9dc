use super::condition::{Condition, set_conditions};
use super::meta::ObjectMeta;
use super::project_role_binding::RoleRef;
use argonaut_policy::Subject;
use serde::{Deserialize, Serialize};

/// Finalizer deferring RoleBinding deletion until derived policy state is
/// cleaned up.
pub const ROLE_BINDING_FINALIZER: &str = "rbac.argonaut.dev/finalizer";

/// Grants a global role to a list of subjects. The referenced role may be a
/// stored [`super::Role`] or one of the reserved built-in names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub meta: ObjectMeta,
    pub spec: RoleBindingSpec,
    #[serde(default)]
    pub status: RoleBindingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBindingSpec {
    pub subjects: Vec<Subject>,
    pub role_ref: RoleRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBindingStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl RoleBinding {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        role_ref: impl Into<String>,
        subjects: Vec<Subject>,
    ) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec: RoleBindingSpec {
                subjects,
                role_ref: RoleRef {
                    name: role_ref.into(),
                },
            },
            status: RoleBindingStatus::default(),
        }
    }

    pub fn set_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        set_conditions(&mut self.status.conditions, conditions);
    }
}
