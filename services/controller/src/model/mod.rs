//! Resource models managed and consumed by the controller.
//!
//! # Purpose
//! Re-exports the declarative role/binding resources, the external resources
//! they compile into (policy ConfigMap, Project), and the shared metadata
//! and condition machinery.
mod condition;
mod config_map;
mod meta;
mod project;
mod project_role;
mod project_role_binding;
mod role;
mod role_binding;

pub use condition::{
    Condition, ConditionReason, ConditionStatus, ConditionType, deleting, pending,
    reconcile_error, reconcile_success, set_conditions,
};
pub use config_map::ConfigMap;
pub use meta::{ObjectKey, ObjectMeta};
pub use project::{Project, ProjectRoleEntry, ProjectSpec};
pub use project_role::{PROJECT_ROLE_FINALIZER, ProjectRole, ProjectRoleSpec, ProjectRoleStatus};
pub use project_role_binding::{
    PROJECT_ROLE_BINDING_FINALIZER, ProjectRoleBinding, ProjectRoleBindingSpec,
    ProjectRoleBindingStatus, RoleRef,
};
pub use role::{ROLE_FINALIZER, Role, RoleSpec, RoleStatus};
pub use role_binding::{ROLE_BINDING_FINALIZER, RoleBinding, RoleBindingSpec, RoleBindingStatus};
