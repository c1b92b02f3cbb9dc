use crate::model::{
    ConfigMap, ObjectKey, Project, ProjectRole, ProjectRoleBinding, Role, RoleBinding,
};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

/// Conflict retries used by callers wrapping shared-document writes in
/// [`retry_on_conflict`].
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The object-store seam the reconcilers run against.
///
/// Updates and patches use optimistic concurrency: a write whose resource
/// version is stale fails with [`StoreError::Conflict`] and must be retried
/// from a fresh read. `delete_*` only marks the deletion timestamp; an
/// object is physically removed once an update drains its finalizer list.
/// `update_*_status` replaces the status subresource without touching spec.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_role(&self, key: &ObjectKey) -> StoreResult<Role>;
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    async fn create_role(&self, role: Role) -> StoreResult<Role>;
    async fn update_role(&self, role: Role) -> StoreResult<Role>;
    async fn update_role_status(&self, role: &Role) -> StoreResult<()>;
    async fn delete_role(&self, key: &ObjectKey) -> StoreResult<()>;

    async fn get_role_binding(&self, key: &ObjectKey) -> StoreResult<RoleBinding>;
    async fn list_role_bindings(&self) -> StoreResult<Vec<RoleBinding>>;
    async fn create_role_binding(&self, binding: RoleBinding) -> StoreResult<RoleBinding>;
    async fn update_role_binding(&self, binding: RoleBinding) -> StoreResult<RoleBinding>;
    async fn update_role_binding_status(&self, binding: &RoleBinding) -> StoreResult<()>;
    async fn delete_role_binding(&self, key: &ObjectKey) -> StoreResult<()>;

    async fn get_project_role(&self, key: &ObjectKey) -> StoreResult<ProjectRole>;
    async fn list_project_roles(&self) -> StoreResult<Vec<ProjectRole>>;
    async fn create_project_role(&self, role: ProjectRole) -> StoreResult<ProjectRole>;
    async fn update_project_role(&self, role: ProjectRole) -> StoreResult<ProjectRole>;
    async fn update_project_role_status(&self, role: &ProjectRole) -> StoreResult<()>;
    async fn delete_project_role(&self, key: &ObjectKey) -> StoreResult<()>;

    async fn get_project_role_binding(&self, key: &ObjectKey) -> StoreResult<ProjectRoleBinding>;
    async fn list_project_role_bindings(&self) -> StoreResult<Vec<ProjectRoleBinding>>;
    async fn create_project_role_binding(
        &self,
        binding: ProjectRoleBinding,
    ) -> StoreResult<ProjectRoleBinding>;
    async fn update_project_role_binding(
        &self,
        binding: ProjectRoleBinding,
    ) -> StoreResult<ProjectRoleBinding>;
    async fn update_project_role_binding_status(
        &self,
        binding: &ProjectRoleBinding,
    ) -> StoreResult<()>;
    async fn delete_project_role_binding(&self, key: &ObjectKey) -> StoreResult<()>;

    async fn get_config_map(&self, key: &ObjectKey) -> StoreResult<ConfigMap>;
    async fn create_config_map(&self, config_map: ConfigMap) -> StoreResult<ConfigMap>;
    async fn update_config_map(&self, config_map: ConfigMap) -> StoreResult<ConfigMap>;

    async fn get_project(&self, key: &ObjectKey) -> StoreResult<Project>;
    async fn create_project(&self, project: Project) -> StoreResult<Project>;
    /// Merge-patch a project's role list. `base` is the pristine copy
    /// captured before mutation; a stale base conflicts. Only the role list
    /// is written so unrelated concurrent edits are preserved.
    async fn patch_project(&self, project: Project, base: &Project) -> StoreResult<Project>;

    fn backend_name(&self) -> &'static str;
}

/// Re-run an optimistic write while it keeps conflicting, up to `attempts`
/// tries. The closure must re-fetch and recompute from scratch each try;
/// non-conflict results pass straight through.
pub async fn retry_on_conflict<T, F, Fut>(attempts: u32, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = StoreResult<T>>,
{
    let mut last = None;
    for _ in 0..attempts.max(1) {
        match op().await {
            Err(StoreError::Conflict(message)) => last = Some(StoreError::Conflict(message)),
            other => return other,
        }
    }
    Err(last.expect("at least one attempt runs"))
}
