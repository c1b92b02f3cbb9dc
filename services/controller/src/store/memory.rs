//! In-memory implementation of the resource store.
//!
//! # Purpose
//! Implements [`ResourceStore`] entirely in memory using `HashMap`s guarded
//! by `tokio::sync::RwLock`. It exists for:
//! - integration tests (no external dependencies)
//! - local development runs of the controller
//!
//! # Concurrency semantics
//! - Every object carries a resource version that is bumped on each write.
//! - `update_*` and `patch_project` conflict when the caller's version is
//!   stale, which is what drives the callers' read-compare-write retry.
//! - `update_*_status` replaces the status subresource unconditionally; the
//!   controller treats status writes as best-effort.
//!
//! # Deletion lifecycle
//! `delete_*` marks the deletion timestamp (or removes outright when no
//! finalizer is attached). A subsequent `update_*` that leaves a terminating
//! object with an empty finalizer list removes it physically, mirroring the
//! two-phase teardown the reconcilers drive.
use super::{ResourceStore, StoreError, StoreResult};
use crate::model::{
    ConfigMap, ObjectKey, ObjectMeta, Project, ProjectRole, ProjectRoleBinding, Role, RoleBinding,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

trait HasMeta: Clone {
    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

macro_rules! impl_has_meta {
    ($($ty:ty),+) => {
        $(impl HasMeta for $ty {
            fn meta(&self) -> &ObjectMeta {
                &self.meta
            }
            fn meta_mut(&mut self) -> &mut ObjectMeta {
                &mut self.meta
            }
        })+
    };
}

impl_has_meta!(Role, RoleBinding, ProjectRole, ProjectRoleBinding, ConfigMap, Project);

type Table<T> = RwLock<HashMap<ObjectKey, T>>;

async fn get_from<T: HasMeta>(table: &Table<T>, key: &ObjectKey, kind: &str) -> StoreResult<T> {
    table
        .read()
        .await
        .get(key)
        .cloned()
        .ok_or_else(|| StoreError::NotFound(format!("{kind} {key}")))
}

async fn list_from<T: HasMeta>(table: &Table<T>) -> StoreResult<Vec<T>> {
    Ok(table.read().await.values().cloned().collect())
}

async fn create_in<T: HasMeta>(table: &Table<T>, mut object: T, kind: &str) -> StoreResult<T> {
    let key = object.meta().key();
    let mut entries = table.write().await;
    if entries.contains_key(&key) {
        return Err(StoreError::Conflict(format!("{kind} {key} exists")));
    }
    let meta = object.meta_mut();
    meta.resource_version = 1;
    if meta.generation == 0 {
        meta.generation = 1;
    }
    entries.insert(key, object.clone());
    Ok(object)
}

async fn update_in<T: HasMeta>(table: &Table<T>, mut object: T, kind: &str) -> StoreResult<T> {
    let key = object.meta().key();
    let mut entries = table.write().await;
    let stored = entries
        .get(&key)
        .ok_or_else(|| StoreError::NotFound(format!("{kind} {key}")))?;
    if stored.meta().resource_version != object.meta().resource_version {
        return Err(StoreError::Conflict(format!("{kind} {key} is stale")));
    }
    object.meta_mut().resource_version += 1;
    if object.meta().is_being_deleted() && object.meta().finalizers.is_empty() {
        // Last finalizer removed while terminating: the object is gone.
        entries.remove(&key);
        return Ok(object);
    }
    entries.insert(key, object.clone());
    Ok(object)
}

async fn mark_deleted<T: HasMeta>(table: &Table<T>, key: &ObjectKey, kind: &str) -> StoreResult<()> {
    let mut entries = table.write().await;
    let stored = entries
        .get_mut(key)
        .ok_or_else(|| StoreError::NotFound(format!("{kind} {key}")))?;
    if stored.meta().finalizers.is_empty() {
        entries.remove(key);
        return Ok(());
    }
    let meta = stored.meta_mut();
    if meta.deletion_timestamp.is_none() {
        meta.deletion_timestamp = Some(Utc::now());
    }
    meta.resource_version += 1;
    Ok(())
}

/// In-memory resource store.
///
/// Authoritative state lives in one map per resource kind. Write counters
/// for the two shared documents are exposed so tests can assert that an
/// idempotent reconcile issued zero writes.
#[derive(Default)]
pub struct InMemoryStore {
    roles: Table<Role>,
    role_bindings: Table<RoleBinding>,
    project_roles: Table<ProjectRole>,
    project_role_bindings: Table<ProjectRoleBinding>,
    config_maps: Table<ConfigMap>,
    projects: Table<Project>,
    config_map_writes: AtomicU64,
    project_writes: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful ConfigMap updates since startup.
    pub fn config_map_writes(&self) -> u64 {
        self.config_map_writes.load(Ordering::Relaxed)
    }

    /// Successful Project patches since startup.
    pub fn project_writes(&self) -> u64 {
        self.project_writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_role(&self, key: &ObjectKey) -> StoreResult<Role> {
        get_from(&self.roles, key, "role").await
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        list_from(&self.roles).await
    }

    async fn create_role(&self, role: Role) -> StoreResult<Role> {
        create_in(&self.roles, role, "role").await
    }

    async fn update_role(&self, role: Role) -> StoreResult<Role> {
        update_in(&self.roles, role, "role").await
    }

    async fn update_role_status(&self, role: &Role) -> StoreResult<()> {
        let mut entries = self.roles.write().await;
        let stored = entries
            .get_mut(&role.meta.key())
            .ok_or_else(|| StoreError::NotFound(format!("role {}", role.meta.key())))?;
        stored.status = role.status.clone();
        stored.meta.resource_version += 1;
        Ok(())
    }

    async fn delete_role(&self, key: &ObjectKey) -> StoreResult<()> {
        mark_deleted(&self.roles, key, "role").await
    }

    async fn get_role_binding(&self, key: &ObjectKey) -> StoreResult<RoleBinding> {
        get_from(&self.role_bindings, key, "role binding").await
    }

    async fn list_role_bindings(&self) -> StoreResult<Vec<RoleBinding>> {
        list_from(&self.role_bindings).await
    }

    async fn create_role_binding(&self, binding: RoleBinding) -> StoreResult<RoleBinding> {
        create_in(&self.role_bindings, binding, "role binding").await
    }

    async fn update_role_binding(&self, binding: RoleBinding) -> StoreResult<RoleBinding> {
        update_in(&self.role_bindings, binding, "role binding").await
    }

    async fn update_role_binding_status(&self, binding: &RoleBinding) -> StoreResult<()> {
        let mut entries = self.role_bindings.write().await;
        let stored = entries
            .get_mut(&binding.meta.key())
            .ok_or_else(|| StoreError::NotFound(format!("role binding {}", binding.meta.key())))?;
        stored.status = binding.status.clone();
        stored.meta.resource_version += 1;
        Ok(())
    }

    async fn delete_role_binding(&self, key: &ObjectKey) -> StoreResult<()> {
        mark_deleted(&self.role_bindings, key, "role binding").await
    }

    async fn get_project_role(&self, key: &ObjectKey) -> StoreResult<ProjectRole> {
        get_from(&self.project_roles, key, "project role").await
    }

    async fn list_project_roles(&self) -> StoreResult<Vec<ProjectRole>> {
        list_from(&self.project_roles).await
    }

    async fn create_project_role(&self, role: ProjectRole) -> StoreResult<ProjectRole> {
        create_in(&self.project_roles, role, "project role").await
    }

    async fn update_project_role(&self, role: ProjectRole) -> StoreResult<ProjectRole> {
        update_in(&self.project_roles, role, "project role").await
    }

    async fn update_project_role_status(&self, role: &ProjectRole) -> StoreResult<()> {
        let mut entries = self.project_roles.write().await;
        let stored = entries
            .get_mut(&role.meta.key())
            .ok_or_else(|| StoreError::NotFound(format!("project role {}", role.meta.key())))?;
        stored.status = role.status.clone();
        stored.meta.resource_version += 1;
        Ok(())
    }

    async fn delete_project_role(&self, key: &ObjectKey) -> StoreResult<()> {
        mark_deleted(&self.project_roles, key, "project role").await
    }

    async fn get_project_role_binding(&self, key: &ObjectKey) -> StoreResult<ProjectRoleBinding> {
        get_from(&self.project_role_bindings, key, "project role binding").await
    }

    async fn list_project_role_bindings(&self) -> StoreResult<Vec<ProjectRoleBinding>> {
        list_from(&self.project_role_bindings).await
    }

    async fn create_project_role_binding(
        &self,
        binding: ProjectRoleBinding,
    ) -> StoreResult<ProjectRoleBinding> {
        create_in(&self.project_role_bindings, binding, "project role binding").await
    }

    async fn update_project_role_binding(
        &self,
        binding: ProjectRoleBinding,
    ) -> StoreResult<ProjectRoleBinding> {
        update_in(&self.project_role_bindings, binding, "project role binding").await
    }

    async fn update_project_role_binding_status(
        &self,
        binding: &ProjectRoleBinding,
    ) -> StoreResult<()> {
        let mut entries = self.project_role_bindings.write().await;
        let stored = entries.get_mut(&binding.meta.key()).ok_or_else(|| {
            StoreError::NotFound(format!("project role binding {}", binding.meta.key()))
        })?;
        stored.status = binding.status.clone();
        stored.meta.resource_version += 1;
        Ok(())
    }

    async fn delete_project_role_binding(&self, key: &ObjectKey) -> StoreResult<()> {
        mark_deleted(&self.project_role_bindings, key, "project role binding").await
    }

    async fn get_config_map(&self, key: &ObjectKey) -> StoreResult<ConfigMap> {
        get_from(&self.config_maps, key, "config map").await
    }

    async fn create_config_map(&self, config_map: ConfigMap) -> StoreResult<ConfigMap> {
        create_in(&self.config_maps, config_map, "config map").await
    }

    async fn update_config_map(&self, config_map: ConfigMap) -> StoreResult<ConfigMap> {
        let updated = update_in(&self.config_maps, config_map, "config map").await?;
        self.config_map_writes.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("argonaut_configmap_writes_total").increment(1);
        Ok(updated)
    }

    async fn get_project(&self, key: &ObjectKey) -> StoreResult<Project> {
        get_from(&self.projects, key, "project").await
    }

    async fn create_project(&self, project: Project) -> StoreResult<Project> {
        create_in(&self.projects, project, "project").await
    }

    async fn patch_project(&self, project: Project, base: &Project) -> StoreResult<Project> {
        let key = project.meta.key();
        let mut entries = self.projects.write().await;
        let stored = entries
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("project {key}")))?;
        if stored.meta.resource_version != base.meta.resource_version {
            return Err(StoreError::Conflict(format!("project {key} is stale")));
        }
        // Merge semantics: only the role list is written, so concurrent
        // edits to other project fields survive the patch.
        stored.spec.roles = project.spec.roles.clone();
        stored.meta.resource_version += 1;
        self.project_writes.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("argonaut_project_patches_total").increment(1);
        Ok(stored.clone())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
