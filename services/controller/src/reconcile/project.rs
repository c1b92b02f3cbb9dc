//! Project role patcher: keeps one named entry inside a project's role list
//! synchronized with the record compiled from a ProjectRole.
//!
//! Lookup is a linear scan by name; the list carries no uniqueness
//! invariant, so on duplicates the first match wins. Patches are computed
//! against a pristine copy captured before mutation and only ever touch the
//! role list.
use crate::model::{ObjectKey, Project, ProjectRole, ProjectRoleEntry};
use crate::store::{ResourceStore, StoreError, StoreResult};
use argonaut_policy::compile_project_policies;

/// Compile the desired role entry for one project.
pub fn project_role_entry(
    role: &ProjectRole,
    project_name: &str,
    groups: &[String],
) -> ProjectRoleEntry {
    ProjectRoleEntry {
        name: role.meta.name.clone(),
        description: role.spec.description.clone(),
        groups: groups.to_vec(),
        policies: compile_project_policies(project_name, &role.meta.name, &role.spec.rules),
    }
}

fn find_role(project: &Project, role_name: &str) -> Option<usize> {
    project
        .spec
        .roles
        .iter()
        .position(|entry| entry.name == role_name)
}

/// Value equality for role entries: description, then group and policy
/// lists compared length-first and element-wise in generated order.
pub fn entries_equal(a: &ProjectRoleEntry, b: &ProjectRoleEntry) -> bool {
    if a.description != b.description
        || a.groups.len() != b.groups.len()
        || a.policies.len() != b.policies.len()
    {
        return false;
    }
    a.groups.iter().zip(&b.groups).all(|(x, y)| x == y)
        && a.policies.iter().zip(&b.policies).all(|(x, y)| x == y)
}

/// Replace-or-insert the compiled entry in the project's role list, patching
/// only when something actually changed. Returns whether a write was issued.
pub async fn upsert_project_role(
    store: &dyn ResourceStore,
    project_key: &ObjectKey,
    role: &ProjectRole,
    groups: &[String],
) -> StoreResult<bool> {
    let base = store.get_project(project_key).await?;
    let desired = project_role_entry(role, &base.meta.name, groups);

    let mut project = base.clone();
    let changed = match find_role(&project, &desired.name) {
        Some(index) if entries_equal(&project.spec.roles[index], &desired) => false,
        Some(index) => {
            project.spec.roles[index] = desired;
            true
        }
        None => {
            project.spec.roles.push(desired);
            true
        }
    };

    if changed {
        store.patch_project(project, &base).await?;
    }
    Ok(changed)
}

/// Remove the named entry from the project's role list. Absence of the
/// entry, or of the project itself, is a no-op.
pub async fn remove_project_role(
    store: &dyn ResourceStore,
    project_key: &ObjectKey,
    role_name: &str,
) -> StoreResult<()> {
    let base = match store.get_project(project_key).await {
        Ok(project) => project,
        Err(StoreError::NotFound(_)) => return Ok(()),
        Err(err) => return Err(err),
    };
    let Some(index) = find_role(&base, role_name) else {
        return Ok(());
    };
    let mut project = base.clone();
    project.spec.roles.remove(index);
    store.patch_project(project, &base).await?;
    Ok(())
}
