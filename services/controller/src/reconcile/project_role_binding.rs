use super::project::{remove_project_role, upsert_project_role};
use super::{CONFLICT_REQUEUE, IDLE_REQUEUE, Outcome, validate_unprefixed};
use crate::model::{
    ObjectKey, PROJECT_ROLE_BINDING_FINALIZER, ProjectRoleBinding, deleting, pending,
    reconcile_error, reconcile_success,
};
use crate::store::{ResourceStore, StoreError};
use anyhow::Context;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Drives a ProjectRoleBinding toward compiled role entries on every subject
/// project, including removal of entries from projects that dropped out of
/// the subject list.
pub struct ProjectRoleBindingReconciler {
    store: Arc<dyn ResourceStore>,
}

impl ProjectRoleBindingReconciler {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> anyhow::Result<Outcome> {
        tracing::info!(name = %key, "reconciling project role binding");

        let mut binding = match self.store.get_project_role_binding(key).await {
            Ok(binding) => binding,
            Err(StoreError::NotFound(_)) => {
                tracing::info!(name = %key, "project role binding not found, skipping reconcile");
                return Ok(Outcome::done());
            }
            Err(err) => return Err(err).context("fetching project role binding"),
        };

        if binding.meta.is_being_deleted() {
            return self.handle_finalizer(binding).await;
        }

        if !binding.meta.has_finalizer(PROJECT_ROLE_BINDING_FINALIZER) {
            binding.meta.add_finalizer(PROJECT_ROLE_BINDING_FINALIZER);
            if let Err(err) = self.store.update_project_role_binding(binding.clone()).await {
                binding.set_conditions([deleting().with_message(err.to_string())]);
                self.persist_status(&binding).await;
                return Err(err).context("adding project role binding finalizer");
            }
            return Ok(Outcome::done());
        }

        if let Err(err) = validate_unprefixed(&binding.spec.role_ref.name, "role reference") {
            binding.set_conditions([reconcile_error(err.to_string())]);
            self.persist_status(&binding).await;
            tracing::warn!(name = %key, error = %err, "rejecting project role binding");
            return Ok(Outcome::done());
        }

        let role_name = binding.spec.role_ref.name.clone();
        let role_key = ObjectKey::new(key.namespace.clone(), role_name.clone());
        let mut role = match self.store.get_project_role(&role_key).await {
            Ok(role) => role,
            Err(StoreError::NotFound(_)) => {
                tracing::info!(name = %role_name, "referenced project role not found, skipping reconcile");
                binding.set_conditions([reconcile_error(format!(
                    "ProjectRole {role_name} not found"
                ))]);
                self.persist_status(&binding).await;
                return Ok(Outcome::done());
            }
            Err(err) => {
                binding.set_conditions([reconcile_error(err.to_string())]);
                self.persist_status(&binding).await;
                return Err(err).context("fetching referenced project role");
            }
        };

        if !role.has_project_role_binding_ref() {
            role.status.project_role_binding_ref = Some(binding.meta.name.clone());
            if let Err(err) = self.store.update_project_role_status(&role).await {
                tracing::error!(name = %role.meta.key(), error = %err, "failed to set project role binding reference");
            }
        }

        // Later entries win when a project appears twice in the subject list.
        let subject_set: BTreeMap<String, Vec<String>> = binding
            .spec
            .subjects
            .iter()
            .map(|subject| (subject.project_ref.clone(), subject.groups.clone()))
            .collect();

        // Set difference: projects recorded as bound but no longer named by
        // any subject lose their compiled entry.
        for bound in binding.status.projects_bound.clone() {
            if subject_set.contains_key(&bound) {
                continue;
            }
            let project_key = ObjectKey::new(key.namespace.clone(), bound.clone());
            match self.store.get_project(&project_key).await {
                Ok(_) => {}
                Err(StoreError::NotFound(_)) => {
                    // The project itself is gone; nothing left to clean.
                    tracing::info!(project = %bound, "bound project no longer exists, dropping from status");
                    binding.status.projects_bound.retain(|name| name != &bound);
                    continue;
                }
                Err(err) => {
                    binding.set_conditions([reconcile_error(err.to_string())]);
                    self.persist_status(&binding).await;
                    return Err(err).context("fetching previously bound project");
                }
            }
            tracing::info!(project = %bound, role = %role_name, "removing role from project");
            match remove_project_role(self.store.as_ref(), &project_key, &role_name).await {
                Ok(()) => {
                    binding.status.projects_bound.retain(|name| name != &bound);
                }
                Err(err) if err.is_conflict() => {
                    tracing::info!(project = %bound, "conflict while patching project, requeuing");
                    return Ok(Outcome::requeue_after(CONFLICT_REQUEUE));
                }
                Err(err) => {
                    binding.set_conditions([reconcile_error(err.to_string())]);
                    self.persist_status(&binding).await;
                    return Err(err).context("removing role from project");
                }
            }
        }
        self.persist_status(&binding).await;

        let mut missing = Vec::new();
        for (project_ref, groups) in &subject_set {
            let project_key = ObjectKey::new(key.namespace.clone(), project_ref.clone());
            match self.store.get_project(&project_key).await {
                Ok(_) => {}
                Err(StoreError::NotFound(_)) => {
                    // One missing project must not block the rest.
                    binding
                        .set_conditions([pending(format!("Project {project_ref} not found"))]);
                    self.persist_status(&binding).await;
                    missing.push(project_ref.clone());
                    continue;
                }
                Err(err) => {
                    binding.set_conditions([reconcile_error(err.to_string())]);
                    self.persist_status(&binding).await;
                    return Err(err).context("fetching subject project");
                }
            }
            match upsert_project_role(self.store.as_ref(), &project_key, &role, groups).await {
                Ok(changed) => {
                    if changed {
                        tracing::info!(project = %project_ref, role = %role_name, "project patched");
                    }
                }
                Err(err) if err.is_conflict() => {
                    tracing::info!(project = %project_ref, "conflict while patching project, requeuing");
                    return Ok(Outcome::requeue_after(CONFLICT_REQUEUE));
                }
                Err(err) => {
                    binding.set_conditions([reconcile_error(err.to_string())]);
                    self.persist_status(&binding).await;
                    return Err(err).context("patching subject project");
                }
            }
            if !binding.status.projects_bound.iter().any(|name| name == project_ref) {
                binding.status.projects_bound.push(project_ref.clone());
                self.persist_status(&binding).await;
            }
        }

        if missing.is_empty() {
            binding.set_conditions(
                [reconcile_success().with_observed_generation(binding.meta.generation)],
            );
            self.persist_status(&binding).await;
        }
        metrics::counter!("argonaut_reconciles_total", "kind" => "project_role_binding")
            .increment(1);
        Ok(Outcome::requeue_after(IDLE_REQUEUE))
    }

    /// Teardown: remove the compiled entry from every subject project, then
    /// release the finalizer. Missing projects are skipped.
    async fn handle_finalizer(&self, mut binding: ProjectRoleBinding) -> anyhow::Result<Outcome> {
        if !binding.meta.has_finalizer(PROJECT_ROLE_BINDING_FINALIZER) {
            return Ok(Outcome::done());
        }

        let role_name = binding.spec.role_ref.name.clone();
        for subject in &binding.spec.subjects {
            let project_key =
                ObjectKey::new(binding.meta.namespace.clone(), subject.project_ref.clone());
            match remove_project_role(self.store.as_ref(), &project_key, &role_name).await {
                Ok(()) => {}
                Err(err) if err.is_conflict() => {
                    tracing::info!(project = %project_key, "conflict while removing project role, requeuing");
                    return Ok(Outcome::requeue_after(CONFLICT_REQUEUE));
                }
                Err(err) => {
                    binding.set_conditions([deleting().with_message(err.to_string())]);
                    self.persist_status(&binding).await;
                    return Err(err).context("removing role from project");
                }
            }
        }

        binding.meta.remove_finalizer(PROJECT_ROLE_BINDING_FINALIZER);
        match self.store.update_project_role_binding(binding.clone()).await {
            Ok(_) => Ok(Outcome::done()),
            Err(err) if err.is_conflict() => Ok(Outcome::requeue_after(CONFLICT_REQUEUE)),
            Err(err) => {
                binding.set_conditions([deleting().with_message(err.to_string())]);
                self.persist_status(&binding).await;
                Err(err).context("removing project role binding finalizer")
            }
        }
    }

    async fn persist_status(&self, binding: &ProjectRoleBinding) {
        if let Err(err) = self.store.update_project_role_binding_status(binding).await {
            tracing::error!(name = %binding.meta.key(), error = %err, "failed to update project role binding status");
        }
    }
}
