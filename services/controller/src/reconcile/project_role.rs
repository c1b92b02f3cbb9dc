use super::project::remove_project_role;
use super::{
    BINDING_GONE_REQUEUE, CONFLICT_REQUEUE, FINALIZER_ADDED_REQUEUE, Outcome,
    PROJECT_ROLE_IDLE_REQUEUE,
};
use crate::model::{ObjectKey, PROJECT_ROLE_FINALIZER, ProjectRole, deleting, reconcile_error};
use crate::store::{ResourceStore, StoreError};
use anyhow::Context;
use std::sync::Arc;

/// Drives a ProjectRole's lifecycle. Compilation into projects happens in
/// the binding reconciler; this one keeps the back-reference honest and owns
/// teardown of compiled entries when the role itself is deleted.
pub struct ProjectRoleReconciler {
    store: Arc<dyn ResourceStore>,
}

impl ProjectRoleReconciler {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> anyhow::Result<Outcome> {
        tracing::info!(name = %key, "reconciling project role");

        let mut role = match self.store.get_project_role(key).await {
            Ok(role) => role,
            Err(StoreError::NotFound(_)) => {
                tracing::info!(name = %key, "project role not found, skipping reconcile");
                return Ok(Outcome::done());
            }
            Err(err) => return Err(err).context("fetching project role"),
        };

        if role.meta.is_being_deleted() {
            return self.handle_finalizer(role).await;
        }

        if !role.meta.has_finalizer(PROJECT_ROLE_FINALIZER) {
            role.meta.add_finalizer(PROJECT_ROLE_FINALIZER);
            if let Err(err) = self.store.update_project_role(role.clone()).await {
                role.set_conditions([deleting().with_message(err.to_string())]);
                self.persist_status(&role).await;
                return Err(err).context("adding project role finalizer");
            }
            return Ok(Outcome::requeue_after(FINALIZER_ADDED_REQUEUE));
        }

        if role.has_project_role_binding_ref() {
            let binding_name = role
                .status
                .project_role_binding_ref
                .clone()
                .unwrap_or_default();
            let binding_key = ObjectKey::new(key.namespace.clone(), binding_name.clone());
            match self.store.get_project_role_binding(&binding_key).await {
                Ok(_) => {}
                Err(StoreError::NotFound(_)) => {
                    tracing::info!(name = %binding_name, "bound project role binding vanished, clearing reference");
                    role.status.project_role_binding_ref = None;
                    role.set_conditions([reconcile_error(format!(
                        "ProjectRoleBinding {binding_name} not found"
                    ))]);
                    self.persist_status(&role).await;
                    return Ok(Outcome::requeue_after(BINDING_GONE_REQUEUE));
                }
                Err(err) => {
                    role.set_conditions([reconcile_error(err.to_string())]);
                    self.persist_status(&role).await;
                    return Err(err).context("fetching bound project role binding");
                }
            }
        }

        metrics::counter!("argonaut_reconciles_total", "kind" => "project_role").increment(1);
        Ok(Outcome::requeue_after(PROJECT_ROLE_IDLE_REQUEUE))
    }

    /// Teardown: remove the compiled entry from every project the bound
    /// binding targets, then release the finalizer. Idempotent; may run
    /// multiple times before the final update lands.
    async fn handle_finalizer(&self, mut role: ProjectRole) -> anyhow::Result<Outcome> {
        if !role.meta.has_finalizer(PROJECT_ROLE_FINALIZER) {
            return Ok(Outcome::done());
        }

        if role.has_project_role_binding_ref() {
            let binding_name = role
                .status
                .project_role_binding_ref
                .clone()
                .unwrap_or_default();
            let binding_key = ObjectKey::new(role.meta.namespace.clone(), binding_name);
            match self.store.get_project_role_binding(&binding_key).await {
                Ok(binding) => {
                    for subject in &binding.spec.subjects {
                        let project_key =
                            ObjectKey::new(role.meta.namespace.clone(), subject.project_ref.clone());
                        match remove_project_role(
                            self.store.as_ref(),
                            &project_key,
                            &role.meta.name,
                        )
                        .await
                        {
                            Ok(()) => {}
                            Err(err) if err.is_conflict() => {
                                tracing::info!(project = %project_key, "conflict while removing project role, requeuing");
                                return Ok(Outcome::requeue_after(CONFLICT_REQUEUE));
                            }
                            Err(err) => {
                                role.set_conditions([deleting().with_message(err.to_string())]);
                                self.persist_status(&role).await;
                                return Err(err).context("removing role from project");
                            }
                        }
                    }
                }
                // Binding already gone: nothing left to clean up.
                Err(StoreError::NotFound(_)) => {}
                Err(err) => {
                    role.set_conditions([deleting().with_message(err.to_string())]);
                    self.persist_status(&role).await;
                    return Err(err).context("fetching bound project role binding");
                }
            }
        }

        role.meta.remove_finalizer(PROJECT_ROLE_FINALIZER);
        match self.store.update_project_role(role.clone()).await {
            Ok(_) => Ok(Outcome::done()),
            Err(err) if err.is_conflict() => Ok(Outcome::requeue_after(CONFLICT_REQUEUE)),
            Err(err) => {
                role.set_conditions([deleting().with_message(err.to_string())]);
                self.persist_status(&role).await;
                Err(err).context("removing project role finalizer")
            }
        }
    }

    async fn persist_status(&self, role: &ProjectRole) {
        if let Err(err) = self.store.update_project_role_status(role).await {
            tracing::error!(name = %role.meta.key(), error = %err, "failed to update project role status");
        }
    }
}
