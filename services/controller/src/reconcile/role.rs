use super::configmap::{self, desired_role_overlay};
use super::{BINDING_GONE_REQUEUE, CONFLICT_REQUEUE, IDLE_REQUEUE, Outcome};
use crate::model::{ObjectKey, ROLE_FINALIZER, Role, deleting, pending, reconcile_error, reconcile_success};
use crate::store::{DEFAULT_RETRY_ATTEMPTS, ResourceStore, StoreError, retry_on_conflict};
use anyhow::Context;
use std::sync::Arc;

/// Drives a global Role toward its overlay entry in the shared policy
/// ConfigMap.
pub struct RoleReconciler {
    store: Arc<dyn ResourceStore>,
    config_map_key: ObjectKey,
}

impl RoleReconciler {
    pub fn new(store: Arc<dyn ResourceStore>, config_map_key: ObjectKey) -> Self {
        Self {
            store,
            config_map_key,
        }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> anyhow::Result<Outcome> {
        tracing::info!(name = %key, "reconciling role");

        let mut role = match self.store.get_role(key).await {
            Ok(role) => role,
            Err(StoreError::NotFound(_)) => {
                tracing::info!(name = %key, "role not found, skipping reconcile");
                return Ok(Outcome::done());
            }
            Err(err) => return Err(err).context("fetching role"),
        };

        if role.meta.is_being_deleted() {
            return self.handle_finalizer(role).await;
        }

        if !role.meta.has_finalizer(ROLE_FINALIZER) {
            role.meta.add_finalizer(ROLE_FINALIZER);
            if let Err(err) = self.store.update_role(role.clone()).await {
                role.set_conditions([deleting().with_message(err.to_string())]);
                self.persist_status(&role).await;
                return Err(err).context("adding role finalizer");
            }
            // The resulting update event re-triggers reconciliation.
            return Ok(Outcome::done());
        }

        if let Err(err) = self.store.get_config_map(&self.config_map_key).await {
            if err.is_not_found() {
                let message = format!("ConfigMap {} not found", self.config_map_key);
                role.set_conditions([pending(message.clone())]);
                self.persist_status(&role).await;
                anyhow::bail!(message);
            }
            role.set_conditions([reconcile_error(err.to_string())]);
            self.persist_status(&role).await;
            return Err(err).context("fetching policy config map");
        }

        let binding = if role.has_role_binding_ref() {
            let binding_name = role.status.role_binding_ref.clone().unwrap_or_default();
            let binding_key = ObjectKey::new(key.namespace.clone(), binding_name.clone());
            match self.store.get_role_binding(&binding_key).await {
                Ok(binding) => Some(binding),
                Err(StoreError::NotFound(_)) => {
                    // The binding vanished; drop the stale back-reference and
                    // come back soon to rewrite the overlay without subjects.
                    tracing::info!(name = %binding_name, "bound role binding vanished, clearing reference");
                    role.status.role_binding_ref = None;
                    role.set_conditions([reconcile_error(format!(
                        "RoleBinding {binding_name} not found"
                    ))]);
                    self.persist_status(&role).await;
                    return Ok(Outcome::requeue_after(BINDING_GONE_REQUEUE));
                }
                Err(err) => {
                    role.set_conditions([reconcile_error(err.to_string())]);
                    self.persist_status(&role).await;
                    return Err(err).context("fetching bound role binding");
                }
            }
        } else {
            None
        };

        let overlay_key = argonaut_policy::overlay_key(&key.namespace, &key.name);
        let desired = desired_role_overlay(&role, binding.as_ref());
        let store = self.store.as_ref();
        let config_map_key = &self.config_map_key;
        let (overlay_ref, desired_ref) = (overlay_key.as_str(), desired.as_str());
        let result = retry_on_conflict(DEFAULT_RETRY_ATTEMPTS, move || {
            configmap::apply_overlay(store, config_map_key, overlay_ref, desired_ref)
        })
        .await;
        match result {
            Ok(()) => {}
            Err(err) if err.is_conflict() => {
                tracing::info!(name = %key, "conflict while updating policy document, requeuing");
                return Ok(Outcome::requeue_after(CONFLICT_REQUEUE));
            }
            Err(err) => {
                role.set_conditions([reconcile_error(err.to_string())]);
                self.persist_status(&role).await;
                return Err(err).context("reconciling policy config map");
            }
        }

        role.set_conditions([reconcile_success().with_observed_generation(role.meta.generation)]);
        self.persist_status(&role).await;
        metrics::counter!("argonaut_reconciles_total", "kind" => "role").increment(1);
        Ok(Outcome::requeue_after(IDLE_REQUEUE))
    }

    async fn handle_finalizer(&self, mut role: Role) -> anyhow::Result<Outcome> {
        if !role.meta.has_finalizer(ROLE_FINALIZER) {
            return Ok(Outcome::done());
        }

        let overlay_key = argonaut_policy::overlay_key(&role.meta.namespace, &role.meta.name);
        let store = self.store.as_ref();
        let config_map_key = &self.config_map_key;
        let overlay_ref = overlay_key.as_str();
        let result = retry_on_conflict(DEFAULT_RETRY_ATTEMPTS, move || {
            configmap::remove_overlay(store, config_map_key, overlay_ref)
        })
        .await;
        match result {
            Ok(()) => {}
            Err(err) if err.is_conflict() => {
                tracing::info!(name = %role.meta.key(), "conflict while handling role finalizer, requeuing");
                return Ok(Outcome::requeue_after(CONFLICT_REQUEUE));
            }
            Err(err) => {
                role.set_conditions([deleting().with_message(err.to_string())]);
                self.persist_status(&role).await;
                return Err(err).context("removing role policy overlay");
            }
        }

        role.meta.remove_finalizer(ROLE_FINALIZER);
        match self.store.update_role(role.clone()).await {
            Ok(_) => Ok(Outcome::done()),
            Err(err) if err.is_conflict() => Ok(Outcome::requeue_after(CONFLICT_REQUEUE)),
            Err(err) => {
                role.set_conditions([deleting().with_message(err.to_string())]);
                self.persist_status(&role).await;
                Err(err).context("removing role finalizer")
            }
        }
    }

    async fn persist_status(&self, role: &Role) {
        if let Err(err) = self.store.update_role_status(role).await {
            tracing::error!(name = %role.meta.key(), error = %err, "failed to update role status");
        }
    }
}
