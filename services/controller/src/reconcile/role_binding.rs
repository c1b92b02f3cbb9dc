use super::configmap::{self, desired_builtin_overlay, desired_role_overlay};
use super::{CONFLICT_REQUEUE, IDLE_REQUEUE, Outcome, validate_unprefixed};
use crate::model::{
    ObjectKey, ROLE_BINDING_FINALIZER, RoleBinding, deleting, pending, reconcile_error,
    reconcile_success,
};
use crate::store::{DEFAULT_RETRY_ATTEMPTS, ResourceStore, StoreError, retry_on_conflict};
use anyhow::Context;
use argonaut_policy::BuiltinRole;
use std::sync::Arc;

/// Drives a RoleBinding toward the overlay entry of the role it grants,
/// including the two reserved built-in roles that have no stored Role.
pub struct RoleBindingReconciler {
    store: Arc<dyn ResourceStore>,
    config_map_key: ObjectKey,
}

impl RoleBindingReconciler {
    pub fn new(store: Arc<dyn ResourceStore>, config_map_key: ObjectKey) -> Self {
        Self {
            store,
            config_map_key,
        }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> anyhow::Result<Outcome> {
        tracing::info!(name = %key, "reconciling role binding");

        let mut binding = match self.store.get_role_binding(key).await {
            Ok(binding) => binding,
            Err(StoreError::NotFound(_)) => {
                tracing::info!(name = %key, "role binding not found, skipping reconcile");
                return Ok(Outcome::done());
            }
            Err(err) => return Err(err).context("fetching role binding"),
        };

        if binding.meta.is_being_deleted() {
            return self.handle_finalizer(binding).await;
        }

        if !binding.meta.has_finalizer(ROLE_BINDING_FINALIZER) {
            binding.meta.add_finalizer(ROLE_BINDING_FINALIZER);
            if let Err(err) = self.store.update_role_binding(binding.clone()).await {
                binding.set_conditions([deleting().with_message(err.to_string())]);
                self.persist_status(&binding).await;
                return Err(err).context("adding role binding finalizer");
            }
            return Ok(Outcome::done());
        }

        if let Err(err) = self.validate(&binding) {
            // A reserved-prefix name can never compile into valid policy;
            // surface it on the binding and stop without retrying.
            binding.set_conditions([reconcile_error(err.to_string())]);
            self.persist_status(&binding).await;
            tracing::warn!(name = %key, error = %err, "rejecting role binding");
            return Ok(Outcome::done());
        }

        if let Err(err) = self.store.get_config_map(&self.config_map_key).await {
            if err.is_not_found() {
                let message = format!("ConfigMap {} not found", self.config_map_key);
                binding.set_conditions([pending(message.clone())]);
                self.persist_status(&binding).await;
                anyhow::bail!(message);
            }
            binding.set_conditions([reconcile_error(err.to_string())]);
            self.persist_status(&binding).await;
            return Err(err).context("fetching policy config map");
        }

        let role_name = binding.spec.role_ref.name.clone();
        let (overlay_key, desired) = match BuiltinRole::resolve(&role_name) {
            Some(builtin) => {
                // Built-ins key on the binding's own namespace and render
                // only the subject lines.
                let overlay_key = argonaut_policy::overlay_key(&key.namespace, builtin.name());
                (overlay_key, desired_builtin_overlay(&binding, builtin))
            }
            None => {
                let role_key = ObjectKey::new(key.namespace.clone(), role_name.clone());
                let mut role = match self.store.get_role(&role_key).await {
                    Ok(role) => role,
                    Err(StoreError::NotFound(_)) => {
                        tracing::info!(name = %role_name, "referenced role not found, skipping reconcile");
                        return Ok(Outcome::done());
                    }
                    Err(err) => {
                        binding.set_conditions([reconcile_error(err.to_string())]);
                        self.persist_status(&binding).await;
                        return Err(err).context("fetching referenced role");
                    }
                };
                let overlay_key =
                    argonaut_policy::overlay_key(&role.meta.namespace, &role.meta.name);
                let desired = desired_role_overlay(&role, Some(&binding));
                if !role.has_role_binding_ref() {
                    role.status.role_binding_ref = Some(binding.meta.name.clone());
                    if let Err(err) = self.store.update_role_status(&role).await {
                        tracing::error!(name = %role.meta.key(), error = %err, "failed to set role binding reference");
                    }
                }
                (overlay_key, desired)
            }
        };

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
                binding.set_conditions([reconcile_error(err.to_string())]);
                self.persist_status(&binding).await;
                return Err(err).context("reconciling policy config map");
            }
        }

        binding
            .set_conditions([reconcile_success().with_observed_generation(binding.meta.generation)]);
        self.persist_status(&binding).await;
        metrics::counter!("argonaut_reconciles_total", "kind" => "role_binding").increment(1);
        Ok(Outcome::requeue_after(IDLE_REQUEUE))
    }

    fn validate(&self, binding: &RoleBinding) -> anyhow::Result<()> {
        validate_unprefixed(&binding.spec.role_ref.name, "role reference")?;
        for subject in &binding.spec.subjects {
            validate_unprefixed(subject.name(), "subject")?;
        }
        Ok(())
    }

    /// Teardown: a built-in binding owns its overlay key and removes it; a
    /// regular binding only clears the role's back-reference, leaving the
    /// role's next reconcile to rewrite the overlay without subject lines.
    async fn handle_finalizer(&self, mut binding: RoleBinding) -> anyhow::Result<Outcome> {
        if !binding.meta.has_finalizer(ROLE_BINDING_FINALIZER) {
            return Ok(Outcome::done());
        }

        let role_name = binding.spec.role_ref.name.clone();
        if let Some(builtin) = BuiltinRole::resolve(&role_name) {
            let overlay_key =
                argonaut_policy::overlay_key(&binding.meta.namespace, builtin.name());
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
                    return Ok(Outcome::requeue_after(CONFLICT_REQUEUE));
                }
                Err(err) => {
                    binding.set_conditions([deleting().with_message(err.to_string())]);
                    self.persist_status(&binding).await;
                    return Err(err).context("removing built-in policy overlay");
                }
            }
        } else {
            let role_key = ObjectKey::new(binding.meta.namespace.clone(), role_name);
            match self.store.get_role(&role_key).await {
                Ok(mut role) => {
                    role.status.role_binding_ref = None;
                    if let Err(err) = self.store.update_role_status(&role).await {
                        binding.set_conditions([deleting().with_message(err.to_string())]);
                        self.persist_status(&binding).await;
                        return Err(err).context("clearing role binding reference");
                    }
                }
                Err(StoreError::NotFound(_)) => {}
                Err(err) => {
                    binding.set_conditions([deleting().with_message(err.to_string())]);
                    self.persist_status(&binding).await;
                    return Err(err).context("fetching referenced role");
                }
            }
        }

        binding.meta.remove_finalizer(ROLE_BINDING_FINALIZER);
        match self.store.update_role_binding(binding.clone()).await {
            Ok(_) => Ok(Outcome::done()),
            Err(err) if err.is_conflict() => Ok(Outcome::requeue_after(CONFLICT_REQUEUE)),
            Err(err) => {
                binding.set_conditions([deleting().with_message(err.to_string())]);
                self.persist_status(&binding).await;
                Err(err).context("removing role binding finalizer")
            }
        }
    }

    async fn persist_status(&self, binding: &RoleBinding) {
        if let Err(err) = self.store.update_role_binding_status(binding).await {
            tracing::error!(name = %binding.meta.key(), error = %err, "failed to update role binding status");
        }
    }
}
