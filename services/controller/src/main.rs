//! RBAC controller entry point.
//!
//! # Purpose
//! Wires configuration, observability, the store, and the four reconcilers,
//! then runs a drift-poll driver until shutdown.
//!
//! # Notes
//! The driver stands in for an event-driven scheduler: it lists every
//! resource each tick and runs the reconciles that are due, honoring each
//! outcome's requeue delay. Reconcile errors are logged and retried on the
//! next tick.
use anyhow::Result;
use controller::config::ControllerConfig;
use controller::model::ObjectKey;
use controller::observability;
use controller::reconcile::{
    Outcome, ProjectRoleBindingReconciler, ProjectRoleReconciler, RoleBindingReconciler,
    RoleReconciler,
};
use controller::store::{ResourceStore, memory::InMemoryStore};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ControllerConfig::from_env_or_yaml().expect("controller config");
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

struct Reconcilers {
    role: RoleReconciler,
    role_binding: RoleBindingReconciler,
    project_role: ProjectRoleReconciler,
    project_role_binding: ProjectRoleBindingReconciler,
}

async fn run_with_shutdown<F>(config: ControllerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability();
    let store: Arc<dyn ResourceStore> = Arc::new(InMemoryStore::new());
    tracing::info!(backend = store.backend_name(), "controller starting");

    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let reconcilers = Reconcilers {
        role: RoleReconciler::new(store.clone(), config.policy_config_map.clone()),
        role_binding: RoleBindingReconciler::new(store.clone(), config.policy_config_map.clone()),
        project_role: ProjectRoleReconciler::new(store.clone()),
        project_role_binding: ProjectRoleBindingReconciler::new(store.clone()),
    };

    let mut next_due: HashMap<(&'static str, ObjectKey), Instant> = HashMap::new();
    let mut ticker = tokio::time::interval(config.resync_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_pass(store.as_ref(), &reconcilers, &mut next_due).await;
            }
            _ = &mut shutdown => break,
        }
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

/// One driver pass: reconcile every listed resource whose requeue delay has
/// elapsed, remembering the next due time each outcome asks for.
async fn run_pass(
    store: &dyn ResourceStore,
    reconcilers: &Reconcilers,
    next_due: &mut HashMap<(&'static str, ObjectKey), Instant>,
) {
    let now = Instant::now();
    let due = |next_due: &HashMap<(&'static str, ObjectKey), Instant>, slot: &(&'static str, ObjectKey)| {
        next_due.get(slot).is_none_or(|at| *at <= now)
    };
    let record =
        |next_due: &mut HashMap<(&'static str, ObjectKey), Instant>,
         slot: (&'static str, ObjectKey),
         result: anyhow::Result<Outcome>| {
            match result {
                Ok(outcome) => match outcome.requeue_after {
                    Some(delay) => {
                        next_due.insert(slot, now + delay);
                    }
                    None => {
                        next_due.remove(&slot);
                    }
                },
                Err(err) => {
                    // Retried on the next tick; the tick interval is the
                    // stand-in for the scheduler's backoff.
                    tracing::error!(kind = slot.0, name = %slot.1, error = %err, "reconcile failed");
                    next_due.remove(&slot);
                }
            }
        };

    match store.list_roles().await {
        Ok(roles) => {
            for role in roles {
                let slot = ("role", role.meta.key());
                if due(next_due, &slot) {
                    let result = reconcilers.role.reconcile(&slot.1).await;
                    record(next_due, slot, result);
                }
            }
        }
        Err(err) => tracing::error!(error = %err, "failed to list roles"),
    }

    match store.list_role_bindings().await {
        Ok(bindings) => {
            for binding in bindings {
                let slot = ("role_binding", binding.meta.key());
                if due(next_due, &slot) {
                    let result = reconcilers.role_binding.reconcile(&slot.1).await;
                    record(next_due, slot, result);
                }
            }
        }
        Err(err) => tracing::error!(error = %err, "failed to list role bindings"),
    }

    match store.list_project_roles().await {
        Ok(roles) => {
            for role in roles {
                let slot = ("project_role", role.meta.key());
                if due(next_due, &slot) {
                    let result = reconcilers.project_role.reconcile(&slot.1).await;
                    record(next_due, slot, result);
                }
            }
        }
        Err(err) => tracing::error!(error = %err, "failed to list project roles"),
    }

    match store.list_project_role_bindings().await {
        Ok(bindings) => {
            for binding in bindings {
                let slot = ("project_role_binding", binding.meta.key());
                if due(next_due, &slot) {
                    let result = reconcilers.project_role_binding.reconcile(&slot.1).await;
                    record(next_due, slot, result);
                }
            }
        }
        Err(err) => tracing::error!(error = %err, "failed to list project role bindings"),
    }
}
