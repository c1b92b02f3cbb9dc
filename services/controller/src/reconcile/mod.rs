//! Reconciliation logic: the four resource orchestrators plus the two
//! engines they drive (ConfigMap merge, project role patch).
//!
//! # Purpose
//! Each orchestrator follows the same finite-state shape: fetch the
//! resource, run finalizer teardown if it is terminating, attach the
//! finalizer if missing, resolve its counterpart, compile the desired policy
//! state, merge it into the shared store, then record status and choose the
//! next requeue delay.
//!
//! # Scheduler contract
//! `reconcile` returns `Ok(Outcome)` with an optional requeue delay, or an
//! error. Errors are the external scheduler's signal to back off and retry;
//! conflicts and missing dependencies are handled inline and never surface
//! as errors.
use argonaut_policy::ROLE_PREFIX;
use std::time::Duration;

pub mod configmap;
pub mod project;
pub mod project_role;
pub mod project_role_binding;
pub mod role;
pub mod role_binding;

pub use project_role::ProjectRoleReconciler;
pub use project_role_binding::ProjectRoleBindingReconciler;
pub use role::RoleReconciler;
pub use role_binding::RoleBindingReconciler;

/// Requeue after a write conflict that outlived its in-place retries.
pub const CONFLICT_REQUEUE: Duration = Duration::from_secs(1);
/// Requeue after clearing a back-reference to a vanished binding.
pub const BINDING_GONE_REQUEUE: Duration = Duration::from_secs(120);
/// Idle drift-correction interval for project roles.
pub const PROJECT_ROLE_IDLE_REQUEUE: Duration = Duration::from_secs(300);
/// Idle drift-correction interval for everything else.
pub const IDLE_REQUEUE: Duration = Duration::from_secs(600);
/// Self-requeue after attaching the project-role finalizer.
pub const FINALIZER_ADDED_REQUEUE: Duration = Duration::from_secs(1);

/// Result of one reconcile invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub requeue_after: Option<Duration>,
}

impl Outcome {
    /// Finished; no automatic requeue beyond the watch stream.
    pub fn done() -> Self {
        Self {
            requeue_after: None,
        }
    }

    /// Finished; ask the scheduler to run again after `delay`.
    pub fn requeue_after(delay: Duration) -> Self {
        Self {
            requeue_after: Some(delay),
        }
    }
}

/// Reject names that collide with the policy language's reserved role
/// marker. A `role:`-prefixed name would alias an arbitrary role once
/// compiled, so bindings carrying one are refused outright.
pub fn validate_unprefixed(name: &str, what: &str) -> anyhow::Result<()> {
    if name.starts_with(ROLE_PREFIX) {
        anyhow::bail!("{what} {name:?} must not start with the reserved {ROLE_PREFIX:?} prefix");
    }
    Ok(())
}
