use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A condition type a resource can report. At most one condition of each
/// type may be present at any point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    /// The resource is believed ready to handle work.
    Ready,
    /// The resource is believed in sync with the policy state derived from it.
    Synced,
    /// The resource is waiting on a dependency that does not exist yet.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// The reason a resource entered its current condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionReason {
    ReconcileSuccess,
    ReconcileError,
    Deleting,
}

/// A condition that may apply to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: ConditionType,
    pub status: ConditionStatus,
    pub reason: ConditionReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_transition_time: DateTime<Utc>,
    #[serde(default)]
    pub observed_generation: i64,
}

impl Condition {
    /// True when the conditions match, ignoring the transition time and the
    /// observed generation.
    pub fn equal(&self, other: &Condition) -> bool {
        self.r#type == other.r#type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_observed_generation(mut self, generation: i64) -> Self {
        self.observed_generation = generation;
        self
    }
}

/// The resource is currently being deleted.
pub fn deleting() -> Condition {
    Condition {
        r#type: ConditionType::Ready,
        status: ConditionStatus::False,
        reason: ConditionReason::Deleting,
        message: None,
        last_transition_time: Utc::now(),
        observed_generation: 0,
    }
}

/// The resource is waiting on a missing dependency.
pub fn pending(message: impl Into<String>) -> Condition {
    Condition {
        r#type: ConditionType::Pending,
        status: ConditionStatus::False,
        reason: ConditionReason::ReconcileError,
        message: Some(message.into()),
        last_transition_time: Utc::now(),
        observed_generation: 0,
    }
}

/// The most recent reconciliation completed successfully.
pub fn reconcile_success() -> Condition {
    Condition {
        r#type: ConditionType::Synced,
        status: ConditionStatus::True,
        reason: ConditionReason::ReconcileSuccess,
        message: None,
        last_transition_time: Utc::now(),
        observed_generation: 0,
    }
}

/// The most recent reconciliation failed; the message carries the error text.
pub fn reconcile_error(message: impl Into<String>) -> Condition {
    Condition {
        r#type: ConditionType::Synced,
        status: ConditionStatus::False,
        reason: ConditionReason::ReconcileError,
        message: Some(message.into()),
        last_transition_time: Utc::now(),
        observed_generation: 0,
    }
}

/// Merge incoming conditions into the existing set, replacing any existing
/// condition of the same type. Identical conditions (ignoring transition
/// time) are left untouched except that the observed generation advances if
/// the incoming one is higher.
pub fn set_conditions(existing: &mut Vec<Condition>, incoming: impl IntoIterator<Item = Condition>) {
    for new in incoming {
        let mut exists = false;
        for current in existing.iter_mut() {
            if current.r#type != new.r#type {
                continue;
            }
            exists = true;
            if current.equal(&new) {
                if current.observed_generation < new.observed_generation {
                    current.observed_generation = new.observed_generation;
                }
            } else {
                *current = new.clone();
            }
        }
        if !exists {
            existing.push(new);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_conditions_replaces_same_type() {
        let mut conditions = Vec::new();
        set_conditions(&mut conditions, [reconcile_success()]);
        assert_eq!(conditions.len(), 1);

        set_conditions(&mut conditions, [reconcile_error("boom")]);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, ConditionStatus::False);
        assert_eq!(conditions[0].message.as_deref(), Some("boom"));
    }

    #[test]
    fn identical_condition_keeps_existing_entry() {
        let mut conditions = Vec::new();
        set_conditions(&mut conditions, [reconcile_success()]);
        let first_transition = conditions[0].last_transition_time;

        set_conditions(&mut conditions, [reconcile_success()]);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, first_transition);
    }

    #[test]
    fn observed_generation_only_advances() {
        let mut conditions = Vec::new();
        set_conditions(&mut conditions, [reconcile_success().with_observed_generation(3)]);
        set_conditions(&mut conditions, [reconcile_success().with_observed_generation(2)]);
        assert_eq!(conditions[0].observed_generation, 3);

        set_conditions(&mut conditions, [reconcile_success().with_observed_generation(5)]);
        assert_eq!(conditions[0].observed_generation, 5);
    }

    #[test]
    fn distinct_types_coexist() {
        let mut conditions = Vec::new();
        set_conditions(&mut conditions, [reconcile_success()]);
        set_conditions(&mut conditions, [pending("Project project-b not found")]);
        set_conditions(&mut conditions, [deleting()]);
        assert_eq!(conditions.len(), 3);
    }
}
