use super::meta::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The shared string-keyed policy document. `policy.csv` holds the default
/// policy; `policy.<namespace>.<role>.csv` keys hold per-role overlays.
/// Shared and mutated by every role/binding reconcile, so all writes go
/// through optimistic-concurrency retry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigMap {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ConfigMap {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            data: BTreeMap::new(),
        }
    }
}
