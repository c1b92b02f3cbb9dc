//! Merge engine for the shared policy ConfigMap.
//!
//! Desired state is computed as text, compared byte-for-byte against the
//! stored document, and written back in a single whole-document update only
//! when something drifted. Callers wrap every write path in
//! [`crate::store::retry_on_conflict`] because the document is shared by all
//! role and binding reconcilers.
use crate::model::{ConfigMap, ObjectKey, Role, RoleBinding};
use crate::store::{ResourceStore, StoreError, StoreResult};
use argonaut_policy::{
    BuiltinRole, DEFAULT_POLICY_CSV, POLICY_CSV_KEY, compile_binding_subjects, compile_role_policy,
    compile_rules, role_subject,
};

/// The overlay text for a role, with or without a bound binding. Without a
/// binding only the rule expansion is rendered; with one, the binding's
/// subject lines follow it.
pub fn desired_role_overlay(role: &Role, binding: Option<&RoleBinding>) -> String {
    match binding {
        Some(binding) => compile_role_policy(
            &role.meta.name,
            &role.spec.rules,
            &binding.spec.subjects,
        ),
        None => compile_rules(&role.spec.rules, &role_subject(&role.meta.name)),
    }
}

/// The overlay text for a binding that references a built-in role: only the
/// subject lines are rendered, the built-in's own rules are not re-expanded.
pub fn desired_builtin_overlay(binding: &RoleBinding, builtin: BuiltinRole) -> String {
    compile_binding_subjects(&binding.spec.subjects, builtin.name(), &builtin.rules())
}

fn ensure_entry(config_map: &mut ConfigMap, key: &str, desired: &str) -> bool {
    if config_map.data.get(key).map(String::as_str) != Some(desired) {
        config_map.data.insert(key.to_string(), desired.to_string());
        return true;
    }
    false
}

/// Bring the document's default entry and one overlay entry up to date.
/// Fetches the latest document, compares, and issues at most one write.
pub async fn apply_overlay(
    store: &dyn ResourceStore,
    config_map_key: &ObjectKey,
    overlay_key: &str,
    desired: &str,
) -> StoreResult<()> {
    let mut config_map = store.get_config_map(config_map_key).await?;
    let mut changed = ensure_entry(&mut config_map, POLICY_CSV_KEY, DEFAULT_POLICY_CSV);
    changed |= ensure_entry(&mut config_map, overlay_key, desired);
    if changed {
        tracing::debug!(key = %overlay_key, "policy document drifted, writing");
        store.update_config_map(config_map).await?;
    }
    Ok(())
}

/// Remove an overlay entry entirely. A missing document or a missing entry
/// is a no-op, not an error: teardown must be idempotent.
pub async fn remove_overlay(
    store: &dyn ResourceStore,
    config_map_key: &ObjectKey,
    overlay_key: &str,
) -> StoreResult<()> {
    let mut config_map = match store.get_config_map(config_map_key).await {
        Ok(config_map) => config_map,
        Err(StoreError::NotFound(_)) => return Ok(()),
        Err(err) => return Err(err),
    };
    if config_map.data.remove(overlay_key).is_some() {
        tracing::debug!(key = %overlay_key, "removing policy overlay");
        store.update_config_map(config_map).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::store::memory::InMemoryStore;
    use argonaut_policy::{ResourceKind, Rule, Subject};

    fn test_role() -> Role {
        Role::new(
            "default",
            "test-role",
            vec![Rule {
                resource: ResourceKind::Applications,
                verbs: vec!["get".to_string(), "list".to_string()],
                objects: vec!["*/*".to_string()],
            }],
        )
    }

    fn seeded_store() -> InMemoryStore {
        InMemoryStore::new()
    }

    async fn seed_config_map(store: &InMemoryStore) -> ObjectKey {
        let mut cm = ConfigMap::new("argocd", "argocd-rbac-cm");
        cm.data.insert(POLICY_CSV_KEY.to_string(), String::new());
        store.create_config_map(cm).await.expect("config map");
        ObjectKey::new("argocd", "argocd-rbac-cm")
    }

    #[test]
    fn overlay_without_binding_is_rules_only() {
        let overlay = desired_role_overlay(&test_role(), None);
        assert_eq!(
            overlay,
            "p, role:test-role, applications, get, */*, allow\n\
             p, role:test-role, applications, list, */*, allow\n"
        );
    }

    #[test]
    fn overlay_with_binding_appends_subjects() {
        let binding = RoleBinding::new(
            "default",
            "test-role-binding",
            "test-role",
            vec![Subject::Sso("gosha".to_string())],
        );
        let overlay = desired_role_overlay(&test_role(), Some(&binding));
        assert!(overlay.ends_with("g, gosha, role:test-role\n"));
    }

    #[test]
    fn builtin_overlay_has_no_rule_lines() {
        let binding = RoleBinding::new(
            "default",
            "test-role-binding",
            "admin",
            vec![Subject::Role("rb-role-test".to_string())],
        );
        let overlay = desired_builtin_overlay(&binding, BuiltinRole::Admin);
        assert_eq!(overlay, "g, role:rb-role-test, role:admin\n");
    }

    #[test]
    fn builtin_overlay_expands_local_subjects() {
        let binding = RoleBinding::new(
            "default",
            "test-role-binding",
            "readonly",
            vec![Subject::Local("localUser".to_string())],
        );
        let overlay = desired_builtin_overlay(&binding, BuiltinRole::ReadOnly);
        assert!(overlay.starts_with("p, localUser, applications, get, */*, allow\n"));
        assert!(!overlay.contains("g,"));
    }

    #[tokio::test]
    async fn apply_overlay_writes_once_then_settles() {
        let store = seeded_store();
        let cm_key = seed_config_map(&store).await;
        let overlay = desired_role_overlay(&test_role(), None);

        apply_overlay(&store, &cm_key, "policy.default.test-role.csv", &overlay)
            .await
            .expect("first apply");
        assert_eq!(store.config_map_writes(), 1);

        // Unchanged desired state must not issue another write.
        apply_overlay(&store, &cm_key, "policy.default.test-role.csv", &overlay)
            .await
            .expect("second apply");
        assert_eq!(store.config_map_writes(), 1);
    }

    #[tokio::test]
    async fn apply_overlay_restores_drifted_default_policy() {
        let store = seeded_store();
        let cm_key = seed_config_map(&store).await;
        let mut cm = store.get_config_map(&cm_key).await.expect("get");
        cm.data
            .insert(POLICY_CSV_KEY.to_string(), "test".to_string());
        store.update_config_map(cm).await.expect("drift");

        apply_overlay(&store, &cm_key, "policy.default.test-role.csv", "")
            .await
            .expect("apply");
        let cm = store.get_config_map(&cm_key).await.expect("get");
        assert_eq!(cm.data.get(POLICY_CSV_KEY).map(String::as_str), Some(""));
    }

    #[tokio::test]
    async fn remove_overlay_deletes_key_and_tolerates_absence() {
        let store = seeded_store();
        let cm_key = seed_config_map(&store).await;
        apply_overlay(&store, &cm_key, "policy.default.test-role.csv", "p, x\n")
            .await
            .expect("apply");

        remove_overlay(&store, &cm_key, "policy.default.test-role.csv")
            .await
            .expect("remove");
        let cm = store.get_config_map(&cm_key).await.expect("get");
        assert!(!cm.data.contains_key("policy.default.test-role.csv"));

        // Removing again, and removing against a missing document, are no-ops.
        remove_overlay(&store, &cm_key, "policy.default.test-role.csv")
            .await
            .expect("remove twice");
        remove_overlay(
            &store,
            &ObjectKey::new("argocd", "missing-cm"),
            "policy.default.test-role.csv",
        )
        .await
        .expect("missing document");
    }
}
