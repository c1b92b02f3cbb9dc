//! Shared fixtures for the reconciler integration tests.
#![allow(dead_code)]
use argonaut_policy::{
    ProjectResourceKind, ProjectRule, ProjectSubject, ResourceKind, Rule, Subject,
};
use controller::model::{ConfigMap, ObjectKey, Project, ProjectRole, ProjectRoleBinding, Role, RoleBinding};
use controller::reconcile::{
    ProjectRoleBindingReconciler, ProjectRoleReconciler, RoleBindingReconciler, RoleReconciler,
};
use controller::store::ResourceStore;
use controller::store::memory::InMemoryStore;
use std::sync::Arc;

pub const TEST_NAMESPACE: &str = "default";
pub const RBAC_CM_NAMESPACE: &str = "argocd";
pub const RBAC_CM_NAME: &str = "argocd-rbac-cm";

pub const TEST_ROLE_NAME: &str = "test-role";
pub const TEST_ROLE_BINDING_NAME: &str = "test-role-binding";

pub fn config_map_key() -> ObjectKey {
    ObjectKey::new(RBAC_CM_NAMESPACE, RBAC_CM_NAME)
}

pub fn test_role() -> Role {
    Role::new(
        TEST_NAMESPACE,
        TEST_ROLE_NAME,
        vec![Rule {
            resource: ResourceKind::Applications,
            verbs: vec!["get".to_string(), "list".to_string()],
            objects: vec!["*/*".to_string()],
        }],
    )
}

pub fn role_binding_with_subject(subject: Subject) -> RoleBinding {
    RoleBinding::new(
        TEST_NAMESPACE,
        TEST_ROLE_BINDING_NAME,
        TEST_ROLE_NAME,
        vec![subject],
    )
}

pub fn role_binding_for_builtin(role_name: &str) -> RoleBinding {
    RoleBinding::new(
        TEST_NAMESPACE,
        TEST_ROLE_BINDING_NAME,
        role_name,
        vec![Subject::Role("rb-role-test".to_string())],
    )
}

pub fn test_project_role() -> ProjectRole {
    ProjectRole::new(
        TEST_NAMESPACE,
        "dev",
        "developer access",
        vec![ProjectRule {
            resource: ProjectResourceKind::Applications,
            verbs: vec!["get".to_string(), "sync".to_string()],
            objects: vec!["*".to_string()],
        }],
    )
}

pub fn test_project_role_binding(subjects: Vec<(&str, Vec<&str>)>) -> ProjectRoleBinding {
    ProjectRoleBinding::new(
        TEST_NAMESPACE,
        "dev-binding",
        "dev",
        subjects
            .into_iter()
            .map(|(project_ref, groups)| ProjectSubject {
                project_ref: project_ref.to_string(),
                groups: groups.into_iter().map(|g| g.to_string()).collect(),
            })
            .collect(),
    )
}

pub async fn seed_config_map(store: &InMemoryStore) {
    let mut cm = ConfigMap::new(RBAC_CM_NAMESPACE, RBAC_CM_NAME);
    cm.data.insert("policy.csv".to_string(), String::new());
    store.create_config_map(cm).await.expect("seed config map");
}

pub async fn seed_project(store: &InMemoryStore, name: &str) {
    store
        .create_project(Project::new(TEST_NAMESPACE, name))
        .await
        .expect("seed project");
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub role: RoleReconciler,
    pub role_binding: RoleBindingReconciler,
    pub project_role: ProjectRoleReconciler,
    pub project_role_binding: ProjectRoleBindingReconciler,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let as_dyn: Arc<dyn ResourceStore> = store.clone();
        Self {
            role: RoleReconciler::new(as_dyn.clone(), config_map_key()),
            role_binding: RoleBindingReconciler::new(as_dyn.clone(), config_map_key()),
            project_role: ProjectRoleReconciler::new(as_dyn.clone()),
            project_role_binding: ProjectRoleBindingReconciler::new(as_dyn),
            store,
        }
    }

    pub async fn overlay(&self, key: &str) -> Option<String> {
        let cm = self
            .store
            .get_config_map(&config_map_key())
            .await
            .expect("config map");
        cm.data.get(key).cloned()
    }
}
