use crate::resource::ResourceKind;
use crate::rule::Rule;

/// The two reserved role names that resolve to hard-coded permission sets
/// instead of a stored role. A binding referencing one of these skips role
/// lookup entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinRole {
    Admin,
    ReadOnly,
}

impl BuiltinRole {
    /// Resolve a role-reference name to a built-in, if it is reserved.
    pub fn resolve(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(BuiltinRole::Admin),
            "readonly" => Some(BuiltinRole::ReadOnly),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinRole::Admin => "admin",
            BuiltinRole::ReadOnly => "readonly",
        }
    }

    /// The built-in's permission set, in the fixed order the overlay text is
    /// rendered in when a `local` subject inlines it.
    pub fn rules(self) -> Vec<Rule> {
        match self {
            BuiltinRole::Admin => vec![
                rule(
                    ResourceKind::Applications,
                    &["override", "sync", "create", "update", "delete", "action", "get"],
                    &["*/*"],
                ),
                rule(
                    ResourceKind::ApplicationSets,
                    &["create", "update", "delete", "get"],
                    &["*/*"],
                ),
                rule(
                    ResourceKind::Certificates,
                    &["create", "update", "delete", "get"],
                    &["*"],
                ),
                rule(
                    ResourceKind::Clusters,
                    &["create", "update", "delete", "get"],
                    &["*"],
                ),
                rule(
                    ResourceKind::Repositories,
                    &["create", "update", "delete", "get"],
                    &["*"],
                ),
                rule(
                    ResourceKind::Projects,
                    &["create", "update", "delete", "get"],
                    &["*"],
                ),
                rule(ResourceKind::Accounts, &["update", "get"], &["*"]),
                rule(ResourceKind::GpgKeys, &["create", "get", "delete"], &["*"]),
                rule(ResourceKind::Exec, &["create"], &["*/*"]),
                rule(ResourceKind::Logs, &["get"], &["*/*"]),
            ],
            BuiltinRole::ReadOnly => vec![
                rule(ResourceKind::Applications, &["get"], &["*/*"]),
                rule(ResourceKind::Certificates, &["get"], &["*"]),
                rule(ResourceKind::Clusters, &["get"], &["*"]),
                rule(ResourceKind::Repositories, &["get"], &["*"]),
                rule(ResourceKind::Projects, &["get"], &["*"]),
                rule(ResourceKind::Accounts, &["get"], &["*"]),
                rule(ResourceKind::GpgKeys, &["get"], &["*"]),
                rule(ResourceKind::Logs, &["get"], &["*/*"]),
            ],
        }
    }
}

fn rule(resource: ResourceKind, verbs: &[&str], objects: &[&str]) -> Rule {
    Rule {
        resource,
        verbs: verbs.iter().map(|v| v.to_string()).collect(),
        objects: objects.iter().map(|o| o.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::BuiltinRole;
    use crate::compile::compile_rules;
    use crate::resource::ResourceKind;

    #[test]
    fn resolve_reserved_names_only() {
        assert_eq!(BuiltinRole::resolve("admin"), Some(BuiltinRole::Admin));
        assert_eq!(BuiltinRole::resolve("readonly"), Some(BuiltinRole::ReadOnly));
        assert_eq!(BuiltinRole::resolve("read-only"), None);
        assert_eq!(BuiltinRole::resolve("Admin"), None);
        assert_eq!(BuiltinRole::resolve(""), None);
    }

    #[test]
    fn admin_grants_broad_mutations() {
        let rules = BuiltinRole::Admin.rules();
        assert_eq!(rules.len(), 10);
        let applications = &rules[0];
        assert_eq!(applications.resource, ResourceKind::Applications);
        assert!(applications.verbs.iter().any(|v| v == "override"));

        let text = compile_rules(&rules, "role:admin");
        assert!(text.contains("p, role:admin, applications, sync, */*, allow\n"));
        assert!(text.contains("p, role:admin, gpgkeys, delete, *, allow\n"));
        assert!(text.contains("p, role:admin, exec, create, */*, allow\n"));
    }

    #[test]
    fn readonly_grants_get_only() {
        let rules = BuiltinRole::ReadOnly.rules();
        assert_eq!(rules.len(), 8);
        for rule in &rules {
            assert_eq!(rule.verbs, vec!["get".to_string()]);
        }
        // No exec or extensions grants at all in the read-only set.
        assert!(rules.iter().all(|r| r.resource != ResourceKind::Exec));
        assert!(rules.iter().all(|r| r.resource != ResourceKind::Extensions));
    }
}
