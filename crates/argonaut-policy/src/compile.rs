use crate::rule::{ProjectRule, Rule};
use crate::subject::Subject;

/// Reserved prefix marking role subjects in the policy language. User-supplied
/// role and subject names must not carry it; the compiler adds it where the
/// grammar requires one.
pub const ROLE_PREFIX: &str = "role:";

/// ConfigMap key holding the default policy for the whole installation.
pub const POLICY_CSV_KEY: &str = "policy.csv";

/// The default policy content. The installation default grants nothing; all
/// grants come from role overlays.
pub const DEFAULT_POLICY_CSV: &str = "";

/// ConfigMap key carrying the overlay for one role: `policy.<ns>.<role>.csv`.
pub fn overlay_key(namespace: &str, role_name: &str) -> String {
    format!("policy.{namespace}.{role_name}.csv")
}

/// The policy-language spelling of a role subject.
pub fn role_subject(role_name: &str) -> String {
    format!("{ROLE_PREFIX}{role_name}")
}

/// Expand a rule list into `p,` lines for the given policy subject.
///
/// Output order is rule order × verb order × object order and must stay
/// stable: the merge engine compares compiled text byte-for-byte to decide
/// whether the stored document needs a write.
pub fn compile_rules(rules: &[Rule], subject: &str) -> String {
    let mut policy = String::new();
    for rule in rules {
        let resource = rule.resource.as_str();
        for verb in &rule.verbs {
            for object in &rule.objects {
                policy.push_str(&format!("p, {subject}, {resource}, {verb}, {object}, allow\n"));
            }
        }
    }
    policy
}

/// Expand a binding's subject list into policy text for the given role.
///
/// Subjects compile in binding order. `Sso` and `Role` subjects become `g,`
/// membership lines; `Local` subjects inline the role's full rule expansion
/// under their own name.
pub fn compile_binding_subjects(subjects: &[Subject], role_name: &str, rules: &[Rule]) -> String {
    let mut policy = String::new();
    let role = role_subject(role_name);
    for subject in subjects {
        match subject {
            Subject::Sso(name) => {
                policy.push_str(&format!("g, {name}, {role}\n"));
            }
            Subject::Role(name) => {
                policy.push_str(&format!("g, {}, {role}\n", role_subject(name)));
            }
            Subject::Local(name) => {
                policy.push_str(&compile_rules(rules, name));
            }
        }
    }
    policy
}

/// The full overlay text for a bound role: the role's own rules under
/// `role:<name>`, then the binding's subject expansion.
pub fn compile_role_policy(role_name: &str, rules: &[Rule], subjects: &[Subject]) -> String {
    let mut policy = compile_rules(rules, &role_subject(role_name));
    policy.push_str(&compile_binding_subjects(subjects, role_name, rules));
    policy
}

/// Compile a project role's rules into per-line policy strings for one
/// project. Returned as a list because Projects store policies as a string
/// list, not a newline-joined blob.
pub fn compile_project_policies(
    project_name: &str,
    role_name: &str,
    rules: &[ProjectRule],
) -> Vec<String> {
    let mut policies = Vec::new();
    for rule in rules {
        let resource = rule.resource.as_str();
        for verb in &rule.verbs {
            for object in &rule.objects {
                policies.push(format!(
                    "p, proj:{project_name}:{role_name}, {resource}, {verb}, {object}, allow"
                ));
            }
        }
    }
    policies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ProjectResourceKind, ResourceKind};

    fn applications_rule(verbs: &[&str], objects: &[&str]) -> Rule {
        Rule {
            resource: ResourceKind::Applications,
            verbs: verbs.iter().map(|v| v.to_string()).collect(),
            objects: objects.iter().map(|o| o.to_string()).collect(),
        }
    }

    #[test]
    fn compile_rules_expands_verb_object_cross_product() {
        let rules = vec![applications_rule(&["get", "list"], &["*/*"])];
        assert_eq!(
            compile_rules(&rules, "role:test-role"),
            "p, role:test-role, applications, get, */*, allow\n\
             p, role:test-role, applications, list, */*, allow\n"
        );
    }

    #[test]
    fn compile_rules_order_follows_input_order() {
        let forward = vec![applications_rule(&["get", "list"], &["a", "b"])];
        let reversed = vec![applications_rule(&["list", "get"], &["b", "a"])];

        let forward_text = compile_rules(&forward, "x");
        assert_eq!(
            forward_text,
            "p, x, applications, get, a, allow\n\
             p, x, applications, get, b, allow\n\
             p, x, applications, list, a, allow\n\
             p, x, applications, list, b, allow\n"
        );
        assert_ne!(forward_text, compile_rules(&reversed, "x"));
        // Determinism: the same input always renders the same bytes.
        assert_eq!(forward_text, compile_rules(&forward, "x"));
    }

    #[test]
    fn role_subject_appends_membership_line() {
        let policy = compile_binding_subjects(
            &[Subject::Role("rb-role-test".to_string())],
            "test-role",
            &[],
        );
        assert_eq!(policy, "g, role:rb-role-test, role:test-role\n");
    }

    #[test]
    fn sso_subject_appends_membership_line() {
        let policy =
            compile_binding_subjects(&[Subject::Sso("gosha".to_string())], "test-role", &[]);
        assert_eq!(policy, "g, gosha, role:test-role\n");
    }

    #[test]
    fn local_subject_inlines_rules_under_own_name() {
        let rules = vec![applications_rule(&["get", "list"], &["*/*"])];
        let policy =
            compile_binding_subjects(&[Subject::Local("localUser".to_string())], "test-role", &rules);
        assert_eq!(
            policy,
            "p, localUser, applications, get, */*, allow\n\
             p, localUser, applications, list, */*, allow\n"
        );
    }

    #[test]
    fn role_policy_concatenates_rules_then_subjects() {
        let rules = vec![applications_rule(&["get"], &["*/*"])];
        let subjects = vec![Subject::Sso("gosha".to_string())];
        assert_eq!(
            compile_role_policy("test-role", &rules, &subjects),
            "p, role:test-role, applications, get, */*, allow\n\
             g, gosha, role:test-role\n"
        );
    }

    #[test]
    fn subjects_compile_in_binding_order() {
        let subjects = vec![
            Subject::Role("first".to_string()),
            Subject::Sso("second".to_string()),
        ];
        assert_eq!(
            compile_binding_subjects(&subjects, "r", &[]),
            "g, role:first, role:r\ng, second, role:r\n"
        );
    }

    #[test]
    fn project_policies_are_line_per_grant_without_newlines() {
        let rules = vec![ProjectRule {
            resource: ProjectResourceKind::Applications,
            verbs: vec!["get".to_string(), "sync".to_string()],
            objects: vec!["*".to_string()],
        }];
        let policies = compile_project_policies("project-a", "dev", &rules);
        assert_eq!(
            policies,
            vec![
                "p, proj:project-a:dev, applications, get, *, allow",
                "p, proj:project-a:dev, applications, sync, *, allow",
            ]
        );
        assert!(policies.iter().all(|p| !p.ends_with('\n')));
    }

    #[test]
    fn overlay_key_format() {
        assert_eq!(overlay_key("default", "test-role"), "policy.default.test-role.csv");
    }
}
