use serde::{Deserialize, Serialize};

/// A subject a global role binding grants its role to.
///
/// The three kinds compile differently:
/// - `Sso`: the identity-provider group joins the role via a `g,` line.
/// - `Role`: another policy role joins the role via a `g,` line with the
///   subject name `role:`-prefixed.
/// - `Local`: the role's rules are expanded inline under the local account's
///   own name, granting the permissions directly rather than via membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Subject {
    Sso(String),
    Local(String),
    Role(String),
}

impl Subject {
    /// The user-supplied subject name, regardless of kind.
    pub fn name(&self) -> &str {
        match self {
            Subject::Sso(name) | Subject::Local(name) | Subject::Role(name) => name,
        }
    }
}

/// A subject a project role binding grants its role to: one external project
/// and the groups receiving the role within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSubject {
    pub project_ref: String,
    pub groups: Vec<String>,
}
