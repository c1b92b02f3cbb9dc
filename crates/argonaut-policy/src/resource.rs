use serde::{Deserialize, Serialize};

/// Resource kinds a global role may grant permissions on.
///
/// The set matches the CD tool's RBAC resource vocabulary; verbs and objects
/// stay free-form because the policy engine interprets them (wildcards
/// included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Clusters,
    Projects,
    Applications,
    ApplicationSets,
    Repositories,
    Certificates,
    Accounts,
    GpgKeys,
    Logs,
    Exec,
    Extensions,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Clusters => "clusters",
            ResourceKind::Projects => "projects",
            ResourceKind::Applications => "applications",
            ResourceKind::ApplicationSets => "applicationsets",
            ResourceKind::Repositories => "repositories",
            ResourceKind::Certificates => "certificates",
            ResourceKind::Accounts => "accounts",
            ResourceKind::GpgKeys => "gpgkeys",
            ResourceKind::Logs => "logs",
            ResourceKind::Exec => "exec",
            ResourceKind::Extensions => "extensions",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "clusters" => Ok(ResourceKind::Clusters),
            "projects" => Ok(ResourceKind::Projects),
            "applications" => Ok(ResourceKind::Applications),
            "applicationsets" => Ok(ResourceKind::ApplicationSets),
            "repositories" => Ok(ResourceKind::Repositories),
            "certificates" => Ok(ResourceKind::Certificates),
            "accounts" => Ok(ResourceKind::Accounts),
            "gpgkeys" => Ok(ResourceKind::GpgKeys),
            "logs" => Ok(ResourceKind::Logs),
            "exec" => Ok(ResourceKind::Exec),
            "extensions" => Ok(ResourceKind::Extensions),
            _ => Err(()),
        }
    }
}

/// Resource kinds a project-scoped role may grant permissions on.
///
/// A strict subset of [`ResourceKind`]: certificates, accounts, gpgkeys and
/// extensions only exist at the global scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectResourceKind {
    Clusters,
    Applications,
    ApplicationSets,
    Repositories,
    Logs,
    Exec,
    Projects,
}

impl ProjectResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectResourceKind::Clusters => "clusters",
            ProjectResourceKind::Applications => "applications",
            ProjectResourceKind::ApplicationSets => "applicationsets",
            ProjectResourceKind::Repositories => "repositories",
            ProjectResourceKind::Logs => "logs",
            ProjectResourceKind::Exec => "exec",
            ProjectResourceKind::Projects => "projects",
        }
    }
}

impl std::fmt::Display for ProjectResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectResourceKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "clusters" => Ok(ProjectResourceKind::Clusters),
            "applications" => Ok(ProjectResourceKind::Applications),
            "applicationsets" => Ok(ProjectResourceKind::ApplicationSets),
            "repositories" => Ok(ProjectResourceKind::Repositories),
            "logs" => Ok(ProjectResourceKind::Logs),
            "exec" => Ok(ProjectResourceKind::Exec),
            "projects" => Ok(ProjectResourceKind::Projects),
            _ => Err(()),
        }
    }
}
