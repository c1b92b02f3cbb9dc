use crate::model::ObjectKey;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

// Controller configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub metrics_bind: SocketAddr,
    /// Identity of the shared RBAC policy ConfigMap.
    pub policy_config_map: ObjectKey,
    /// Tick interval of the drift-poll driver.
    pub resync_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct ControllerConfigOverride {
    metrics_bind: Option<String>,
    config_map_name: Option<String>,
    config_map_namespace: Option<String>,
    resync_secs: Option<u64>,
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self> {
        let metrics_bind = std::env::var("ARGONAUT_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse ARGONAUT_METRICS_BIND")?;
        let name = std::env::var("ARGONAUT_RBAC_CM_NAME")
            .unwrap_or_else(|_| "argocd-rbac-cm".to_string());
        let namespace =
            std::env::var("ARGONAUT_RBAC_CM_NAMESPACE").unwrap_or_else(|_| "argocd".to_string());
        let resync_secs = match std::env::var("ARGONAUT_RESYNC_SECS") {
            Ok(value) => value.parse().with_context(|| "parse ARGONAUT_RESYNC_SECS")?,
            Err(_) => 30,
        };
        Ok(Self {
            metrics_bind,
            policy_config_map: ObjectKey::new(namespace, name),
            resync_interval: Duration::from_secs(resync_secs),
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("ARGONAUT_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read ARGONAUT_CONFIG: {path}"))?;
            let override_cfg: ControllerConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse controller config yaml")?;
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.config_map_name {
                config.policy_config_map.name = value;
            }
            if let Some(value) = override_cfg.config_map_namespace {
                config.policy_config_map.namespace = value;
            }
            if let Some(value) = override_cfg.resync_secs {
                config.resync_interval = Duration::from_secs(value);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::set_var(key, value);
            }
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::remove_var(key);
            }
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(value) => unsafe {
                    std::env::set_var(self.key, value);
                },
                None => unsafe {
                    std::env::remove_var(self.key);
                },
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_without_env() {
        let _g1 = EnvGuard::unset("ARGONAUT_METRICS_BIND");
        let _g2 = EnvGuard::unset("ARGONAUT_RBAC_CM_NAME");
        let _g3 = EnvGuard::unset("ARGONAUT_RBAC_CM_NAMESPACE");
        let _g4 = EnvGuard::unset("ARGONAUT_RESYNC_SECS");
        let _g5 = EnvGuard::unset("ARGONAUT_CONFIG");

        let config = ControllerConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.policy_config_map.name, "argocd-rbac-cm");
        assert_eq!(config.policy_config_map.namespace, "argocd");
        assert_eq!(config.resync_interval, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        let _g1 = EnvGuard::set("ARGONAUT_RBAC_CM_NAMESPACE", "gitops");
        let _g2 = EnvGuard::set("ARGONAUT_RESYNC_SECS", "5");
        let _g3 = EnvGuard::unset("ARGONAUT_CONFIG");

        let config = ControllerConfig::from_env().expect("config");
        assert_eq!(config.policy_config_map.namespace, "gitops");
        assert_eq!(config.resync_interval, Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn invalid_bind_addr_is_rejected() {
        let _g1 = EnvGuard::set("ARGONAUT_METRICS_BIND", "not-an-addr");
        let err = ControllerConfig::from_env().expect_err("invalid addr");
        assert!(err.to_string().contains("ARGONAUT_METRICS_BIND"));
    }

    #[test]
    #[serial]
    fn yaml_override_wins() {
        let dir = std::env::temp_dir().join("argonaut-config-test");
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("controller.yaml");
        fs::write(
            &path,
            "config_map_name: custom-rbac-cm\nresync_secs: 7\n",
        )
        .expect("write yaml");

        let _g1 = EnvGuard::unset("ARGONAUT_RBAC_CM_NAME");
        let _g2 = EnvGuard::set("ARGONAUT_CONFIG", path.to_str().expect("utf8 path"));

        let config = ControllerConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.policy_config_map.name, "custom-rbac-cm");
        assert_eq!(config.resync_interval, Duration::from_secs(7));
    }
}
