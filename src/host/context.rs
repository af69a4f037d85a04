use crate::host::{HostError, HostProbe};
use tracing::warn;

/// Identity of the host this hook runs on. Resolved once per invocation
/// and used only to build slugs, tags, and check names.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub cluster: String,
    pub node: String,
    pub domain: String,
    pub timezone: String,
    /// `node.cluster.domain`, lower-cased. Appended to every slug prefix.
    pub slug_suffix: String,
}

impl HostContext {
    /// Resolve the host identity. Cluster/node lookup failure is fatal;
    /// domain and timezone fall back to "local" and "UTC".
    pub async fn resolve(probe: &dyn HostProbe) -> Result<Self, HostError> {
        let entries = probe.cluster_status().await?;

        let cluster = entries
            .iter()
            .find(|entry| entry.kind == "cluster")
            .map(|entry| {
                entry
                    .name
                    .clone()
                    .unwrap_or_else(|| "unknown-cluster".to_string())
            })
            .unwrap_or_else(|| "standalone".to_string());

        let node = match entries
            .iter()
            .find(|entry| entry.kind == "node" && entry.local == Some(1))
            .and_then(|entry| entry.name.clone())
        {
            Some(node) => node,
            None => probe.hostname().await?,
        };

        let domain = match probe.domain().await {
            Ok(domain) => domain,
            Err(err) => {
                warn!("domain lookup failed, using 'local': {err}");
                "local".to_string()
            }
        };

        let timezone = match probe.timezone().await {
            Ok(tz) if !tz.is_empty() => tz,
            Ok(_) => "UTC".to_string(),
            Err(err) => {
                warn!("timezone lookup failed, using UTC: {err}");
                "UTC".to_string()
            }
        };

        let slug_suffix = format!(
            "{}.{}.{}",
            node.to_lowercase(),
            cluster.to_lowercase(),
            domain.to_lowercase()
        );

        Ok(Self {
            cluster,
            node,
            domain,
            timezone,
            slug_suffix,
        })
    }
}

/// Task identifier shared by every phase invocation of one backup job:
/// the command line of the parent vzdump process.
pub async fn task_id(probe: &dyn HostProbe) -> String {
    match probe.parent_command_line().await {
        Ok(args) if !args.is_empty() => args,
        Ok(_) => "unknown-task".to_string(),
        Err(err) => {
            warn!("task id lookup failed, using 'unknown-task': {err}");
            "unknown-task".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ClusterEntry;
    use async_trait::async_trait;
    use std::path::Path;

    struct StaticProbe {
        status: &'static str,
        domain: Result<&'static str, ()>,
    }

    #[async_trait]
    impl HostProbe for StaticProbe {
        async fn cluster_status(&self) -> Result<Vec<ClusterEntry>, HostError> {
            Ok(serde_json::from_str(self.status)?)
        }

        async fn hostname(&self) -> Result<String, HostError> {
            Ok("fallback-host".to_string())
        }

        async fn domain(&self) -> Result<String, HostError> {
            self.domain
                .map(|d| d.to_string())
                .map_err(|_| HostError::CommandFailed {
                    command: "hostname --domain".to_string(),
                    code: Some(1),
                    stderr: String::new(),
                })
        }

        async fn timezone(&self) -> Result<String, HostError> {
            Ok("Europe/Brussels".to_string())
        }

        async fn command_output(&self, _: &str, _: &[&str]) -> Result<String, HostError> {
            unreachable!("not used by HostContext")
        }

        async fn read_file(&self, _: &Path) -> Result<String, HostError> {
            unreachable!("not used by HostContext")
        }

        async fn parent_command_line(&self) -> Result<String, HostError> {
            Ok("task UPID:pve1:000A:0:0:vzdump:101:root@pam:".to_string())
        }
    }

    #[tokio::test]
    async fn test_resolve_clustered_host() {
        let probe = StaticProbe {
            status: r#"[
                {"type": "cluster", "name": "Prod"},
                {"type": "node", "name": "PVE1", "local": 1}
            ]"#,
            domain: Ok("Example.COM"),
        };
        let context = HostContext::resolve(&probe).await.unwrap();
        assert_eq!(context.cluster, "Prod");
        assert_eq!(context.node, "PVE1");
        assert_eq!(context.slug_suffix, "pve1.prod.example.com");
    }

    #[tokio::test]
    async fn test_resolve_standalone_falls_back_to_hostname() {
        let probe = StaticProbe {
            status: r#"[{"type": "node", "name": "pve1", "local": 0}]"#,
            domain: Ok("local"),
        };
        let context = HostContext::resolve(&probe).await.unwrap();
        assert_eq!(context.cluster, "standalone");
        assert_eq!(context.node, "fallback-host");
    }

    #[tokio::test]
    async fn test_domain_failure_is_not_fatal() {
        let probe = StaticProbe {
            status: r#"[{"type": "node", "name": "pve1", "local": 1}]"#,
            domain: Err(()),
        };
        let context = HostContext::resolve(&probe).await.unwrap();
        assert_eq!(context.domain, "local");
        assert_eq!(context.slug_suffix, "pve1.standalone.local");
    }

    #[tokio::test]
    async fn test_task_id_from_parent() {
        let probe = StaticProbe {
            status: "[]",
            domain: Ok("local"),
        };
        let id = task_id(&probe).await;
        assert!(id.starts_with("task UPID:pve1"));
    }
}
