pub mod context;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' exited with {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid cluster status output: {0}")]
    ClusterStatus(#[from] serde_json::Error),
}

/// One entry of the cluster status listing. Entries with type "cluster"
/// name the cluster; entries with type "node" and the local flag set name
/// this node.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub local: Option<u8>,
}

/// Capability interface for host introspection, so slug/tag logic and the
/// dispatcher can be exercised with fakes instead of real OS commands.
#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn cluster_status(&self) -> Result<Vec<ClusterEntry>, HostError>;
    async fn hostname(&self) -> Result<String, HostError>;
    async fn domain(&self) -> Result<String, HostError>;
    async fn timezone(&self) -> Result<String, HostError>;
    async fn command_output(&self, program: &str, args: &[&str]) -> Result<String, HostError>;
    async fn read_file(&self, path: &Path) -> Result<String, HostError>;
    async fn parent_command_line(&self) -> Result<String, HostError>;
}

/// Probe backed by the real Proxmox host commands.
pub struct SystemProbe;

impl SystemProbe {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, HostError> {
        let command = if args.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, args.join(" "))
        };
        debug!("running host command: {command}");

        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| HostError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(HostError::CommandFailed {
                command,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl HostProbe for SystemProbe {
    async fn cluster_status(&self) -> Result<Vec<ClusterEntry>, HostError> {
        let stdout = self
            .run("pvesh", &["get", "/cluster/status", "--output-format", "json"])
            .await?;
        Ok(serde_json::from_str(&stdout)?)
    }

    async fn hostname(&self) -> Result<String, HostError> {
        self.run("hostname", &[]).await
    }

    async fn domain(&self) -> Result<String, HostError> {
        self.run("hostname", &["--domain"]).await
    }

    async fn timezone(&self) -> Result<String, HostError> {
        // "Timezone=Europe/Brussels" -> "Europe/Brussels"
        let stdout = self
            .run("timedatectl", &["show", "--property", "Timezone"])
            .await?;
        Ok(stdout
            .split_once('=')
            .map(|(_, tz)| tz.trim().to_string())
            .unwrap_or(stdout))
    }

    async fn command_output(&self, program: &str, args: &[&str]) -> Result<String, HostError> {
        self.run(program, args).await
    }

    async fn read_file(&self, path: &Path) -> Result<String, HostError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| HostError::ReadFile {
                path: path.display().to_string(),
                source,
            })
    }

    async fn parent_command_line(&self) -> Result<String, HostError> {
        let ppid = std::os::unix::process::parent_id();
        self.run("ps", &["-o", "args=", &ppid.to_string()]).await
    }
}
