use crate::config::{CliOverrides, DEFAULT_ENV_FILE};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backup phase (e.g. job-init, job-start, backup-start)
    pub phase: Option<String>,

    /// Backup mode (snapshot, suspend, stop)
    pub mode: Option<String>,

    /// VM or LXC id
    pub vmid: Option<String>,

    /// Healthchecks base domain
    #[arg(long = "hc-domain")]
    pub hc_domain: Option<String>,

    /// Healthchecks ping domain
    #[arg(long = "hc-ping-domain")]
    pub hc_ping_domain: Option<String>,

    /// Healthchecks read-write API key
    #[arg(long = "hc-rw-key")]
    pub hc_rw_key: Option<String>,

    /// Healthchecks ping key
    #[arg(long = "hc-ping-key")]
    pub hc_ping_key: Option<String>,

    /// Path to environment file
    #[arg(long = "env-file", default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Enable debug logging for internal details
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            base_url: self.hc_domain.clone(),
            ping_url: self.hc_ping_domain.clone(),
            rw_key: self.hc_rw_key.clone(),
            ping_key: self.hc_ping_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::parse_from(["vzdump-healthchecks", "backup-start", "snapshot", "101"]);
        assert_eq!(cli.phase.as_deref(), Some("backup-start"));
        assert_eq!(cli.mode.as_deref(), Some("snapshot"));
        assert_eq!(cli.vmid.as_deref(), Some("101"));
        assert_eq!(cli.env_file, PathBuf::from(DEFAULT_ENV_FILE));
    }

    #[test]
    fn test_overrides_are_collected() {
        let cli = Cli::parse_from([
            "vzdump-healthchecks",
            "job-init",
            "--hc-domain",
            "https://hc.internal",
            "--hc-rw-key",
            "abc",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.base_url.as_deref(), Some("https://hc.internal"));
        assert_eq!(overrides.rw_key.as_deref(), Some("abc"));
        assert!(overrides.ping_url.is_none());
    }
}
