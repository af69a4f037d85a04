use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "https://healthchecks.io";
pub const DEFAULT_PING_URL: &str = "https://healthchecks.io/ping";
pub const DEFAULT_ENV_FILE: &str = "/etc/pve/healthchecks/variables.env";

/// Effective Healthchecks configuration, immutable after resolution.
///
/// Resolution layers, applied in order with non-empty values winning:
/// built-in defaults, process environment, env file, CLI overrides.
#[derive(Debug, Clone)]
pub struct HcConfig {
    pub base_url: String,
    pub ping_url: String,
    pub rw_key: String,
    pub ping_key: String,
}

/// CLI-supplied overrides for the four configuration keys.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub ping_url: Option<String>,
    pub rw_key: Option<String>,
    pub ping_key: Option<String>,
}

impl HcConfig {
    pub fn defaults() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ping_url: DEFAULT_PING_URL.to_string(),
            rw_key: String::new(),
            ping_key: String::new(),
        }
    }

    /// Resolve the effective configuration for this invocation.
    pub fn resolve(env_file: &Path, overrides: &CliOverrides) -> Self {
        Self::resolve_with_default(Path::new(DEFAULT_ENV_FILE), env_file, overrides)
    }

    /// The default env file is always layered first; a CLI-supplied path
    /// is layered on top of it when it names a different file.
    fn resolve_with_default(
        default_file: &Path,
        env_file: &Path,
        overrides: &CliOverrides,
    ) -> Self {
        let mut config = Self::defaults();
        config.layer_process_env();
        config.layer_file(default_file);
        if env_file != default_file {
            config.layer_file(env_file);
        }
        config.layer_overrides(overrides);
        config
    }

    fn apply(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        match key {
            "HC_BASE_DOMAIN" => self.base_url = value.to_string(),
            "HC_PING_DOMAIN" => self.ping_url = value.to_string(),
            "HC_RW_API_KEY" => self.rw_key = value.to_string(),
            "HC_PING_KEY" => self.ping_key = value.to_string(),
            _ => {}
        }
    }

    pub fn layer_process_env(&mut self) {
        for key in [
            "HC_BASE_DOMAIN",
            "HC_PING_DOMAIN",
            "HC_RW_API_KEY",
            "HC_PING_KEY",
        ] {
            if let Ok(value) = std::env::var(key) {
                self.apply(key, &value);
            }
        }
    }

    /// Layer KEY=VALUE lines from a file. A missing or unreadable file
    /// contributes nothing.
    pub fn layer_file(&mut self, path: &Path) {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return,
        };
        for (key, value) in parse_env_lines(&content) {
            self.apply(&key, &value);
        }
    }

    pub fn layer_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(value) = &overrides.base_url {
            self.apply("HC_BASE_DOMAIN", value);
        }
        if let Some(value) = &overrides.ping_url {
            self.apply("HC_PING_DOMAIN", value);
        }
        if let Some(value) = &overrides.rw_key {
            self.apply("HC_RW_API_KEY", value);
        }
        if let Some(value) = &overrides.ping_key {
            self.apply("HC_PING_KEY", value);
        }
    }
}

/// Parse line-oriented KEY=VALUE content. Blank lines and `#` comments are
/// skipped; surrounding single or double quotes are stripped from values.
pub fn parse_env_lines(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim_matches(|c| c == '\'' || c == '"');
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    pairs
}

/// Per-invocation snapshot of the vzdump environment. Gathered once in
/// `main` so deep call paths never read ambient process state.
#[derive(Debug, Clone, Default)]
pub struct JobEnv {
    pub vmtype: String,
    pub storage: String,
    pub hostname: String,
    pub hosttype: String,
    pub logfile_override: Option<String>,
}

impl JobEnv {
    pub fn from_env() -> Self {
        Self {
            vmtype: std::env::var("VMTYPE").unwrap_or_else(|_| "unknown".to_string()),
            // DUMPDIR is set for local backups, STOREID for Proxmox Backup Server
            storage: std::env::var("DUMPDIR")
                .or_else(|_| std::env::var("STOREID"))
                .unwrap_or_default(),
            hostname: std::env::var("HOSTNAME").unwrap_or_default(),
            hosttype: std::env::var("HOSTTYPE").unwrap_or_default(),
            logfile_override: std::env::var("LOGFILE").ok(),
        }
    }

    /// Guest log path: the LOGFILE override when present, else the vzdump
    /// per-guest default.
    pub fn logfile(&self, vmid: &str) -> String {
        match &self.logfile_override {
            Some(path) => path.clone(),
            None => format!("/var/log/vzdump/{}-{}.log", self.vmtype.to_lowercase(), vmid),
        }
    }
}
