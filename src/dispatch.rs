use crate::config::JobEnv;
use crate::errlog::PendingErrorLog;
use crate::healthchecks::{CheckSpec, Monitoring, Report};
use crate::host::context::HostContext;
use crate::host::HostProbe;
use crate::phase::Phase;
use crate::tags::{add_tag, tag_from_cmd, tag_from_file};
use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

/// Slug prefix of the per-host (whole job) check.
pub const HOST_SLUG_PREFIX: &str = "job";
/// Grace period for the host check, seconds.
pub const HOST_GRACE: u64 = 7200;
/// Grace period for per-guest checks, seconds.
pub const GUEST_GRACE: u64 = 3600;

/// Lines carrying these markers are our own progress output or HTTP client
/// noise captured in the guest log; they are stripped before the log is
/// forwarded.
const LOG_NOISE_MARKERS: [&str; 2] = ["MESG", "OKhttp"];

/// Executes the per-phase action sequence. One-shot: each phase is a
/// terminal transition, never chaining into another.
pub struct Dispatcher<'a> {
    pub monitor: &'a dyn Monitoring,
    pub probe: &'a dyn HostProbe,
    pub host: &'a HostContext,
    pub env: &'a JobEnv,
    pub errlog: &'a PendingErrorLog,
    pub task_id: &'a str,
    pub mode: &'a str,
    pub vmid: &'a str,
}

impl Dispatcher<'_> {
    pub fn guest_slug_prefix(&self) -> String {
        format!("{}-{}", self.vmid, self.env.vmtype)
    }

    pub async fn run(&self, phase: &Phase) -> Result<()> {
        match phase {
            Phase::JobInit => self.job_init().await,
            Phase::JobStart => self.job_start().await,
            Phase::BackupStart => self.backup_start().await,
            Phase::PreStop | Phase::PreRestart | Phase::PostRestart => {
                self.guest_checkpoint(phase).await
            }
            Phase::BackupEnd => self.backup_end().await,
            Phase::BackupAbort => self.backup_abort().await,
            Phase::LogEnd => self.log_end().await,
            Phase::JobEnd => self.job_end().await,
            Phase::JobAbort => self.job_abort().await,
            Phase::Unknown(name) => self.unknown_phase(name).await,
        }
    }

    async fn job_init(&self) -> Result<()> {
        let mut tags = String::new();
        for tag in [
            add_tag("cluster", &self.host.cluster)?,
            add_tag("node", &self.env.hostname)?,
            add_tag("storage", &self.env.storage)?,
            tag_from_file(self.probe, Path::new("/etc/machine-id"), "").await?,
            tag_from_cmd(self.probe, "arch", "uname", &["--machine"]).await?,
            tag_from_cmd(self.probe, "kernel", "uname", &["--kernel-release"]).await?,
        ]
        .into_iter()
        .flatten()
        {
            tags.push_str(&tag);
        }

        info!("job-init -- create host endpoint {}", self.host.slug_suffix);
        let mut spec = CheckSpec::new(self.host.slug_suffix.clone(), HOST_SLUG_PREFIX);
        spec.grace = HOST_GRACE;
        spec.description = self.comment_lines(Path::new("/etc/pve/local/config")).await;
        spec.tags = tags;
        self.monitor.create_or_update(&spec).await?;
        Ok(())
    }

    async fn job_start(&self) -> Result<()> {
        info!("job-start -- ping host start");
        self.monitor
            .ping(HOST_SLUG_PREFIX, Report::Start, None, None)
            .await?;
        Ok(())
    }

    async fn backup_start(&self) -> Result<()> {
        let mut tags = String::new();
        for tag in [
            add_tag("cluster", &self.host.cluster)?,
            tag_from_cmd(self.probe, "node", "hostname", &[]).await?,
            add_tag("storage", &self.env.storage)?,
            add_tag("mode", self.mode)?,
            add_tag("vmid", self.vmid)?,
            add_tag("hostname", &self.env.hostname)?,
            add_tag("type", &self.env.hosttype)?,
            add_tag("vmtype", &self.env.vmtype)?,
        ]
        .into_iter()
        .flatten()
        {
            tags.push_str(&tag);
        }

        let guest_prefix = self.guest_slug_prefix();
        let guest_hostname = if self.env.hostname.is_empty() {
            "unknown"
        } else {
            self.env.hostname.as_str()
        };
        let name = format!(
            "{}.{}.{}.{}.{}",
            self.host.node, self.host.domain, self.env.vmtype, self.vmid, guest_hostname
        );

        info!("backup-start -- create guest endpoint {guest_prefix}");
        let mut spec = CheckSpec::new(name, guest_prefix.clone());
        spec.grace = GUEST_GRACE;
        spec.description = self.guest_description().await;
        spec.tags = tags;
        self.monitor.create_or_update(&spec).await?;

        info!("backup-start -- ping {} start", self.env.vmtype);
        self.monitor
            .ping(&guest_prefix, Report::Start, None, None)
            .await?;

        info!("backup-start -- ping host log");
        let body = format!("backup-start: {guest_prefix}");
        self.monitor
            .ping(HOST_SLUG_PREFIX, Report::Log, None, Some(&body))
            .await?;
        Ok(())
    }

    /// pre-stop / pre-restart / post-restart: log-only pings to both the
    /// guest and host checks.
    async fn guest_checkpoint(&self, phase: &Phase) -> Result<()> {
        let guest_prefix = self.guest_slug_prefix();
        let body = format!("{}: {}", phase, guest_prefix);

        info!("{phase} -- ping {} log", self.env.vmtype);
        self.monitor
            .ping(&guest_prefix, Report::Log, None, Some(&body))
            .await?;

        info!("{phase} -- ping host log");
        self.monitor
            .ping(HOST_SLUG_PREFIX, Report::Log, None, Some(&body))
            .await?;
        Ok(())
    }

    async fn backup_end(&self) -> Result<()> {
        let guest_prefix = self.guest_slug_prefix();
        let body = format!("backup-end: {guest_prefix}");

        info!("backup-end -- ping {} success", self.env.vmtype);
        self.monitor
            .ping(&guest_prefix, Report::Success, None, Some(&body))
            .await?;

        info!("backup-end -- ping host log");
        self.monitor
            .ping(HOST_SLUG_PREFIX, Report::Log, None, Some(&body))
            .await?;
        Ok(())
    }

    async fn backup_abort(&self) -> Result<()> {
        let guest_prefix = self.guest_slug_prefix();
        let body = format!("backup-abort: {guest_prefix}");

        info!("backup-abort -- ping {} fail", self.env.vmtype);
        self.monitor
            .ping(&guest_prefix, Report::Fail, None, Some(&body))
            .await?;

        info!("backup-abort -- ping host log");
        self.monitor
            .ping(HOST_SLUG_PREFIX, Report::Log, None, Some(&body))
            .await?;

        let url = self.monitor.dashboard_url(&guest_prefix).await?;
        let line = format!("{} - {} - Backup Abort - {}", self.task_id, self.vmid, url);
        self.errlog.append(&line)?;
        println!("{line}");
        Ok(())
    }

    async fn log_end(&self) -> Result<()> {
        let logfile = self.env.logfile(self.vmid);
        info!("LOGFILE: {logfile}");

        let content = match self.probe.read_file(Path::new(&logfile)).await {
            Ok(content) => content,
            Err(err) => {
                warn!("could not read guest log {logfile}: {err}");
                String::new()
            }
        };
        let filtered = filter_log(&content);

        info!("log-end -- ping {} log", self.env.vmtype);
        self.monitor
            .ping(&self.guest_slug_prefix(), Report::Log, None, Some(&filtered))
            .await?;
        Ok(())
    }

    async fn job_end(&self) -> Result<()> {
        if self.errlog.exists() {
            let job_log = self.errlog.read_all()?;
            info!("job-end -- ping host fail");
            self.monitor
                .ping(HOST_SLUG_PREFIX, Report::Fail, None, Some(&job_log))
                .await?;
            self.errlog.remove()?;
        } else {
            info!("job-end -- ping host success");
            self.monitor
                .ping(HOST_SLUG_PREFIX, Report::Success, None, Some(self.task_id))
                .await?;
        }
        Ok(())
    }

    async fn job_abort(&self) -> Result<()> {
        info!("job-abort -- ping host fail");
        self.errlog
            .append(&format!("{} - Job Abort", self.task_id))?;
        let job_log = self.errlog.read_all()?;
        self.monitor
            .ping(HOST_SLUG_PREFIX, Report::Fail, None, Some(&job_log))
            .await?;
        Ok(())
    }

    async fn unknown_phase(&self, name: &str) -> Result<()> {
        info!("{name} -- ping host fail");
        let body = format!("UNKNOWN: {name}");
        self.monitor
            .ping(HOST_SLUG_PREFIX, Report::Fail, None, Some(&body))
            .await?;
        warn!("unknown phase '{name}'");
        self.errlog
            .append(&format!("WARNING: unknown phase '{name}'"))?;
        Ok(())
    }

    /// `#`-prefixed comment lines of a config file, marker stripped. Best
    /// effort: an unreadable file yields an empty description.
    async fn comment_lines(&self, path: &Path) -> String {
        match self.probe.read_file(path).await {
            Ok(content) => content
                .lines()
                .filter_map(|line| line.strip_prefix('#'))
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string(),
            Err(_) => String::new(),
        }
    }

    async fn guest_description(&self) -> String {
        let path = match self.env.vmtype.as_str() {
            "qemu" => format!("/etc/pve/local/qemu-server/{}.conf", self.vmid),
            "lxc" => format!("/etc/pve/local/lxc/{}.conf", self.vmid),
            _ => return String::new(),
        };
        self.comment_lines(Path::new(&path)).await
    }
}

/// Drop log lines carrying internal noise markers. Every retained line
/// keeps its terminating newline.
fn filter_log(content: &str) -> String {
    let mut filtered = String::new();
    for line in content
        .lines()
        .filter(|line| !LOG_NOISE_MARKERS.iter().any(|marker| line.contains(marker)))
    {
        filtered.push_str(line);
        filtered.push('\n');
    }
    filtered
}
