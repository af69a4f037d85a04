use anyhow::{bail, Context, Result};
use clap::Parser;
use vzdump_healthchecks::cli::Cli;
use vzdump_healthchecks::host::context;
use vzdump_healthchecks::{
    Dispatcher, HcClient, HcConfig, HostContext, JobEnv, PendingErrorLog, Phase, SystemProbe,
    DEFAULT_ERROR_CODE,
};

#[tokio::main]
async fn main() {
    // vzdump always passes a phase; a bare invocation is a human at a
    // shell, so show usage instead of a fatal error
    if std::env::args().len() == 1 {
        eprintln!("Usage: vzdump-healthchecks <phase> [mode] [vmid] [options]");
        eprintln!("Example: vzdump-healthchecks job-init");
        eprintln!("For complete options: vzdump-healthchecks --help");
        std::process::exit(1);
    }

    let cli = Cli::parse();

    // Initialize logging based on debug flag
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let probe = SystemProbe;
    let task_id = context::task_id(&probe).await;
    let errlog = PendingErrorLog::for_task(&task_id);

    if let Err(err) = run(&cli, &probe, &task_id, &errlog).await {
        // single log-and-exit site: stderr for the operator, the pending
        // error log so job-end reports the failure to the host check
        let message = format!("FATAL: {err:#}");
        eprintln!("{message}");
        if let Err(log_err) = errlog.append(&message) {
            eprintln!("additionally failed to record the error: {log_err:#}");
        }
        std::process::exit(DEFAULT_ERROR_CODE);
    }
}

async fn run(
    cli: &Cli,
    probe: &SystemProbe,
    task_id: &str,
    errlog: &PendingErrorLog,
) -> Result<()> {
    let hook_args: Vec<String> = std::env::args().skip(1).collect();
    println!("HOOK: {} -- {}", hook_args.join(" "), task_id);

    let phase_name = cli.phase.clone().unwrap_or_default();
    if phase_name.is_empty() {
        bail!("Phase not provided");
    }
    let phase = Phase::parse(&phase_name);

    let config = HcConfig::resolve(&cli.env_file, &cli.overrides());
    tracing::debug!(
        "configuration: base={}, ping={}, rw_key={}, ping_key={}",
        config.base_url,
        config.ping_url,
        mask_key(&config.rw_key),
        mask_key(&config.ping_key)
    );

    let env = JobEnv::from_env();
    let host = HostContext::resolve(probe)
        .await
        .context("Failed to resolve cluster/node identity")?;
    let client = HcClient::new(config, &host).context("Failed to build Healthchecks client")?;

    let dispatcher = Dispatcher {
        monitor: &client,
        probe,
        host: &host,
        env: &env,
        errlog,
        task_id,
        mode: cli.mode.as_deref().unwrap_or_default(),
        vmid: cli.vmid.as_deref().unwrap_or_default(),
    };
    dispatcher
        .run(&phase)
        .await
        .with_context(|| format!("Phase '{phase}' failed"))
}

/// Keys are secrets; only show enough to recognize which one is in use.
fn mask_key(key: &str) -> String {
    if key.len() >= 8 {
        format!("{}***{}", &key[..4], &key[key.len() - 4..])
    } else if key.is_empty() {
        "<unset>".to_string()
    } else {
        "***".to_string()
    }
}
