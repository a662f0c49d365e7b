//! syncbak — recursive FTP mirroring for LAN device backups.
//!
//! The device publishes a `syncbak.conf.json` at its FTP root describing
//! named backup profiles (data roots + excluded paths). One profile is
//! mirrored per run: directory skeleton first, then concurrent file
//! transfers over a bounded worker pool.
//!
//! Code layout:
//! - `base_system`: settings / logging / retry infrastructure
//! - `mirror`: the engine (connection, walker, scheduler, transfer)

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing::info;

mod base_system;
mod mirror;

use base_system::config::load_or_create;
use base_system::context::Settings;
use base_system::logging::{LogOptions, LogSystem};
use mirror::connection::{FtpEndpoint, FtpSession};
use mirror::models::SyncConfig;
use mirror::{MirrorOptions, remote_config};

#[derive(Debug, Parser)]
#[command(name = "syncbak", version)]
#[command(about = "Mirror a remote FTP tree into a local backup directory")]
struct Cli {
    /// Enable debug log output
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Path to the local settings file (default: ./syncbak.yml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backup profile to run (overrides default_profile from settings)
    #[arg(long, short)]
    profile: Option<String>,

    /// List the profiles published by the server and exit
    #[arg(long, default_value_t = false)]
    list_profiles: bool,

    /// Report how many bytes a run would transfer, without transferring
    #[arg(long, default_value_t = false)]
    estimate: bool,

    /// Local target directory (overrides target from settings)
    #[arg(long)]
    target: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log = LogSystem::init(LogOptions {
        debug: cli.debug,
        ..LogOptions::default()
    })
    .map_err(|e| anyhow!(e))?;

    let settings: Settings =
        load_or_create(cli.config.as_deref()).map_err(|e| anyhow!(e.to_string()))?;
    let endpoint = FtpEndpoint {
        host: settings.host.clone(),
        port: settings.port,
        username: settings.username.clone(),
        password: settings.password.clone(),
        timeout: settings.timeout(),
    };
    let retry = settings.retry_policy();

    let remote = {
        let mut session = FtpSession::open(&endpoint, &retry)
            .with_context(|| format!("connecting to {}:{}", settings.host, settings.port))?;
        remote_config::fetch_remote_config(&mut session, &settings.config_file)?
    };

    if cli.list_profiles {
        print_profiles(&remote);
        return Ok(());
    }

    let requested = cli
        .profile
        .as_deref()
        .or_else(|| (!settings.default_profile.is_empty()).then_some(&*settings.default_profile));
    let (name, profile) = remote.select(requested).ok_or_else(|| {
        let available: Vec<&str> = remote.profiles.keys().map(String::as_str).collect();
        match requested {
            Some(name) => anyhow!("no profile named {name:?}; available: {}", available.join(", ")),
            None => anyhow!(
                "pass --profile to pick one of: {}",
                available.join(", ")
            ),
        }
    })?;
    info!("selected profile {name} ({})", profile.title);

    if cli.estimate {
        let total = mirror::estimate_profile(&endpoint, profile, &retry)?;
        println!("{name}: {} across {} data root(s)", format_bytes(total), profile.data.len());
        return Ok(());
    }

    let target = cli
        .target
        .or_else(|| (!settings.target.is_empty()).then(|| PathBuf::from(&settings.target)))
        .ok_or_else(|| anyhow!("no target directory; set `target` in syncbak.yml or pass --target"))?;

    let options = MirrorOptions {
        workers: match settings.max_workers {
            0 => mirror::scheduler::default_workers(),
            n => n,
        },
        retry,
        show_progress: settings.progress_bar,
    };
    info!(
        "mirroring profile {name} to {} with {} worker(s)",
        target.display(),
        options.workers
    );

    let stats = mirror::run_profile(&endpoint, profile, &target, &options)?;
    if stats.failed > 0 {
        bail!("{} file(s) could not be mirrored; see logs", stats.failed);
    }
    Ok(())
}

fn print_profiles(remote: &SyncConfig) {
    for (name, profile) in &remote.profiles {
        println!(
            "{name}: {} ({} data root(s), {} exclusion(s))",
            profile.title,
            profile.data.len(),
            profile.exclude.len()
        );
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
