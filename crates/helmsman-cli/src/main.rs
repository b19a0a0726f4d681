mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_LOCKED};
use helmsman_config::{DeploymentProfile, ServiceRegistry};
use helmsman_core::{Engine, RunLock};
use helmsman_host::{HostExecutor, ImageSource, Provisioner};
use helmsman_snapshot::{SnapshotLayout, SnapshotManager};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Staging tree the provisioner chroots into (an overlay of the live root).
const STAGING_ROOT: &str = "/overlay/merged";
/// The overlay's writable upper layer.
const UPPER_DIR: &str = "/overlay/upper";
/// The live root filesystem.
const LIVE_ROOT: &str = "/";
/// Run lock; on tmpfs so a crash never leaves a stale lock across boots.
const LOCK_PATH: &str = "/run/helmsman.lock";

#[derive(Debug, Parser)]
#[command(
    name = "helmsman",
    version,
    about = "Declarative service reconciliation for appliance hosts"
)]
struct Cli {
    /// Mount point for the btrfs top level used for snapshot work.
    #[arg(long, default_value = "/mnt", global = true)]
    root: PathBuf,

    /// Path to a registry document overriding the bundled one.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Restrict reconciliation to built-in default services.
    #[arg(long, default_value_t = false, global = true)]
    defaults_only: bool,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile the declared configuration against host state.
    Load {
        /// Path to the declared service configuration.
        #[arg(long, default_value = "/etc/helmsman/services.conf")]
        config: PathBuf,
    },
    /// Refresh images of enabled services whose registry digest moved.
    Update {
        /// Path to the declared service configuration.
        #[arg(long, default_value = "/etc/helmsman/services.conf")]
        config: PathBuf,
    },
    /// Restore the previous snapshot and reboot.
    Rollback {
        /// Swap subvolumes but do not reboot afterwards.
        #[arg(long, default_value_t = false)]
        no_reboot: bool,
    },
    /// List system snapshots.
    Snapshots,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("HELMSMAN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let profile = if cli.defaults_only {
        DeploymentProfile::DefaultsOnly
    } else {
        DeploymentProfile::DynamicProvisioning
    };
    let registry = match load_registry(cli.registry.as_deref(), profile) {
        Ok(registry) => registry,
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let exec = HostExecutor::new();
    let engine = Engine::new(
        &exec,
        registry,
        ImageSource::from_env(),
        Provisioner::new(STAGING_ROOT, UPPER_DIR, LIVE_ROOT),
        SnapshotManager::new(SnapshotLayout::new(&cli.root)),
        default_config_path(&cli.command),
    )
    .manage_mount(true);
    let json_output = cli.json;

    // Every subcommand except completions mutates or inspects shared host
    // state, so they all run under the exclusive lock.
    let _lock = if matches!(cli.command, Commands::Completions { .. }) {
        None
    } else {
        match RunLock::try_acquire(Path::new(LOCK_PATH)) {
            Ok(lock) => Some(lock),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(EXIT_LOCKED);
            }
        }
    };

    let result = match cli.command {
        Commands::Load { config } => commands::load::run(&engine, &config, json_output),
        Commands::Update { config } => commands::update::run(&engine, &config, json_output),
        Commands::Rollback { no_reboot } => {
            commands::rollback::run(&engine, no_reboot, json_output)
        }
        Commands::Snapshots => commands::snapshots::run(&engine, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("invalid configuration")
                || msg.starts_with("registry document error")
            {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("another run holds the lock") {
                EXIT_LOCKED
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn default_config_path(command: &Commands) -> PathBuf {
    match command {
        Commands::Load { config } | Commands::Update { config } => config.clone(),
        _ => PathBuf::from("/etc/helmsman/services.conf"),
    }
}

fn load_registry(
    path: Option<&Path>,
    profile: DeploymentProfile,
) -> Result<ServiceRegistry, String> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read registry {}: {e}", path.display()))?;
            ServiceRegistry::from_document(&text, profile).map_err(|e| e.to_string())
        }
        None => ServiceRegistry::bundled(profile).map_err(|e| e.to_string()),
    }
}
