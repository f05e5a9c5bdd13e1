//! mediadetect - watches for removable media and dispatches the configured
//! actions for each recognised medium.

use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};

use mediadetect::{
    config::{Config, ConfigPaths},
    detector::{
        DetectorControl, DeviceEventSource, GLOBAL_SECTION, GlobalOptions, MediaDetector, MediaHandle, Rules,
        TesterRegistry,
    },
    dispatch::{ActionSink, Dispatcher, JsonSink, LogSink},
    services::UDisksEventSource,
    tracing_config,
};

#[derive(Parser)]
#[command(name = "mediadetect")]
#[command(about = "Detect inserted removable media and dispatch actions", version)]
struct Cli {
    /// Settings file, created with defaults when missing
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Rules file, overrides the one named in the settings
    #[arg(short, long, global = true)]
    rules: Option<PathBuf>,

    /// Print detections and devices as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch for media until interrupted. SIGUSR1 requests a manual scan
    Run,
    /// Scan the known devices once and exit
    Scan,
    /// Validate the rules file
    Check,
    /// List block devices and what the detector sees on them
    Devices,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => ConfigPaths::main_config()?,
    };
    let config = Config::load(&config_path)?;
    let rules_file = match &cli.rules {
        Some(path) => path.clone(),
        None => config.detector.rules_path()?,
    };

    let _guard = match cli.command {
        Commands::Run => Some(tracing_config::init_with_file(config.general.log_level)?),
        _ => {
            tracing_config::init(config.general.log_level)?;
            None
        }
    };

    match cli.command {
        Commands::Run => run(&config, &rules_file, cli.json).await,
        Commands::Scan => scan(&config, &rules_file, cli.json).await,
        Commands::Check => check(&config, &rules_file),
        Commands::Devices => devices(cli.json).await,
    }
}

fn sink(json: bool) -> Box<dyn ActionSink> {
    if json {
        Box::new(JsonSink::new(std::io::stdout()))
    } else {
        Box::new(LogSink)
    }
}

async fn detector(config: &Config, rules_file: &Path) -> Result<MediaDetector, Box<dyn Error>> {
    let source = Arc::new(UDisksEventSource::connect().await?);
    let detector =
        MediaDetector::initialize(source, rules_file, config.detector.settings()).await?;
    Ok(detector)
}

fn watch_signals(control: DetectorControl) -> Result<(), Box<dyn Error>> {
    let mut usr1 = signal(SignalKind::user_defined1())?;
    let scan_control = control.clone();

    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            info!("Manual scan requested");
            scan_control.start_manual_scan();
        }
    });

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupted, stopping"),
            Err(e) => error!("Cannot listen for interrupt: {e}"),
        }
        control.stop();
    });

    Ok(())
}

async fn run(config: &Config, rules_file: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    info!(rules = %rules_file.display(), "Starting media detector");

    let mut detector = detector(config, rules_file).await?;
    let dispatcher = Dispatcher::new(sink(json), config.dispatch.key_delay());
    watch_signals(detector.control())?;

    while let Some(detection) = detector.detect().await {
        if let Err(e) = dispatcher.dispatch(&detection).await {
            warn!(description = %detection.description, "Dispatch aborted: {e}");
        }
    }

    info!("Media detector stopped");
    Ok(())
}

async fn scan(config: &Config, rules_file: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    let mut detector = detector(config, rules_file).await?;

    match detector.scan_now().await {
        Some(detection) => {
            Dispatcher::new(sink(json), config.dispatch.key_delay())
                .dispatch(&detection)
                .await?;
        }
        None => info!("No media found"),
    }

    Ok(())
}

fn check(config: &Config, rules_file: &Path) -> Result<(), Box<dyn Error>> {
    let rules = Rules::load(rules_file)?;

    if let Some(section) = rules.section(GLOBAL_SECTION) {
        let global = GlobalOptions::from_section(section, &config.detector.fstab)?;
        println!(
            "global: {} filter substrings, {} filtered devices, {} scan devices",
            global.filter.substrings().count(),
            global.filter.exact().count(),
            global.scan_devices.len()
        );
    }

    let mut registry = TesterRegistry::with_builtin(config.detector.settings().mount_retry);
    registry.register_rules(&rules)?;

    for tester in registry.registered() {
        println!("{}: {}", tester.type_tag(), tester.description());
    }
    println!("{}: OK", rules_file.display());

    Ok(())
}

async fn devices(json: bool) -> Result<(), Box<dyn Error>> {
    let source = UDisksEventSource::connect().await?;

    for path in source.enumerate_devices().await? {
        let props = match source.describe(&path).await {
            Ok(props) => props,
            Err(e) => {
                warn!(device = %path, "Cannot describe device: {e}");
                continue;
            }
        };
        let handle = MediaHandle::from_properties(path, props);

        if json {
            println!("{}", serde_json::to_string(&handle)?);
        } else {
            println!(
                "{:<16} {:<10} {:?}",
                handle.device_file(),
                handle.fs_type(),
                handle.media_mask()
            );
        }
    }
    Ok(())
}
