use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use procwatch_daemon::{
    cli::Cli,
    collector::LinuxProcessCollector,
    config::Config,
    supervisor::Supervisor,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Returns the merged config and, if the default config file was unusable, why.
fn load_config(cli: &Cli) -> Result<(Config, Option<String>)> {
    let mut fallback = None;
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let path = Config::config_path();
            if path.exists() {
                Config::load(&path).unwrap_or_else(|e| {
                    fallback = Some(e.to_string());
                    Config::default()
                })
            } else {
                Config::default()
            }
        }
    };
    cli.apply(&mut config);
    Ok((config, fallback))
}

fn init_logging(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
            e.print()?;
            return Ok(code);
        }
    };

    let (config, fallback) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"))?;
            error!("{}", e);
            return Ok(ExitCode::from(1));
        }
    };
    init_logging(&config.general.log_level)?;
    if let Some(reason) = fallback {
        warn!("Failed to load config: {}, using defaults", reason);
    }
    let validated = config
        .monitor_settings()
        .and_then(|settings| config.duplicate_policy().map(|policy| (settings, policy)));
    let (settings, policy) = match validated {
        Ok(validated) => validated,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::from(1));
        }
    };

    info!("Monitoring processes: {}", config.monitor.processes.join(" "));
    info!("Output directory: {}", settings.output_dir.display());
    info!("CPU usage interval: {} seconds", settings.cpu_interval);
    info!("Memory usage interval: {} seconds", settings.mem_interval);
    info!("Output format: {}", settings.format);

    let collector = Arc::new(LinuxProcessCollector::new().with_policy(policy));
    let supervisor = Supervisor::spawn(&config.monitor.processes, &settings, collector)?;

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, stopping {} monitor(s)...", supervisor.len());
    supervisor.shutdown().await;

    Ok(ExitCode::SUCCESS)
}
