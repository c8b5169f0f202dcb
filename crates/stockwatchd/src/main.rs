// # stockwatchd - Restock Check
//
// One invocation performs one check and exits. Scheduling (cron, systemd
// timers, CI schedules) is external.
//
// This binary is a THIN integration layer:
// - Reads configuration from environment variables
// - Wires the HTTP prober, notification channels and state store
// - Hands control to `stockwatch_core::StockMonitor`
// - Always exits 0; failures are logged and retried by the next run
//
// ## Configuration
//
// ### Channels (a channel is enabled only when all its variables are set)
// - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`: Telegram bot delivery
// - `BARK_KEY`: Bark push delivery
//
// ### State Store
// - `STOCKWATCH_STATE_STORE`: `file` (default) or `memory`
// - `STOCKWATCH_STATE_PATH`: State file (default: `.stock_state.json` next to the binary)
//
// ### Runtime
// - `STOCKWATCH_LOG_LEVEL`: trace, debug, info (default), warn, error
// - `STOCKWATCH_MODE`: `dry-run` to log messages instead of sending them
// - `STOCKWATCH_PROBE_DELAY_MS`: Pause between product checks (default: 1000)
//
// ## Example
//
// ```bash
// export TELEGRAM_BOT_TOKEN=123456:ABC...
// export TELEGRAM_CHAT_ID=987654321
// export BARK_KEY=your_device_key
//
// stockwatchd                  # announce restocks
// stockwatchd --daily-report   # send the full status digest
// ```

use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use stockwatch_core::config::{DEFAULT_STATE_FILE_NAME, ProbeConfig};
use stockwatch_core::{
    BarkConfig, FileStateStore, MemoryStateStore, MonitorConfig, MonitorEvent, Notifier,
    RunMode, RunSummary, StateStore, StateStoreConfig, StockMonitor, TelegramConfig,
};
use stockwatch_probe_http::HttpStockProber;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Command line interface
#[derive(Debug, Parser)]
#[command(name = "stockwatchd", version, about = "Check hosting offers and announce restocks")]
struct Cli {
    /// Send the full status digest instead of restock alerts
    #[arg(long)]
    daily_report: bool,
}

/// Result of reading the command line
#[derive(Debug)]
enum Invocation {
    /// Proceed with a check; `ignored` holds the parse error for bad arguments
    Run {
        mode: RunMode,
        ignored: Option<String>,
    },
    /// `--help` or `--version`: print and stop
    Exit(clap::Error),
}

impl Invocation {
    fn parse<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let args: Vec<std::ffi::OsString> = args.into_iter().map(Into::into).collect();

        match Cli::try_parse_from(&args) {
            Ok(cli) => Invocation::Run {
                mode: mode_for(cli.daily_report),
                ignored: None,
            },
            Err(e) => match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    Invocation::Exit(e)
                }
                _ => {
                    // Stray arguments must not cost the digest
                    let daily_report = args.iter().skip(1).any(|arg| arg == "--daily-report");
                    Invocation::Run {
                        mode: mode_for(daily_report),
                        ignored: Some(e.to_string().lines().next().unwrap_or_default().to_string()),
                    }
                }
            },
        }
    }
}

/// Print help or version text; reports whether the write succeeded
fn show_usage(e: &clap::Error) -> bool {
    match e.print() {
        Ok(()) => true,
        Err(io_err) => {
            eprintln!("Failed to print usage: {}", io_err);
            false
        }
    }
}

fn mode_for(daily_report: bool) -> RunMode {
    if daily_report {
        RunMode::DailyReport
    } else {
        RunMode::Transitions
    }
}

/// Application configuration
struct Config {
    telegram: Option<TelegramConfig>,
    bark: Option<BarkConfig>,
    state_store_type: String,
    state_path: Option<String>,
    log_level: Level,
    dry_run: bool,
    probe_delay_ms: u64,
    /// Invalid values that were replaced by defaults, logged once tracing is up
    warnings: Vec<String>,
}

// Secrets live inside the channel configs, whose Debug output is redacted
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("telegram", &self.telegram)
            .field("bark", &self.bark)
            .field("state_store_type", &self.state_store_type)
            .field("state_path", &self.state_path)
            .field("log_level", &self.log_level)
            .field("dry_run", &self.dry_run)
            .field("probe_delay_ms", &self.probe_delay_ms)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    ///
    /// Empty values count as unset. Invalid values fall back to their
    /// defaults and are recorded in `warnings`.
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut warnings = Vec::new();

        let dry_run = match get("STOCKWATCH_MODE").as_deref() {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => {
                warnings.push(format!(
                    "STOCKWATCH_MODE '{}' is not valid (expected dry-run or live), running live",
                    other
                ));
                false
            }
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig {
                dry_run,
                ..TelegramConfig::new(token, chat_id)
            }),
            (Some(_), None) | (None, Some(_)) => {
                warnings.push(
                    "Telegram needs both TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID, channel disabled"
                        .to_string(),
                );
                None
            }
            (None, None) => None,
        };

        let bark = get("BARK_KEY").map(|key| BarkConfig {
            dry_run,
            ..BarkConfig::new(key)
        });

        let state_store_type = match get("STOCKWATCH_STATE_STORE").as_deref() {
            None => "file".to_string(),
            Some(kind @ ("file" | "memory")) => kind.to_string(),
            Some(other) => {
                warnings.push(format!(
                    "STOCKWATCH_STATE_STORE '{}' is not supported (file, memory), using file",
                    other
                ));
                "file".to_string()
            }
        };

        let log_level = match get("STOCKWATCH_LOG_LEVEL") {
            None => Level::INFO,
            Some(raw) => match raw.to_lowercase().as_str() {
                "trace" => Level::TRACE,
                "debug" => Level::DEBUG,
                "info" => Level::INFO,
                "warn" => Level::WARN,
                "error" => Level::ERROR,
                _ => {
                    warnings.push(format!(
                        "STOCKWATCH_LOG_LEVEL '{}' is not valid (trace, debug, info, warn, error), using info",
                        raw
                    ));
                    Level::INFO
                }
            },
        };

        let default_delay = ProbeConfig::default().delay_ms;
        let probe_delay_ms = match get("STOCKWATCH_PROBE_DELAY_MS") {
            None => default_delay,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warnings.push(format!(
                    "STOCKWATCH_PROBE_DELAY_MS '{}' is not a number of milliseconds, using {}",
                    raw, default_delay
                ));
                default_delay
            }),
        };

        Self {
            telegram,
            bark,
            state_store_type,
            state_path: get("STOCKWATCH_STATE_PATH"),
            log_level,
            dry_run,
            probe_delay_ms,
            warnings,
        }
    }

    /// Core configuration for this run
    fn monitor_config(&self) -> MonitorConfig {
        let mut config = MonitorConfig::new();
        config.probe.delay_ms = self.probe_delay_ms;
        config.state_store = match self.state_store_type.as_str() {
            "memory" => StateStoreConfig::Memory,
            _ => StateStoreConfig::File {
                path: self
                    .state_path
                    .clone()
                    .unwrap_or_else(|| default_state_path().display().to_string()),
            },
        };
        config
    }
}

/// State file next to the executable, or in the working directory if that is unknown
fn default_state_path() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_STATE_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE_NAME))
}

fn main() -> ExitCode {
    let (mode, config) = match Invocation::parse(env::args_os()) {
        Invocation::Exit(e) => {
            // Help and version text; nothing to run
            show_usage(&e);
            return ExitCode::SUCCESS;
        }
        Invocation::Run { mode, ignored } => {
            let config = Config::from_env();

            let subscriber = FmtSubscriber::builder()
                .with_max_level(config.log_level)
                .finish();
            if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
                eprintln!("Failed to set tracing subscriber: {}", e);
            }

            if let Some(reason) = ignored {
                warn!("Ignoring command line arguments: {}", reason);
            }
            for warning in &config.warnings {
                warn!("{}", warning);
            }

            (mode, config)
        }
    };

    info!(
        "Starting stockwatchd [mode: {}] [{}]",
        mode,
        if config.dry_run { "DRY-RUN" } else { "LIVE" }
    );
    debug!("Configuration: {:?}", config);

    // A single check needs no worker threads
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ExitCode::SUCCESS;
        }
    };

    match rt.block_on(run_check(config, mode)) {
        Ok(summary) => {
            info!(
                "Check complete: {} in stock, {} out of stock, {} unknown; {} alert(s), {} delivery(ies), {} failure(s); state saved: {}",
                summary.in_stock,
                summary.out_of_stock,
                summary.unknown,
                summary.notifications,
                summary.deliveries,
                summary.delivery_failures,
                summary.state_saved
            );
        }
        Err(e) => error!("Check aborted: {:#}", e),
    }

    ExitCode::SUCCESS
}

/// Wire the components and run one check
async fn run_check(config: Config, mode: RunMode) -> Result<RunSummary> {
    let monitor_config = config.monitor_config();

    let prober =
        HttpStockProber::new(&monitor_config.probe).context("Failed to create HTTP prober")?;
    let notifiers = build_notifiers(&config);
    let state_store = build_state_store(&monitor_config.state_store);

    let (monitor, mut events) = StockMonitor::new(
        Box::new(prober),
        notifiers,
        state_store,
        monitor_config,
    )
    .context("Failed to create monitor")?;

    if monitor.channel_names().is_empty() {
        warn!("No notification channels configured; changes will only be logged");
    } else {
        info!("Notification channels: {}", monitor.channel_names().join(", "));
    }

    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let summary = monitor.run(mode).await;

    // Dropping the monitor closes the event channel
    drop(monitor);
    if let Err(e) = event_logger.await {
        warn!("Event logger stopped abnormally: {}", e);
    }

    Ok(summary)
}

fn log_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::DeliveryFailed {
            channel,
            kind,
            error,
        } => debug!("Event: {:?} delivery via {} failed: {}", kind, channel, error),
        other => debug!("Event: {:?}", other),
    }
}

/// Build every channel that is compiled in and configured
fn build_notifiers(config: &Config) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    match &config.telegram {
        #[cfg(feature = "telegram")]
        Some(telegram) => match stockwatch_notify_telegram::TelegramNotifier::new(telegram) {
            Ok(notifier) => notifiers.push(Box::new(notifier)),
            Err(e) => warn!("Telegram channel disabled: {}", e),
        },
        #[cfg(not(feature = "telegram"))]
        Some(_) => warn!("Telegram credentials set but the telegram feature is not compiled in"),
        None => info!("Telegram not configured, skipping"),
    }

    match &config.bark {
        #[cfg(feature = "bark")]
        Some(bark) => match stockwatch_notify_bark::BarkNotifier::new(bark) {
            Ok(notifier) => notifiers.push(Box::new(notifier)),
            Err(e) => warn!("Bark channel disabled: {}", e),
        },
        #[cfg(not(feature = "bark"))]
        Some(_) => warn!("Bark key set but the bark feature is not compiled in"),
        None => info!("Bark not configured, skipping"),
    }

    notifiers
}

fn build_state_store(config: &StateStoreConfig) -> Box<dyn StateStore> {
    match config {
        StateStoreConfig::File { path } => {
            info!("State file: {}", path);
            Box::new(FileStateStore::new(path))
        }
        StateStoreConfig::Memory => {
            warn!("Using in-memory state store; notification flags will not persist");
            Box::new(MemoryStateStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert!(config.telegram.is_none());
        assert!(config.bark.is_none());
        assert_eq!(config.state_store_type, "file");
        assert_eq!(config.log_level, Level::INFO);
        assert!(!config.dry_run);
        assert_eq!(config.probe_delay_ms, 1000);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn channels_enabled_by_credentials() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "42"),
            ("BARK_KEY", "devkey"),
        ]);
        let telegram = config.telegram.as_ref().unwrap();
        assert_eq!(telegram.bot_token, "123:abc");
        assert_eq!(telegram.chat_id, "42");
        assert_eq!(config.bark.as_ref().unwrap().key, "devkey");
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", ""),
            ("TELEGRAM_CHAT_ID", ""),
            ("BARK_KEY", "  "),
            ("STOCKWATCH_LOG_LEVEL", ""),
        ]);
        assert!(config.telegram.is_none());
        assert!(config.bark.is_none());
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn half_configured_telegram_is_disabled_with_warning() {
        let config = config_from(&[("TELEGRAM_BOT_TOKEN", "123:abc")]);
        assert!(config.telegram.is_none());
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("STOCKWATCH_STATE_STORE", "redis"),
            ("STOCKWATCH_LOG_LEVEL", "loud"),
            ("STOCKWATCH_PROBE_DELAY_MS", "soon"),
            ("STOCKWATCH_MODE", "rehearsal"),
        ]);
        assert_eq!(config.state_store_type, "file");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.probe_delay_ms, 1000);
        assert!(!config.dry_run);
        assert_eq!(config.warnings.len(), 4);
    }

    #[test]
    fn dry_run_reaches_every_channel() {
        let config = config_from(&[
            ("STOCKWATCH_MODE", "dry-run"),
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TELEGRAM_CHAT_ID", "c"),
            ("BARK_KEY", "k"),
        ]);
        assert!(config.dry_run);
        assert!(config.telegram.unwrap().dry_run);
        assert!(config.bark.unwrap().dry_run);
    }

    #[test]
    fn monitor_config_uses_state_settings() {
        let config = config_from(&[
            ("STOCKWATCH_STATE_PATH", "/tmp/stock.json"),
            ("STOCKWATCH_PROBE_DELAY_MS", "0"),
            ("STOCKWATCH_LOG_LEVEL", "DEBUG"),
        ]);
        assert_eq!(config.log_level, Level::DEBUG);

        let monitor_config = config.monitor_config();
        assert_eq!(monitor_config.probe.delay_ms, 0);
        assert_eq!(
            monitor_config.state_store,
            StateStoreConfig::File {
                path: "/tmp/stock.json".to_string()
            }
        );
        assert!(monitor_config.validate().is_ok());

        let memory = config_from(&[("STOCKWATCH_STATE_STORE", "memory")]).monitor_config();
        assert_eq!(memory.state_store, StateStoreConfig::Memory);
    }

    #[test]
    fn default_state_file_sits_next_to_binary() {
        let path = default_state_path();
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some(DEFAULT_STATE_FILE_NAME)
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:very_secret"),
            ("TELEGRAM_CHAT_ID", "42"),
            ("BARK_KEY", "secret_device_key"),
        ]);
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("very_secret"));
        assert!(!debug_str.contains("secret_device_key"));
    }

    #[test]
    fn cli_selects_mode() {
        assert!(matches!(
            Invocation::parse(["stockwatchd"]),
            Invocation::Run { mode: RunMode::Transitions, ignored: None }
        ));
        assert!(matches!(
            Invocation::parse(["stockwatchd", "--daily-report"]),
            Invocation::Run { mode: RunMode::DailyReport, ignored: None }
        ));
    }

    #[test]
    fn cli_ignores_unknown_arguments() {
        match Invocation::parse(["stockwatchd", "--bogus"]) {
            Invocation::Run { mode, ignored } => {
                assert_eq!(mode, RunMode::Transitions);
                assert!(ignored.is_some());
            }
            Invocation::Exit(_) => panic!("unknown arguments must not stop the run"),
        }

        match Invocation::parse(["stockwatchd", "--daily-report", "extra"]) {
            Invocation::Run { mode, ignored } => {
                assert_eq!(mode, RunMode::DailyReport);
                assert!(ignored.is_some());
            }
            Invocation::Exit(_) => panic!("unknown arguments must not stop the run"),
        }
    }

    #[test]
    fn cli_help_and_version_exit() {
        match Invocation::parse(["stockwatchd", "--help"]) {
            Invocation::Exit(e) => assert!(show_usage(&e)),
            Invocation::Run { .. } => panic!("--help must not start a run"),
        }
        assert!(matches!(
            Invocation::parse(["stockwatchd", "--version"]),
            Invocation::Exit(_)
        ));
    }
}
