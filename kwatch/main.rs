use anyhow::Result;
use clap::Parser;
use kwatch_config::{APP_NAME, APP_VERSION, Config, ResourceType, WatchMethod};
use kwatch_kube::{BgWatcher, WatchMode, WatchNotice, WatchTuning, WatchedKind, new_client};
use kwatch_sync::{DEFAULT_DISPATCH_WORKERS, DedupCache, Dispatcher, DispatcherContext, Notifier};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Builder;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub mod cli;

const EVENT_QUEUE_SIZE: usize = 256;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    let args = cli::Args::parse();

    let rt = match Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(error) => {
            eprintln!("{APP_NAME}: cannot start async runtime: {error}");
            return ExitCode::from(EXIT_FATAL);
        },
    };

    // config problems are reported on stderr since logging is configured by the config itself
    let config = match rt.block_on(Config::load(&args.config)) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{APP_NAME}: {error}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        },
    };

    let _logging_guard =
        match kwatch_common::logging::initialize(config.logging.level.as_directive(), config.logging.format.is_json()) {
            Ok(guard) => guard,
            Err(error) => {
                eprintln!("{APP_NAME}: cannot initialize logging: {error}");
                return ExitCode::from(EXIT_CONFIG_ERROR);
            },
        };

    info!("{} v{} started", APP_NAME, APP_VERSION);

    let exit_code = match rt.block_on(run_watcher(config)) {
        Ok(code) => code,
        Err(error) => {
            error!("{} v{} terminated with an error: {}", APP_NAME, APP_VERSION, error);
            ExitCode::from(EXIT_FATAL)
        },
    };

    info!("{} v{} stopped", APP_NAME, APP_VERSION);
    exit_code
}

async fn run_watcher(config: Config) -> Result<ExitCode> {
    let file_mode = config.output.file_mode()?;

    // an unusable output root can never recover, so bail out before watching anything
    if let Err(error) = tokio::fs::create_dir_all(&config.output.folder).await {
        error!("Output root '{}' is not writable: {}", config.output.folder.display(), error);
        return Ok(ExitCode::from(EXIT_FATAL));
    }

    let settings = config.resources.watch_config;
    let client = new_client(Duration::from_secs(settings.client_timeout)).await?;

    let namespace = match config.kubernetes.namespace.as_str() {
        "" => None,
        namespace => Some(namespace.to_owned()),
    };
    let mode = match config.resources.method {
        WatchMethod::Watch => WatchMode::Stream,
        WatchMethod::Sleep => WatchMode::Poll,
    };
    let tuning = WatchTuning {
        server_timeout: Duration::from_secs(settings.server_timeout),
        error_throttle: Duration::from_secs(settings.error_throttle_time),
    };
    let kinds: Vec<WatchedKind> = match config.resources.kind {
        ResourceType::ConfigMap => vec![WatchedKind::ConfigMaps],
        ResourceType::Secret => vec![WatchedKind::Secrets],
        ResourceType::Both => vec![WatchedKind::ConfigMaps, WatchedKind::Secrets],
    };

    let (notices_tx, mut notices_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
    let mut watchers = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let mut watcher = BgWatcher::new(kind);
        watcher.start(client.clone(), namespace.clone(), mode, tuning, notices_tx.clone())?;
        watchers.push(watcher);
    }
    drop(notices_tx);

    let shutdown = CancellationToken::new();
    let context = Arc::new(DispatcherContext {
        rules: config.resources.labels.clone(),
        output: config.output.clone(),
        file_mode,
        ignore_processed: settings.ignore_processed,
        dedup: DedupCache::new(),
        notifier: Notifier::new(shutdown.child_token()),
    });
    let dispatcher = Dispatcher::start(context, DEFAULT_DISPATCH_WORKERS);

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut exit_code = ExitCode::SUCCESS;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; shutting down");
                break;
            },
            _ = sigterm.recv() => {
                info!("Termination requested; shutting down");
                break;
            },
            notice = notices_rx.recv() => match notice {
                Some(WatchNotice::Event(event)) => dispatcher.dispatch(event).await,
                Some(WatchNotice::Ready(kind)) => info!("Initial {} listing complete", kind),
                Some(WatchNotice::Fatal(reason)) => {
                    error!("Fatal watcher error: {}", reason);
                    exit_code = ExitCode::from(EXIT_FATAL);
                    break;
                },
                None => break,
            },
        }
    }

    for watcher in &mut watchers {
        watcher.cancel();
    }

    // hand already queued events to the dispatcher, then give it a bounded drain window
    notices_rx.close();
    while let Some(notice) = notices_rx.recv().await {
        if let WatchNotice::Event(event) = notice {
            dispatcher.dispatch(event).await;
        }
    }

    if tokio::time::timeout(SHUTDOWN_GRACE, dispatcher.stop()).await.is_err() {
        warn!("In-flight events were abandoned after {} seconds", SHUTDOWN_GRACE.as_secs());
    }

    shutdown.cancel();
    for mut watcher in watchers {
        watcher.stop().await;
    }

    Ok(exit_code)
}
