use android_adb_bot::adb::{AdbBackend, DeviceControl};
use android_adb_bot::args::{Args, Mode, print_help};
use android_adb_bot::config::AppConfig;
use android_adb_bot::game_automation::{
    AutomationError, AutomationResult, CancelToken, Component, PlaybookKind, TemplateRegistry,
};
use android_adb_bot::worker::{WorkerHandle, resolve_devices, spawn_workers};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const STATUS_INTERVAL: Duration = Duration::from_secs(30);
const SCREENSHOT_FILE: &str = "cli-screenshot.png";

fn main() -> ExitCode {
    let args = match Args::parse() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            print_help();
            return ExitCode::FAILURE;
        }
    };

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::info!(
        "🤖 Android ADB Bot v{} (c) {}",
        env!("APP_VERSION_DISPLAY"),
        env!("APP_BUILD_YEAR")
    );

    let config = match AppConfig::from_env() {
        Ok(config) => config.apply_args(&args),
        Err(e) => {
            log::error!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("❌ Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async move {
        match args.mode {
            Mode::ListDevices => list_devices(&config).await,
            Mode::Screenshot => screenshot(&config).await,
            Mode::Run => run(config).await,
        }
    });

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn list_devices(config: &AppConfig) -> AutomationResult<bool> {
    let devices = AdbBackend::list_devices(config.backend).await?;
    if devices.is_empty() {
        println!("❌ No devices found");
        return Ok(false);
    }
    for device in devices {
        match device.transport_id {
            Some(transport) => println!("📱 {} (transport {})", device.name, transport),
            None => println!("📱 {}", device.name),
        }
    }
    Ok(true)
}

async fn screenshot(config: &AppConfig) -> AutomationResult<bool> {
    let devices = resolve_devices(config).await?;
    let Some(name) = devices.first() else {
        return Ok(false);
    };
    let client = AdbBackend::connect(name, config.backend).await?;
    let (sx, sy) = client.screen_dimensions();
    println!(
        "📱 Device: {} size: {}x{} (backend={})",
        client.device_name(),
        sx,
        sy,
        client.kind()
    );
    let capture = client.screen_capture().await?;
    tokio::fs::write(SCREENSHOT_FILE, &capture.bytes).await?;
    println!(
        "✅ Screenshot ({}ms) saved to {}",
        capture.duration_ms, SCREENSHOT_FILE
    );
    client.disconnect().await?;
    Ok(true)
}

/// Components to load: the playbook's own, plus the lock screen check when
/// its reference image is present.
fn components_for(config: &AppConfig) -> Vec<Component> {
    let mut components = config.playbook.components().to_vec();
    let lock_dir = config
        .res_dir
        .join(Component::UnlockPhone.dir_name())
        .join("res");
    if config.playbook != PlaybookKind::UnlockPhone && lock_dir.is_dir() {
        components.push(Component::UnlockPhone);
    }
    components
}

async fn run(config: AppConfig) -> AutomationResult<bool> {
    config.validate()?;
    let templates = Arc::new(TemplateRegistry::load(
        &config.res_dir,
        &components_for(&config),
    )?);
    let devices = resolve_devices(&config).await?;
    log::info!(
        "🚀 Running {} on {} device(s) with impl={}",
        config.playbook,
        devices.len(),
        config.backend
    );

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("🛑 Ctrl-C received, stopping workers");
                cancel.cancel();
            }
        });
    }

    let workers = spawn_workers(Arc::new(config), devices, templates, cancel.clone())?;
    report_status(&workers, &cancel).await;

    let reports = tokio::task::spawn_blocking(move || {
        workers
            .into_iter()
            .map(WorkerHandle::join)
            .collect::<Vec<_>>()
    })
    .await?;

    let mut all_ok = true;
    for report in reports {
        match report.result {
            Ok(()) => log::info!(
                "✅ {}: {} iterations",
                report.device,
                report.iterations
            ),
            Err(AutomationError::Cancelled) => log::info!("🛑 {}: cancelled", report.device),
            Err(e) => {
                all_ok = false;
                log::error!("❌ {}: {}", report.device, e);
            }
        }
    }
    Ok(all_ok)
}

/// Log every worker's status periodically until all workers are done or a
/// stop was requested.
async fn report_status(workers: &[WorkerHandle], cancel: &CancelToken) {
    let mut ticker = tokio::time::interval(STATUS_INTERVAL);
    // The first tick fires immediately
    ticker.tick().await;
    while !workers.iter().all(WorkerHandle::is_finished) {
        tokio::select! {
            _ = ticker.tick() => {
                for worker in workers {
                    log::info!("📊 {}", *worker.status.borrow());
                }
            }
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
    }
}
