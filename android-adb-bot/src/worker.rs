//! One worker per device. Each worker owns its device session on its own OS
//! thread with a single-threaded tokio runtime; workers share nothing but
//! the read-only template registry and the cancel token.

use crate::adb::{AdbBackend, BackendKind, DeviceControl};
use crate::config::AppConfig;
use crate::game_automation::{
    ActionDispatcher, AutomationError, AutomationResult, CancelToken, ScreenStateEngine,
    SessionStatus, TemplateRegistry,
};
use std::sync::Arc;
use std::thread;
use tokio::sync::watch;

/// Outcome of one worker.
#[derive(Debug)]
pub struct WorkerReport {
    pub device: String,
    pub iterations: u64,
    pub result: AutomationResult<()>,
}

pub struct WorkerHandle {
    pub device: String,
    pub status: watch::Receiver<SessionStatus>,
    thread: thread::JoinHandle<WorkerReport>,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the worker ends.
    pub fn join(self) -> WorkerReport {
        match self.thread.join() {
            Ok(report) => report,
            Err(_) => WorkerReport {
                result: Err(AutomationError::WorkerPanicked(self.device.clone())),
                device: self.device,
                iterations: 0,
            },
        }
    }
}

/// Configured devices, or every attached device when none are configured.
pub async fn resolve_devices(config: &AppConfig) -> AutomationResult<Vec<String>> {
    if !config.devices.is_empty() {
        return Ok(config.devices.clone());
    }
    let devices = AdbBackend::list_devices(config.backend).await?;
    if devices.is_empty() {
        return Err(crate::adb::AdbError::NoDevices.into());
    }
    Ok(devices.into_iter().map(|d| d.name).collect())
}

pub fn spawn_workers(
    config: Arc<AppConfig>,
    devices: Vec<String>,
    templates: Arc<TemplateRegistry>,
    cancel: CancelToken,
) -> AutomationResult<Vec<WorkerHandle>> {
    let mut workers = Vec::with_capacity(devices.len());
    for device in devices {
        let (status_tx, status_rx) = watch::channel(SessionStatus::new(&device));
        let config = Arc::clone(&config);
        let templates = Arc::clone(&templates);
        let cancel = cancel.clone();
        let name = device.clone();
        let thread = thread::Builder::new()
            .name(format!("worker-{device}"))
            .spawn(move || run_worker(name, config, templates, cancel, status_tx))?;
        log::info!("🧵 Worker started for {device}");
        workers.push(WorkerHandle {
            device,
            status: status_rx,
            thread,
        });
    }
    Ok(workers)
}

fn run_worker(
    device: String,
    config: Arc<AppConfig>,
    templates: Arc<TemplateRegistry>,
    cancel: CancelToken,
    status: watch::Sender<SessionStatus>,
) -> WorkerReport {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            return WorkerReport {
                device,
                iterations: 0,
                result: Err(e.into()),
            };
        }
    };

    let published = status.subscribe();
    let result = runtime.block_on(session(&device, &config, templates, cancel, status));
    let last = published.borrow().clone();
    into_report(device, result, &last)
}

/// Iterations come from the published status when the session failed
/// part way through.
fn into_report(
    device: String,
    result: AutomationResult<u64>,
    status: &SessionStatus,
) -> WorkerReport {
    match result {
        Ok(iterations) => {
            log::info!("🏁 {device}: done after {iterations} iterations");
            WorkerReport {
                device,
                iterations,
                result: Ok(()),
            }
        }
        Err(e) => {
            log::error!(
                "❌ {device}: worker stopped after {} iterations: {e}",
                status.iterations
            );
            WorkerReport {
                device,
                iterations: status.iterations,
                result: Err(e),
            }
        }
    }
}

async fn session(
    device: &str,
    config: &AppConfig,
    templates: Arc<TemplateRegistry>,
    cancel: CancelToken,
    status: watch::Sender<SessionStatus>,
) -> AutomationResult<u64> {
    let backend = connect(device, config.backend).await?;
    let dispatcher = ActionDispatcher::new(backend, templates, config.timings.clone(), cancel);
    let mut engine = ScreenStateEngine::new(
        dispatcher,
        config.playbook,
        config.package_or_empty(),
        status,
    );

    let result = drive(&mut engine, config.max_iterations).await;
    engine.finish();

    let backend = engine.into_dispatcher().into_device();
    if let Err(e) = backend.disconnect().await {
        log::warn!("⚠️ {device}: disconnect failed: {e}");
    }
    result
}

async fn connect(device: &str, kind: BackendKind) -> AutomationResult<AdbBackend> {
    let backend = AdbBackend::connect(device, kind).await?;
    let (width, height) = backend.screen_dimensions();
    log::info!(
        "📱 {}: connected via {} ({}x{})",
        backend.device_name(),
        kind,
        width,
        height
    );
    Ok(backend)
}

/// Run playbook iterations until cancelled, `max_iterations` is reached or
/// a fatal error occurs. Recoverable failures are counted in the status and
/// followed by a pause before the next iteration. Returns the number of
/// iterations run.
pub async fn drive<D: DeviceControl>(
    engine: &mut ScreenStateEngine<D>,
    max_iterations: Option<u64>,
) -> AutomationResult<u64> {
    let mut iterations = 0;
    loop {
        if engine.dispatcher().cancel_token().is_cancelled() {
            log::info!("🛑 {}: cancelled", engine.dispatcher().device().device_name());
            break;
        }
        if max_iterations.is_some_and(|max| iterations >= max) {
            break;
        }
        match engine.run().await {
            Ok(_) => {}
            Err(AutomationError::Cancelled) => break,
            Err(e) if e.is_recoverable() => {
                let dispatcher = engine.dispatcher();
                match dispatcher.sleep(dispatcher.timings().iteration_pause).await {
                    Ok(()) => {}
                    Err(AutomationError::Cancelled) => break,
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
        iterations += 1;
    }
    Ok(iterations)
}
