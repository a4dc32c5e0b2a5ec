//! Application entry point — texsnip.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Create the channels (trigger bridge, worker commands, worker events).
//! 5. Spawn the inference worker and queue its `Init` command.
//! 6. Spawn the hotkey listener thread.
//! 7. Build the upload-server handle (bound lazily on the first bridge
//!    trigger).
//! 8. Run [`eframe::run_native`] — blocks the main thread until the widget
//!    is closed.

use eframe::egui;
use tokio::sync::mpsc;

use texsnip::{
    app::TexsnipApp,
    bridge::{parse_key, HotkeyListener, TriggerEvent},
    config::AppConfig,
    engine::{InferenceWorker, WorkerCommand, WorkerEvent},
    mobile::{BridgeServer, MobileSource},
};

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_decorations(false)
        .with_transparent(true)
        .with_inner_size([280.0, 64.0])
        .with_min_inner_size([250.0, 50.0])
        .with_resizable(false);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("texsnip starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (upload server + recognition requests)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Channels
    let (trigger_tx, trigger_rx) = mpsc::channel::<TriggerEvent>(32);
    let (worker_tx, worker_rx) = mpsc::channel::<WorkerCommand>(16);
    let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>(32);

    // 5. Inference worker — initialises the engine off the UI thread
    rt.spawn(InferenceWorker::new(config.engine.clone()).run(worker_rx, event_tx));
    if worker_tx.blocking_send(WorkerCommand::Init).is_err() {
        log::error!("worker unavailable at startup");
    }

    // 6. Hotkey listener thread
    let snip_key = parse_key(&config.hotkey.snip_key).unwrap_or_else(|| {
        log::warn!(
            "unrecognised snip key {:?}, falling back to F2",
            config.hotkey.snip_key
        );
        rdev::Key::F2
    });
    let mobile_key = parse_key(&config.hotkey.mobile_key).unwrap_or_else(|| {
        log::warn!(
            "unrecognised bridge key {:?}, falling back to F3",
            config.hotkey.mobile_key
        );
        rdev::Key::F3
    });
    let _hotkey_listener = HotkeyListener::start(snip_key, mobile_key, trigger_tx.clone());

    // 7. Upload server handle (binds on the first bridge trigger)
    let mobile = MobileSource::new(BridgeServer::new(
        config.bridge.port,
        rt.handle().clone(),
        trigger_tx,
    ));

    // 8. Build the egui app and run it (blocks until the widget is closed)
    let app = TexsnipApp::new(trigger_rx, worker_tx, event_rx, mobile, config.clone());
    let options = native_options(&config);

    eframe::run_native("texsnip", options, Box::new(move |_cc| Ok(Box::new(app))))
}
