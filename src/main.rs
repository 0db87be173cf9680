//! Holo Camera - Command line front end
//!
//! Loads calibration records from a directory, waits for them the way an
//! editor session does, resolves a hologram camera against them and prints
//! the result as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use holo_camera::calibration::{CalibrationRecord, DirectoryDiscovery};
use holo_camera::display::TrackedViewport;
use holo_camera::geometry::ResolvedFrustum;
use holo_camera::session::RefreshReport;
use holo_camera::settings::{HologramCameraSettings, HostConfig, SettingsError};
use holo_camera::telemetry::{init_logging, LogConfig, LogFormat};
use holo_camera::{HologramCamera, HologramSession, QuiltResolution, SyncReport, WaitCancelled};

/// Resolve a hologram camera against attached display calibrations
#[derive(Debug, Clone, Parser)]
#[command(name = "holo-camera", version)]
struct Args {
    /// Directory of calibration JSON files
    #[arg(long)]
    calibrations: Option<PathBuf>,

    /// Camera settings XML file
    #[arg(long)]
    camera: Option<PathBuf>,

    /// Write the resolved camera settings here
    #[arg(long)]
    save_camera: Option<PathBuf>,

    /// Host config XML file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the calibration wait timeout
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Resolve geometry at this aspect instead of the display's
    #[arg(long)]
    aspect: Option<f32>,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Settings(#[from] SettingsError),
    #[error("runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("report: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Cancelled(#[from] WaitCancelled),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    calibrations: Vec<CalibrationRecord>,
    refresh: RefreshReport,
    target_serial: Option<String>,
    reassigned: bool,
    emulated_device_editable: bool,
    frustum: ResolvedFrustum,
    quilt: QuiltResolution,
    viewports: SyncReport,
}

fn load_config(args: &Args) -> Result<HostConfig, SettingsError> {
    let mut config = match &args.config {
        Some(path) => HostConfig::load_from_file(path)?,
        None => HostConfig::load(),
    };
    if let Some(ms) = args.timeout_ms {
        config.calibration_wait_ms = ms;
    }
    Ok(config)
}

fn load_camera(args: &Args, config: &HostConfig) -> Result<HologramCamera, SettingsError> {
    match &args.camera {
        Some(path) => {
            let settings = HologramCameraSettings::load_from_file(path)?;
            tracing::info!("Loaded camera settings from {}", path.display());
            Ok(settings.to_camera())
        }
        None => Ok(HologramCamera::new(config.default_emulated_device)),
    }
}

fn try_main(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let camera = load_camera(&args, &config)?;

    let registry = Arc::new(config.build_registry());
    match &args.calibrations {
        Some(dir) => registry.attach_discovery(Box::new(DirectoryDiscovery::one_shot(dir))),
        None => registry.mark_discovery_finished(),
    }

    let target_display = camera.target_display();
    let session = HologramSession::with_camera(registry.clone(), config, camera);
    session.register_viewport(Box::new(TrackedViewport::new("Game View", target_display)));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let refresh = runtime.block_on(session.refresh_after_calibrations())?;

    let update = session.update_calibration();
    let viewports = session.update_user_game_views();
    let camera = session.camera();
    let frustum = match args.aspect {
        Some(aspect) => camera.resolve_frustum_at(aspect),
        None => update.frustum,
    };

    if let Some(path) = &args.save_camera {
        HologramCameraSettings::from(&camera).save_to_file(path)?;
        tracing::info!("Saved camera settings to {}", path.display());
    }

    let report = Report {
        calibrations: registry.records().to_vec(),
        refresh,
        target_serial: camera.target_lkg().map(str::to_string),
        reassigned: update.target.is_reassigned(),
        emulated_device_editable: session.emulated_device_editable(),
        frustum,
        quilt: update.quilt,
        viewports,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    session.teardown();
    Ok(())
}

fn main() {
    let args = Args::parse();

    let log_config = LogConfig {
        format: if args.log_json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        },
        ..Default::default()
    };
    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    if let Err(e) = try_main(args) {
        tracing::error!("{}", e);
        eprintln!("holo-camera: {}", e);
        std::process::exit(1);
    }
}
