mod camera;

use std::path::PathBuf;
use std::time::Duration;

use capture::{
    CaptureMode, CaptureSettings, CaptureState, FailurePolicy, PanoramaSession, PictureQuality,
    SharedConfig,
};
use clap::{Parser, ValueEnum};
use foundation::CellId;
use foundation::math::Vec3;
use gpu::HeadlessRenderer;
use runtime::Metrics;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::camera::SimulatedCamera;

#[derive(Parser, Debug)]
#[command(author, version, about = "Photo-sphere auto-capture simulator")]
struct Args {
    /// JSON capture settings (every field optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames spent looking at each cell center
    #[arg(long, default_value_t = 15)]
    dwell_frames: u32,

    /// Extra frames to wait for a pending capture before moving on
    #[arg(long, default_value_t = 200)]
    settle_frames: u32,

    /// Fail every Nth capture (0 = never)
    #[arg(long, default_value_t = 0)]
    fail_every: u32,

    /// Return undecodable bytes for every Nth capture (0 = never)
    #[arg(long, default_value_t = 0)]
    corrupt_every: u32,

    /// Number of sweeps over the sphere
    #[arg(long, default_value_t = 1)]
    passes: u32,

    /// Let failed cells be captured again
    #[arg(long)]
    allow_retry: bool,

    /// Picture quality requested from the camera
    #[arg(long, value_enum)]
    quality: Option<CliQuality>,

    /// Include the full event log in the summary
    #[arg(long)]
    events: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
enum CliQuality {
    VeryLow,
    Low,
    High,
}

impl From<CliQuality> for PictureQuality {
    fn from(value: CliQuality) -> Self {
        match value {
            CliQuality::VeryLow => PictureQuality::VeryLow,
            CliQuality::Low => PictureQuality::Low,
            CliQuality::High => PictureQuality::High,
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    frames: u64,
    cells: usize,
    targetable: usize,
    requests: u32,
    captured: Vec<CellId>,
    photos_installed: usize,
    missing: Vec<CellId>,
    metrics: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<serde_json::Value>,
}

type Session = PanoramaSession<HeadlessRenderer, SimulatedCamera, SharedConfig>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => CaptureSettings::load(path)?,
        None => CaptureSettings::default(),
    };
    apply_overrides(&args, &mut settings);
    settings.validate()?;

    let config = SharedConfig::new(settings.initial);
    let camera = SimulatedCamera::new(args.fail_every, args.corrupt_every);
    let mut session: Session =
        PanoramaSession::build(&settings, HeadlessRenderer::default(), camera, config)?;
    session.start();

    let targets = sweep_targets(&session);
    info!(targets = targets.len(), passes = args.passes, "starting sweep");
    for pass in 0..args.passes {
        for &(cell, direction) in &targets {
            look_at(&mut session, cell, direction, &args);
        }
        info!(
            pass,
            captured = session.captured_cell_ids().len(),
            "sweep done"
        );
    }
    session.stop();
    session.source_mut().join();

    let summary = summarize(&session, &targets, args.events)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Command-line flags win over the settings file. The sweep never issues
/// manual requests, so a configured manual mode is replaced.
fn apply_overrides(args: &Args, settings: &mut CaptureSettings) {
    if args.allow_retry {
        settings.failure_policy = FailurePolicy::AllowRetry;
    }
    if let Some(quality) = args.quality {
        settings.initial.quality = quality.into();
    }
    if settings.initial.mode != CaptureMode::FullAuto {
        warn!(
            configured = ?settings.initial.mode,
            "sweep only captures automatically, forcing full_auto mode"
        );
        settings.initial.mode = CaptureMode::FullAuto;
    }
}

/// Normalized center of every cell the locator can return.
fn sweep_targets(session: &Session) -> Vec<(CellId, Vec3)> {
    let grid = session.grid();
    grid.centers()
        .iter()
        .filter(|(cell, _)| !grid.is_seam(**cell))
        .filter_map(|(&cell, &center)| Some((cell, center.normalize()?)))
        .collect()
}

fn look_at(session: &mut Session, cell: CellId, direction: Vec3, args: &Args) {
    for _ in 0..args.dwell_frames {
        session.on_view_direction_changed(direction);
    }
    if session.current_target() != Some(cell) {
        warn!(%cell, target = ?session.current_target(), "center does not target its own cell");
    }

    // Hold still until the worker answers so the next cell starts from Idle.
    let mut waited = 0;
    while session.state() != CaptureState::Idle && waited < args.settle_frames {
        std::thread::sleep(Duration::from_millis(1));
        session.on_view_direction_changed(direction);
        waited += 1;
    }
    if session.state() != CaptureState::Idle {
        warn!(%cell, state = ?session.state(), "capture still pending, moving on");
    }
}

fn summarize(
    session: &Session,
    targets: &[(CellId, Vec3)],
    with_events: bool,
) -> Result<Summary, serde_json::Error> {
    let grid = session.grid();
    let renderer = session.renderer();
    let photos_installed = (0..renderer.slot_count())
        .filter_map(|slot| renderer.texture(slot))
        .filter(|t| !t.placeholder)
        .count();
    let missing = targets
        .iter()
        .map(|&(cell, _)| cell)
        .filter(|cell| {
            grid.material_slot(*cell)
                .and_then(|slot| renderer.texture(slot))
                .is_none_or(|t| t.placeholder)
        })
        .collect();
    let events = if with_events {
        Some(serde_json::to_value(session.events().events())?)
    } else {
        None
    };

    Ok(Summary {
        frames: session.frame().index,
        cells: grid.cell_count(),
        targetable: targets.len(),
        requests: session.source().requests(),
        captured: session.captured_cell_ids().iter().copied().collect(),
        photos_installed,
        missing,
        metrics: session.metrics().clone(),
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::{Args, CliQuality, Session, apply_overrides, look_at, summarize, sweep_targets};
    use crate::camera::SimulatedCamera;
    use capture::{
        CaptureMode, CaptureSettings, FailurePolicy, PanoramaSession, PictureQuality, SharedConfig,
    };
    use clap::{Parser, ValueEnum};
    use gpu::HeadlessRenderer;
    use pretty_assertions::assert_eq;

    fn run(argv: &[&str]) -> super::Summary {
        let args = Args::parse_from(argv);
        let mut settings = CaptureSettings::default();
        apply_overrides(&args, &mut settings);
        let mut session: Session = PanoramaSession::build(
            &settings,
            HeadlessRenderer::default(),
            SimulatedCamera::new(args.fail_every, args.corrupt_every),
            SharedConfig::new(settings.initial),
        )
        .expect("build");
        session.start();
        let targets = sweep_targets(&session);
        for &(cell, dir) in &targets {
            look_at(&mut session, cell, dir, &args);
        }
        session.source_mut().join();
        summarize(&session, &targets, false).expect("summary")
    }

    #[test]
    fn full_sweep_captures_every_targetable_cell() {
        let summary = run(&["panorama_sim", "--quality", "very_low", "--settle-frames", "2000"]);
        assert_eq!(summary.targetable, 50);
        assert_eq!(summary.captured.len(), 50);
        assert_eq!(summary.photos_installed, 50);
        assert!(summary.missing.is_empty());
    }

    #[test]
    fn corrupt_payloads_leave_placeholders() {
        let summary = run(&["panorama_sim", "--corrupt-every", "5", "--settle-frames", "2000"]);
        assert_eq!(summary.requests, 50);
        assert_eq!(summary.photos_installed, 40);
        assert_eq!(summary.missing.len(), 10);
    }

    #[test]
    fn quality_names_match_settings_names() {
        assert!(Args::try_parse_from(["panorama_sim", "--quality", "ultra"]).is_err());
        for cli in CliQuality::value_variants() {
            let name = cli.to_possible_value().expect("named").get_name().to_string();
            let quality = PictureQuality::from(*cli);
            assert_eq!(
                serde_json::to_value(quality).expect("serialize"),
                serde_json::Value::String(name)
            );
        }
        let args = Args::try_parse_from(["panorama_sim", "--quality", "very_low"]).expect("args");
        assert_eq!(args.quality, Some(CliQuality::VeryLow));
    }

    #[test]
    fn flags_override_settings_file() {
        let mut settings = CaptureSettings::from_json_str(
            r#"{"initial": {"mode": "manual", "quality": "high"}}"#,
        )
        .expect("settings");
        let args = Args::parse_from(["panorama_sim", "--quality", "low", "--allow-retry"]);
        apply_overrides(&args, &mut settings);

        assert_eq!(settings.initial.mode, CaptureMode::FullAuto);
        assert_eq!(settings.initial.quality, PictureQuality::Low);
        assert_eq!(settings.failure_policy, FailurePolicy::AllowRetry);
    }

    #[test]
    fn settings_file_quality_kept_without_flag() {
        let mut settings =
            CaptureSettings::from_json_str(r#"{"initial": {"quality": "high"}}"#).expect("settings");
        apply_overrides(&Args::parse_from(["panorama_sim"]), &mut settings);
        assert_eq!(settings.initial.quality, PictureQuality::High);
        assert_eq!(settings.failure_policy, FailurePolicy::KeepAttempted);
    }
}
