use std::collections::BTreeSet;

use foundation::CellId;
use foundation::math::Vec3;
use gpu::Renderer;
use runtime::{EventBus, Frame, Metrics};
use sphere::{GeometryError, SphereGrid};
use tracing::{debug, info, warn};

use crate::config::{CaptureMode, CaptureSettings, ConfigProvider};
use crate::error::CaptureError;
use crate::events::SessionEvent;
use crate::orchestrator::{CaptureOrchestrator, CaptureState, Delivery, Targeting};
use crate::orientation::view_from_rotation_matrix;
use crate::source::ImageSource;
use crate::texture_mapper::TextureMapper;

/// What one frame decided.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: Frame,
    pub target: Option<CellId>,
    pub steady: bool,
    /// Automatic capture issued this frame.
    pub requested: Option<CellId>,
    /// Cell whose texture was replaced by a delivered photo this frame.
    pub installed: Option<CellId>,
}

/// One photo sphere being filled in.
///
/// Owns the grid, the orchestrator and the texture mapper, and drives them
/// from the render loop. Everything here runs on the render thread; the
/// image source replies through the orchestrator's delivery slot.
pub struct PanoramaSession<R, S, C> {
    grid: SphereGrid,
    renderer: R,
    source: S,
    config: C,
    orchestrator: CaptureOrchestrator,
    mapper: TextureMapper,
    events: EventBus<SessionEvent>,
    metrics: Metrics,
    frame: Frame,
    mode: CaptureMode,
    requested_at: Option<u64>,
}

impl<R, S, C> PanoramaSession<R, S, C>
where
    R: Renderer,
    S: ImageSource,
    C: ConfigProvider,
{
    /// Extracts the grid from the renderer's template sphere and builds the
    /// per-cell model. The session starts inactive.
    pub fn build(
        settings: &CaptureSettings,
        mut renderer: R,
        source: S,
        config: C,
    ) -> Result<Self, GeometryError> {
        let mesh = renderer.template_mesh(settings.lat_bands, settings.lon_bands);
        let grid = SphereGrid::from_mesh(&mesh, settings.lat_bands, settings.lon_bands)?;
        let mapper = TextureMapper::new(settings.max_texture_dim);
        mapper.build_model(&mut renderer, &grid);
        info!(
            cells = grid.cell_count(),
            seams = grid.seam_ids().len(),
            "photo sphere built"
        );

        let mode = config.snapshot().mode;
        Ok(Self {
            grid,
            renderer,
            source,
            config,
            orchestrator: CaptureOrchestrator::new(settings),
            mapper,
            events: EventBus::with_capacity(settings.event_capacity),
            metrics: Metrics::new(),
            frame: Frame::first(),
            mode,
            requested_at: None,
        })
    }

    pub fn start(&mut self) {
        if !self.orchestrator.is_active() {
            self.orchestrator.set_active(true);
            self.events.emit(self.frame, SessionEvent::Started);
        }
    }

    pub fn stop(&mut self) {
        if self.orchestrator.is_active() {
            self.orchestrator.set_active(false);
            self.events.emit(self.frame, SessionEvent::Stopped);
        }
    }

    pub fn is_active(&self) -> bool {
        self.orchestrator.is_active()
    }

    /// Per-frame entry point.
    pub fn on_view_direction_changed(&mut self, direction: Vec3) -> FrameReport {
        let frame = self.frame;
        let config = self.config.snapshot();
        if config.mode != self.mode {
            info!(mode = ?config.mode, "capture mode changed");
            self.mode = config.mode;
            self.events
                .emit(frame, SessionEvent::ModeChanged { mode: config.mode });
        }

        let installed = self.drain_delivery(frame);

        let Targeting {
            target,
            steady,
            requested,
        } = self
            .orchestrator
            .evaluate(&self.grid, direction, config, &mut self.source);
        if let Some(cell) = requested {
            self.requested_at = Some(frame.index);
            self.metrics.incr("captures.requested");
            self.events.emit(
                frame,
                SessionEvent::CaptureRequested {
                    cell,
                    manual: false,
                },
            );
        }
        self.metrics
            .set_gauge("cells.captured", self.orchestrator.captured().len() as i64);

        self.frame = frame.next();
        FrameReport {
            frame,
            target,
            steady,
            requested,
            installed,
        }
    }

    /// Per-frame entry point for platforms that report a device rotation
    /// matrix instead of a view direction.
    pub fn on_device_rotation(&mut self, rotation: &[f32; 16]) -> FrameReport {
        let pose = view_from_rotation_matrix(rotation);
        self.on_view_direction_changed(pose.direction)
    }

    fn drain_delivery(&mut self, frame: Frame) -> Option<CellId> {
        let delivery = self.orchestrator.poll_delivery()?;
        if !matches!(delivery, Delivery::Stale { .. })
            && let Some(at) = self.requested_at.take()
        {
            self.metrics
                .record("capture.latency_frames", frame.index.saturating_sub(at));
        }
        match delivery {
            Delivery::Image { cell, bytes } => {
                match self
                    .mapper
                    .install_texture(&mut self.renderer, &self.grid, cell, &bytes)
                {
                    Ok(slot) => {
                        debug!(%cell, slot, "texture installed");
                        self.orchestrator.finish_capture(true);
                        self.metrics.incr("textures.installed");
                        self.events
                            .emit(frame, SessionEvent::TextureInstalled { cell, slot });
                        Some(cell)
                    }
                    Err(err) => {
                        let released = self.orchestrator.finish_capture(false);
                        self.metrics.incr("textures.decode_failed");
                        self.events.emit(
                            frame,
                            SessionEvent::TextureDecodeFailed {
                                cell,
                                reason: err.to_string(),
                            },
                        );
                        self.note_release(frame, cell, released);
                        None
                    }
                }
            }
            Delivery::Failed {
                cell,
                failure,
                released,
            } => {
                self.metrics.incr("captures.failed");
                self.events.emit(
                    frame,
                    SessionEvent::CaptureFailed {
                        cell,
                        reason: failure.reason,
                    },
                );
                self.note_release(frame, cell, released);
                None
            }
            Delivery::Stale { cell } => {
                self.metrics.incr("deliveries.dropped");
                self.events
                    .emit(frame, SessionEvent::DeliveryDropped { cell });
                None
            }
        }
    }

    fn note_release(&mut self, frame: Frame, cell: CellId, released: bool) {
        if released {
            debug!(%cell, "cell released for retry");
            self.events.emit(frame, SessionEvent::CellReleased { cell });
        }
    }

    /// Explicit capture of `cell`, also used to retake a captured cell.
    pub fn request_manual_capture(&mut self, cell: CellId) -> Result<(), CaptureError> {
        let config = self.config.snapshot();
        if let Err(err) =
            self.orchestrator
                .request_manual(&self.grid, cell, config, &mut self.source)
        {
            warn!(%cell, "manual capture rejected: {err}");
            return Err(err);
        }
        self.requested_at = Some(self.frame.index);
        self.metrics.incr("captures.requested");
        self.events.emit(
            self.frame,
            SessionEvent::CaptureRequested { cell, manual: true },
        );
        Ok(())
    }

    pub fn captured_cell_ids(&self) -> &BTreeSet<CellId> {
        self.orchestrator.captured()
    }

    pub fn is_cell_capturable(&self, cell: CellId) -> bool {
        self.orchestrator.is_capturable(&self.grid, cell)
    }

    /// Cell targeted by the most recent frame.
    pub fn current_target(&self) -> Option<CellId> {
        self.orchestrator.last_targeting().target
    }

    pub fn is_view_steady(&self) -> bool {
        self.orchestrator.last_targeting().steady
    }

    pub fn state(&self) -> CaptureState {
        self.orchestrator.state()
    }

    /// Starts the sphere over: clears the capture set and steadiness sample
    /// and rebuilds the model with placeholders. Active state is kept.
    pub fn reset(&mut self) {
        info!(captured = self.orchestrator.captured().len(), "session reset");
        self.orchestrator.reset();
        self.requested_at = None;
        self.mapper.build_model(&mut self.renderer, &self.grid);
        self.events.emit(self.frame, SessionEvent::Reset);
    }

    pub fn grid(&self) -> &SphereGrid {
        &self.grid
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn events(&self) -> &EventBus<SessionEvent> {
        &self.events
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Frame the next call to `on_view_direction_changed` will run as.
    pub fn frame(&self) -> Frame {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::PanoramaSession;
    use crate::config::{
        CaptureMode, CaptureSettings, ConfigSnapshot, FailurePolicy, PictureQuality, SharedConfig,
    };
    use crate::error::CaptureError;
    use crate::events::SessionEvent;
    use crate::orchestrator::CaptureState;
    use crate::source::{CaptureDelivery, CaptureRequest, DeliverySender, ImageSource};
    use foundation::CellId;
    use foundation::math::Vec3;
    use gpu::HeadlessRenderer;
    use image::{ImageFormat, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Camera {
        requests: Vec<CaptureRequest>,
        replies: Vec<DeliverySender>,
    }

    impl ImageSource for Camera {
        fn request_capture(&mut self, request: CaptureRequest, reply: DeliverySender) {
            self.requests.push(request);
            self.replies.push(reply);
        }
    }

    impl Camera {
        fn reply(&self, delivery: CaptureDelivery) {
            self.replies.last().expect("request").send(delivery);
        }
    }

    type Session = PanoramaSession<HeadlessRenderer, Camera, SharedConfig>;

    fn png() -> Vec<u8> {
        let mut out = Vec::new();
        RgbaImage::from_pixel(32, 16, Rgba([10, 20, 30, 255]))
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("encode");
        out
    }

    fn session_with(settings: CaptureSettings) -> (Session, SharedConfig) {
        let config = SharedConfig::new(settings.initial);
        let mut s = PanoramaSession::build(
            &settings,
            HeadlessRenderer::default(),
            Camera::default(),
            config.clone(),
        )
        .expect("build");
        s.start();
        (s, config)
    }

    fn session() -> (Session, SharedConfig) {
        session_with(CaptureSettings::default())
    }

    fn toward(s: &Session, cell: u32) -> Vec3 {
        s.grid()
            .center(CellId(cell))
            .and_then(Vec3::normalize)
            .expect("center")
    }

    fn dwell(s: &mut Session, dir: Vec3, frames: usize) {
        for _ in 0..frames {
            s.on_view_direction_changed(dir);
        }
    }

    #[test]
    fn build_installs_placeholders_on_every_cell() {
        let (s, _) = session();
        assert_eq!(s.grid().cell_count(), 56);
        assert_eq!(s.renderer().slot_count(), 56);
        assert_eq!(s.renderer().live_textures(), 56);
        assert!(s.renderer().texture(5).expect("slot").placeholder);
    }

    #[test]
    fn steady_view_captures_cell_once() {
        let (mut s, _) = session();
        let dir = toward(&s, 15);
        dwell(&mut s, dir, 11);
        let report = s.on_view_direction_changed(dir);
        assert_eq!(report.target, Some(CellId(15)));
        assert_eq!(report.requested, Some(CellId(15)));

        dwell(&mut s, dir, 40);
        assert_eq!(s.source().requests.len(), 1);
        assert_eq!(s.metrics().counter("captures.requested"), 1);
        assert!(s.captured_cell_ids().contains(&CellId(15)));
        assert!(!s.is_cell_capturable(CellId(15)));
        assert!(s.is_view_steady());
        assert_eq!(s.current_target(), Some(CellId(15)));
    }

    #[test]
    fn delivered_photo_replaces_placeholder() {
        let (mut s, _) = session();
        let dir = toward(&s, 15);
        dwell(&mut s, dir, 12);
        s.source().reply(CaptureDelivery::image(CellId(15), png()));

        let report = s.on_view_direction_changed(dir);
        assert_eq!(report.installed, Some(CellId(15)));
        assert_eq!(s.state(), CaptureState::Idle);

        let tex = s.renderer().texture(5).expect("slot 5");
        assert!(!tex.placeholder);
        assert_eq!((tex.width, tex.height), (32, 16));
        assert_eq!(s.renderer().release_count(5), 1);
        assert_eq!(s.renderer().live_textures(), 56);
        assert_eq!(s.renderer().violations(), 0);
        assert_eq!(s.metrics().counter("textures.installed"), 1);
        // Requested on frame 11, installed on frame 12.
        let latency = s
            .metrics()
            .histogram("capture.latency_frames")
            .expect("latency");
        assert_eq!((latency.count, latency.sum), (1, 1));
    }

    #[test]
    fn undecodable_photo_leaves_placeholder() {
        let (mut s, _) = session();
        let dir = toward(&s, 15);
        dwell(&mut s, dir, 12);
        s.source()
            .reply(CaptureDelivery::image(CellId(15), b"\xff\xd8 truncated".to_vec()));
        let report = s.on_view_direction_changed(dir);

        assert_eq!(report.installed, None);
        assert!(s.renderer().texture(5).expect("slot 5").placeholder);
        assert_eq!(s.metrics().counter("textures.decode_failed"), 1);
        assert_eq!(s.state(), CaptureState::Idle);
        // Default policy: the cell stays attempted.
        assert!(s.captured_cell_ids().contains(&CellId(15)));
        dwell(&mut s, dir, 30);
        assert_eq!(s.source().requests.len(), 1);
    }

    #[test]
    fn failed_capture_is_retried_under_allow_retry() {
        let (mut s, _) = session_with(CaptureSettings {
            failure_policy: FailurePolicy::AllowRetry,
            ..CaptureSettings::default()
        });
        let dir = toward(&s, 15);
        dwell(&mut s, dir, 12);
        s.source()
            .reply(CaptureDelivery::failed(CellId(15), "shutter jammed"));
        let report = s.on_view_direction_changed(dir);

        assert_eq!(s.metrics().counter("captures.failed"), 1);
        let released = s
            .events()
            .events()
            .iter()
            .any(|e| e.payload == SessionEvent::CellReleased { cell: CellId(15) });
        assert!(released);

        // Still steady on the released cell: the same frame asks again.
        assert_eq!(report.requested, Some(CellId(15)));
        assert_eq!(s.source().requests.len(), 2);
        assert_eq!(s.state(), CaptureState::AwaitingCapture { cell: CellId(15) });
    }

    #[test]
    fn failed_capture_stays_attempted_by_default() {
        let (mut s, _) = session();
        let dir = toward(&s, 15);
        dwell(&mut s, dir, 12);
        s.source().reply(CaptureDelivery::failed(CellId(15), "no card"));
        dwell(&mut s, dir, 30);

        assert_eq!(s.source().requests.len(), 1);
        assert!(s.renderer().texture(5).expect("slot 5").placeholder);
        assert_eq!(s.metrics().counter("captures.failed"), 1);
    }

    #[test]
    fn manual_mode_only_captures_on_request() {
        let (mut s, config) = session();
        config.set_mode(CaptureMode::Manual);
        let dir = toward(&s, 15);
        dwell(&mut s, dir, 30);
        assert!(s.source().requests.is_empty());

        s.request_manual_capture(CellId(15)).expect("manual");
        assert_eq!(
            s.request_manual_capture(CellId(16)),
            Err(CaptureError::Busy {
                in_flight: CellId(15)
            })
        );
        assert_eq!(
            s.events().events()[1].payload,
            SessionEvent::ModeChanged {
                mode: CaptureMode::Manual
            }
        );

        s.source().reply(CaptureDelivery::image(CellId(15), png()));
        s.on_view_direction_changed(dir);
        // Retake of an already captured cell.
        s.request_manual_capture(CellId(15)).expect("retake");
        assert_eq!(s.source().requests.len(), 2);
    }

    #[test]
    fn manual_request_rejections() {
        let settings = CaptureSettings::default();
        let mut s = PanoramaSession::build(
            &settings,
            HeadlessRenderer::default(),
            Camera::default(),
            ConfigSnapshot::default(),
        )
        .expect("build");
        assert_eq!(
            s.request_manual_capture(CellId(15)),
            Err(CaptureError::Inactive)
        );
        s.start();
        assert_eq!(
            s.request_manual_capture(CellId(21)),
            Err(CaptureError::SeamCell(CellId(21)))
        );
        assert_eq!(
            s.request_manual_capture(CellId(99)),
            Err(CaptureError::UnknownCell(CellId(99)))
        );
        assert!(s.source().requests.is_empty());
    }

    #[test]
    fn quality_is_forwarded_to_the_source() {
        let (mut s, config) = session();
        config.set_quality(PictureQuality::High);
        let dir = toward(&s, 30);
        dwell(&mut s, dir, 12);
        assert_eq!(
            s.source().requests,
            vec![CaptureRequest {
                cell: CellId(30),
                quality: PictureQuality::High
            }]
        );
    }

    #[test]
    fn stopped_session_holds_delivery_until_restart() {
        let (mut s, _) = session();
        let dir = toward(&s, 15);
        dwell(&mut s, dir, 12);
        s.stop();
        s.source().reply(CaptureDelivery::image(CellId(15), png()));
        dwell(&mut s, dir, 5);
        assert!(s.renderer().texture(5).expect("slot 5").placeholder);

        s.start();
        let report = s.on_view_direction_changed(dir);
        assert_eq!(report.installed, Some(CellId(15)));
    }

    #[test]
    fn stale_delivery_is_dropped() {
        let (mut s, _) = session();
        let dir = toward(&s, 15);
        dwell(&mut s, dir, 12);
        s.source().reply(CaptureDelivery::image(CellId(40), png()));
        s.on_view_direction_changed(dir);

        assert_eq!(s.metrics().counter("deliveries.dropped"), 1);
        assert_eq!(s.state(), CaptureState::AwaitingCapture { cell: CellId(15) });
        assert!(s.renderer().texture(30).expect("slot 30").placeholder);
    }

    #[test]
    fn reset_clears_captures_and_textures() {
        let (mut s, _) = session();
        let dir = toward(&s, 15);
        dwell(&mut s, dir, 12);
        s.source().reply(CaptureDelivery::image(CellId(15), png()));
        dwell(&mut s, dir, 1);
        assert!(!s.renderer().texture(5).expect("slot 5").placeholder);

        s.reset();
        assert!(s.captured_cell_ids().is_empty());
        assert!(s.renderer().texture(5).expect("slot 5").placeholder);
        assert_eq!(s.renderer().live_textures(), 56);
        assert_eq!(s.renderer().violations(), 0);

        // Needs a fresh steady period before capturing again.
        dwell(&mut s, dir, 11);
        assert_eq!(s.source().requests.len(), 1);
        dwell(&mut s, dir, 1);
        assert_eq!(s.source().requests.len(), 2);
    }

    #[test]
    fn worker_thread_delivery() {
        let settings = CaptureSettings::default();
        let source = |req: CaptureRequest, reply: DeliverySender| {
            std::thread::spawn(move || {
                reply.send(CaptureDelivery::image(req.cell, png()));
            });
        };
        let mut s = PanoramaSession::build(
            &settings,
            HeadlessRenderer::default(),
            source,
            ConfigSnapshot::default(),
        )
        .expect("build");
        s.start();
        let dir = s
            .grid()
            .center(CellId(40))
            .and_then(Vec3::normalize)
            .expect("center");
        for _ in 0..12 {
            s.on_view_direction_changed(dir);
        }
        let mut installed = None;
        for _ in 0..200 {
            if let Some(cell) = s.on_view_direction_changed(dir).installed {
                installed = Some(cell);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(installed, Some(CellId(40)));
        assert!(!s.renderer().texture(30).expect("slot 30").placeholder);
    }

    #[test]
    fn device_rotation_drives_targeting() {
        let (mut s, _) = session();
        // Identity rotation: phone flat, camera facing down.
        let identity = [
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ];
        let report = s.on_device_rotation(&identity);
        assert_eq!(report.frame.index, 0);
        assert_eq!(s.frame().index, 1);
    }
}
