use std::collections::BTreeSet;

use bytes::Bytes;
use foundation::CellId;
use foundation::math::Vec3;
use runtime::Handoff;
use sphere::{CellLocator, DirectionHistory, SphereGrid};
use tracing::{info, warn};

use crate::config::{CaptureMode, CaptureSettings, ConfigSnapshot, FailurePolicy};
use crate::error::CaptureError;
use crate::source::{CaptureDelivery, CaptureFailure, CaptureRequest, ImageSource};

/// Capture lifecycle. At most one capture is in flight.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    AwaitingCapture { cell: CellId },
    Capturing { cell: CellId },
}

/// Outcome of draining the delivery slot at the start of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Bytes for the in-flight cell; state is now `Capturing`.
    Image { cell: CellId, bytes: Bytes },
    /// The source gave up; state is back to `Idle`.
    Failed {
        cell: CellId,
        failure: CaptureFailure,
        released: bool,
    },
    /// Delivered cell does not match the capture in flight.
    Stale { cell: CellId },
}

/// Per-frame targeting result.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Targeting {
    pub target: Option<CellId>,
    pub steady: bool,
    /// Cell an automatic capture was requested for this frame.
    pub requested: Option<CellId>,
}

/// Decides when to capture and keeps the capture set.
///
/// Runs on the render thread only. The single crossing point with the image
/// source's worker is the delivery [`Handoff`].
#[derive(Debug)]
pub struct CaptureOrchestrator {
    state: CaptureState,
    captured: BTreeSet<CellId>,
    history: DirectionHistory,
    locator: CellLocator,
    steady_tolerance: f64,
    failure_policy: FailurePolicy,
    active: bool,
    deliveries: Handoff<CaptureDelivery>,
    last: Targeting,
}

impl CaptureOrchestrator {
    pub fn new(settings: &CaptureSettings) -> Self {
        Self {
            state: CaptureState::Idle,
            captured: BTreeSet::new(),
            history: DirectionHistory::new(settings.steady_sample_interval),
            locator: CellLocator::new(settings.collinearity_tolerance),
            steady_tolerance: settings.steady_tolerance,
            failure_policy: settings.failure_policy,
            active: false,
            deliveries: Handoff::new(),
            last: Targeting::default(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn captured(&self) -> &BTreeSet<CellId> {
        &self.captured
    }

    pub fn last_targeting(&self) -> Targeting {
        self.last
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_capturable(&self, grid: &SphereGrid, cell: CellId) -> bool {
        grid.contains(cell) && !grid.is_seam(cell) && !self.captured.contains(&cell)
    }

    /// Forgets the capture set, the steadiness sample and any capture in
    /// flight. Late deliveries for the old session land in a detached slot.
    pub fn reset(&mut self) {
        self.state = CaptureState::Idle;
        self.captured.clear();
        self.history.reset();
        self.deliveries = Handoff::new();
        self.last = Targeting::default();
    }

    /// Drains the delivery slot. Does nothing while inactive.
    pub fn poll_delivery(&mut self) -> Option<Delivery> {
        if !self.active {
            return None;
        }
        let delivery = self.deliveries.take()?;

        let CaptureState::AwaitingCapture { cell } = self.state else {
            warn!(cell = %delivery.cell, state = ?self.state, "delivery with no capture in flight, dropped");
            return Some(Delivery::Stale {
                cell: delivery.cell,
            });
        };
        if delivery.cell != cell {
            warn!(expected = %cell, got = %delivery.cell, "delivery for another cell, dropped");
            return Some(Delivery::Stale {
                cell: delivery.cell,
            });
        }

        match delivery.result {
            Ok(bytes) => {
                self.state = CaptureState::Capturing { cell };
                Some(Delivery::Image { cell, bytes })
            }
            Err(failure) => {
                warn!(%cell, "{failure}");
                self.state = CaptureState::Idle;
                let released = self.apply_failure_policy(cell);
                Some(Delivery::Failed {
                    cell,
                    failure,
                    released,
                })
            }
        }
    }

    /// Ends the `Capturing` step once the texture mapper ran.
    ///
    /// Returns `true` when a failed install released the cell for retry.
    pub fn finish_capture(&mut self, installed: bool) -> bool {
        let CaptureState::Capturing { cell } = self.state else {
            return false;
        };
        self.state = CaptureState::Idle;
        if installed {
            false
        } else {
            self.apply_failure_policy(cell)
        }
    }

    fn apply_failure_policy(&mut self, cell: CellId) -> bool {
        match self.failure_policy {
            FailurePolicy::KeepAttempted => false,
            FailurePolicy::AllowRetry => self.captured.remove(&cell),
        }
    }

    /// Locates the viewed cell and, in fully-automatic mode, requests a
    /// capture once the view is steady on a cell not yet captured.
    pub fn evaluate<S: ImageSource + ?Sized>(
        &mut self,
        grid: &SphereGrid,
        direction: Vec3,
        config: ConfigSnapshot,
        source: &mut S,
    ) -> Targeting {
        let target = if direction.normalize().is_some() {
            self.locator.locate(grid, direction)
        } else {
            None
        };
        let steady = self.history.is_steady(direction, self.steady_tolerance);

        let mut requested = None;
        if let Some(cell) = target
            && self.active
            && config.mode == CaptureMode::FullAuto
            && self.state == CaptureState::Idle
            && !self.captured.contains(&cell)
            && steady
        {
            info!(%cell, "auto capture");
            self.issue(cell, config, source);
            requested = Some(cell);
        }

        self.history.observe(direction);
        self.last = Targeting {
            target,
            steady,
            requested,
        };
        self.last
    }

    /// Explicit capture request from the UI. Skips the steadiness gate and
    /// the capture-set check, so it also retakes a cell.
    pub fn request_manual<S: ImageSource + ?Sized>(
        &mut self,
        grid: &SphereGrid,
        cell: CellId,
        config: ConfigSnapshot,
        source: &mut S,
    ) -> Result<(), CaptureError> {
        if !self.active {
            return Err(CaptureError::Inactive);
        }
        if !grid.contains(cell) {
            return Err(CaptureError::UnknownCell(cell));
        }
        if grid.is_seam(cell) {
            return Err(CaptureError::SeamCell(cell));
        }
        match self.state {
            CaptureState::Idle => {}
            CaptureState::AwaitingCapture { cell: in_flight }
            | CaptureState::Capturing { cell: in_flight } => {
                return Err(CaptureError::Busy { in_flight });
            }
        }
        info!(%cell, "manual capture");
        self.issue(cell, config, source);
        Ok(())
    }

    // The set insert and the request happen in one step on the render
    // thread, so a cell can never have two requests outstanding.
    fn issue<S: ImageSource + ?Sized>(
        &mut self,
        cell: CellId,
        config: ConfigSnapshot,
        source: &mut S,
    ) {
        self.captured.insert(cell);
        self.state = CaptureState::AwaitingCapture { cell };
        source.request_capture(
            CaptureRequest {
                cell,
                quality: config.quality,
            },
            self.deliveries.sender(),
        );
    }
}
