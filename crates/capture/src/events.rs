use foundation::CellId;
use serde::Serialize;

use crate::config::CaptureMode;

/// Observable session decisions, recorded on the session's event bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    Started,
    Stopped,
    Reset,
    ModeChanged { mode: CaptureMode },
    CaptureRequested { cell: CellId, manual: bool },
    CaptureFailed { cell: CellId, reason: String },
    /// A delivery that did not match the capture in flight.
    DeliveryDropped { cell: CellId },
    TextureInstalled { cell: CellId, slot: usize },
    TextureDecodeFailed { cell: CellId, reason: String },
    /// Retry policy released a cell back to auto-capture.
    CellReleased { cell: CellId },
}
