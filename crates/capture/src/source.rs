use bytes::Bytes;
use foundation::CellId;
use runtime::HandoffSender;

use crate::config::PictureQuality;

/// One capture the core wants taken.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub cell: CellId,
    pub quality: PictureQuality,
}

/// Image source reported that no picture was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    pub reason: String,
}

impl CaptureFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "capture failed: {}", self.reason)
    }
}

impl std::error::Error for CaptureFailure {}

/// Completion of a [`CaptureRequest`], sent from the source's own context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDelivery {
    pub cell: CellId,
    pub result: Result<Bytes, CaptureFailure>,
}

impl CaptureDelivery {
    pub fn image(cell: CellId, bytes: impl Into<Bytes>) -> Self {
        Self {
            cell,
            result: Ok(bytes.into()),
        }
    }

    pub fn failed(cell: CellId, reason: impl Into<String>) -> Self {
        Self {
            cell,
            result: Err(CaptureFailure::new(reason)),
        }
    }
}

pub type DeliverySender = HandoffSender<CaptureDelivery>;

/// Camera capability.
///
/// `request_capture` must not block the render loop: the source finishes on
/// its own worker and calls `reply.send` exactly once per request (or never,
/// if the hardware hangs; the cell then keeps its placeholder).
pub trait ImageSource {
    fn request_capture(&mut self, request: CaptureRequest, reply: DeliverySender);
}

impl<F> ImageSource for F
where
    F: FnMut(CaptureRequest, DeliverySender),
{
    fn request_capture(&mut self, request: CaptureRequest, reply: DeliverySender) {
        self(request, reply)
    }
}
