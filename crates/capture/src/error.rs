use foundation::CellId;
use gpu::DecodeError;

/// Why a manual capture request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The session has not been started, or was stopped.
    Inactive,
    /// Another capture is still in flight.
    Busy { in_flight: CellId },
    UnknownCell(CellId),
    SeamCell(CellId),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Inactive => write!(f, "capture session is not active"),
            CaptureError::Busy { in_flight } => {
                write!(f, "capture for {in_flight} is still in flight")
            }
            CaptureError::UnknownCell(cell) => write!(f, "{cell} is not on the sphere grid"),
            CaptureError::SeamCell(cell) => write!(f, "{cell} sits on the grid seam"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Recoverable texture install failure. The cell keeps (or gets) a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    UnknownCell(CellId),
    Decode { cell: CellId, source: DecodeError },
}

impl std::fmt::Display for TextureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureError::UnknownCell(cell) => write!(f, "no texture slot for {cell}"),
            TextureError::Decode { cell, source } => write!(f, "{cell}: {source}"),
        }
    }
}

impl std::error::Error for TextureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextureError::Decode { source, .. } => Some(source),
            TextureError::UnknownCell(_) => None,
        }
    }
}
