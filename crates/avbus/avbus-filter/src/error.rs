use avbus_ring::RingError;
use std::fmt;

/// Which media stream a fault or config item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        })
    }
}

/// Faults reported to `on_error` while a filter runs.
///
/// Everything here is recoverable: the loop reports and continues, skipping
/// or dropping the offending slot.
#[derive(Debug, thiserror::Error)]
pub enum FilterFault {
    /// The read cursor drifted out of its configured window; it was advanced
    /// one slot without consuming.
    #[error("{kind} window breach: drift {drift} outside window {win}")]
    WindowBreach { kind: MediaKind, win: i64, drift: i64 },

    /// The writer lapped the reader: the next slot's logical index did not
    /// advance. The slot was dropped.
    #[error("{kind} overrun at {clk}:{slot}, {idx} <= {last}")]
    Overrun {
        kind: MediaKind,
        clk: i64,
        slot: i64,
        idx: i64,
        last: i64,
    },

    #[error(transparent)]
    Ring(#[from] RingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A callback failed for reasons of its own.
    #[error("{0}")]
    Callback(String),
}

/// Failures constructing a filter; the filter never starts.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("no audio or video share")]
    NoShare,

    #[error("failed to open {kind} share '{name}'")]
    OpenShare {
        kind: MediaKind,
        name: String,
        #[source]
        source: RingError,
    },

    #[error("invalid {kind} roi")]
    BadRoi {
        kind: MediaKind,
        #[source]
        source: RingError,
    },

    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),
}
