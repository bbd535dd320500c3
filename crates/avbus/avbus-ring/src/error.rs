use avbus_shm::ShmError;

/// Failures creating, attaching, or indexing a media ring.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error("invalid parameters: {0}")]
    Config(String),

    #[error(transparent)]
    Shm(#[from] ShmError),

    #[error("invalid header id {found:#x} != {expected:#x}")]
    InvalidHeader { found: i64, expected: i64 },

    #[error("region is {actual} bytes but the header implies {expected}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid buffer index: {index}")]
    BadIndex { index: i64 },

    #[error("invalid roi {x},{y} {w}x{h} in {width}x{height}")]
    BadRoi {
        x: usize,
        y: usize,
        w: usize,
        h: usize,
        width: usize,
        height: usize,
    },
}

/// Failures on the message ring.
#[derive(Debug, thiserror::Error)]
pub enum MsgError {
    #[error(transparent)]
    Shm(#[from] ShmError),

    #[error("message length is too short")]
    Empty,

    #[error("message length is too long: {len} bytes")]
    TooLong { len: usize },

    #[error("invalid memory block header: {found:#x}")]
    BadMagic { found: u32 },

    #[error("invalid block size: {len}")]
    BadLength { len: i32 },

    #[error("message is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}
