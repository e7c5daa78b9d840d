use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemError {
    #[error("Insufficient memory: {required} bytes requested, address space is {total} bytes")]
    InsufficientMemory { required: u64, total: u64 },

    #[error("Block already resident: {0}")]
    DuplicateId(String),

    #[error("Block not found: {0}")]
    NotFound(String),

    #[error("No block starts at address {0}")]
    AddressNotFound(u64),

    #[error("Payload of {len} bytes does not fit block {id} ({size} bytes)")]
    PayloadTooLarge { id: String, len: usize, size: u64 },

    /// Placement collided with a resident block. Signals an allocator bug.
    #[error("Block {id} at [{start}, {end}) overlaps resident data")]
    Overlap { id: String, start: u64, end: u64 },

    #[error("Payload source unavailable: {name}: {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// Eviction was requested with nothing resident. Signals a caller bug.
    #[error("No victim available for eviction")]
    NoVictimAvailable,

    #[error("Invalid block id: {0}")]
    InvalidId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed .unis data at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl MemError {
    /// Internal invariant violations, as opposed to user-facing outcomes
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, MemError::Overlap { .. } | MemError::NoVictimAvailable)
    }
}

pub type Result<T> = std::result::Result<T, MemError>;
