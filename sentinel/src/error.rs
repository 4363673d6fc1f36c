use aya::{EbpfError, maps::MapError, programs::ProgramError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("failed to load the probe object")]
    Load(#[from] EbpfError),

    #[error("program not found: {0}")]
    ProgramNotFound(&'static str),

    #[error("map not found: {0}")]
    MapNotFound(&'static str),

    #[error("failed to load program {program}")]
    Program {
        program: &'static str,
        #[source]
        source: ProgramError,
    },

    #[error("failed to attach {program} to {symbol}")]
    Attach {
        program: &'static str,
        symbol: String,
        #[source]
        source: ProgramError,
    },

    #[error("failed to open map {map}")]
    Map {
        map: &'static str,
        #[source]
        source: MapError,
    },

    /// A ring record whose size doesn't match the shared event layout.
    #[error("malformed ring record: {len} bytes, expected {expected}")]
    MalformedRecord { len: usize, expected: usize },
}
