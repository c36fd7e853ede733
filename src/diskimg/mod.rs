use std::io;

pub mod dfs;
pub use dfs::*;

#[cfg(test)]
mod tests;

pub type DfsResult<T> = Result<T, DfsError>;

#[derive(Debug, thiserror::Error)]
pub enum DfsError {
    #[error("truncated DFS disk image: expected >= {expected} bytes, got {actual} bytes")]
    Truncated { expected: usize, actual: usize },

    #[error("truncated DSD disk image (expected {expected} bytes, got {actual} bytes)")]
    DoubleSidedLength { expected: usize, actual: usize },

    #[error("invalid number of tracks {tracks} reported in catalogue (must be 40 or 80)")]
    InvalidTrackCount { tracks: f64 },

    #[error("invalid boot option {0} reported in catalogue")]
    InvalidBootOption(u8),

    #[error("invalid start sector {start_sector} reported in catalogue entry {index} ({name})")]
    InvalidStartSector { start_sector: u16, index: usize, name: String },

    #[error("refusing to extract {entry}: '{name}' is not a plain file name")]
    UnsafeFileName { entry: String, name: String },

    #[error("too many files (a catalogue holds at most 31)")]
    TooManyFiles,

    #[error("error writing extracted files: {0}")]
    Io(#[from] io::Error),
}
