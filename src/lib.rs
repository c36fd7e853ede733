#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::must_use_candidate,
    clippy::similar_names,
    clippy::cast_lossless,
    clippy::cast_sign_loss
)]
//! Client side of the Acorn Econet fileserver protocol, plus the DFS disk image
//! format and the path grammar used to address files on the server.

pub mod com;
pub mod diskimg;
pub mod ecopath;
pub mod error;
pub mod file_info;
pub mod options;
pub mod protocol;

pub use error::{EconetError, EconetResult};
pub use options::ProtocolOptions;
pub use protocol::{DirectoryHandles, FileServer};
