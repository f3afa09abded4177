//! Line delimited JSON protocol with a persistent worker process.

pub mod command;
pub mod config;
pub mod error;
pub mod framing;
pub mod process;

pub use command::{Command, DexRequest, Response, DEFAULT_PAGE_LIMIT};
pub use config::BridgeConfig;
pub use error::{BridgeError, ErrorKind};
pub use framing::{read_frame, FrameAssembler};
pub use process::ProcessBridge;
