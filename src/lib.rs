pub mod adt;
pub mod batch;
pub mod config;
pub mod error;
pub mod io;
pub mod ioext;
pub mod macros;
pub mod math;

pub use error::AdtError;
pub use error::AdtResult;
pub use config::TileConfig;
pub use io::version::{ClientVersion, LodLevel};
