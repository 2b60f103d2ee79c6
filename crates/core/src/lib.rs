pub mod config;
pub mod error;
pub mod levels;
pub mod magnitude;

pub use config::Config;
pub use error::*;
pub use levels::*;
pub use magnitude::Magnitude;
