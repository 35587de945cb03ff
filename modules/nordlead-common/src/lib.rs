pub mod config;
pub mod score;
pub mod types;

pub use config::Config;
pub use score::*;
pub use types::*;
