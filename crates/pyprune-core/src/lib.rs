pub mod config_manager;
pub mod error;
pub mod manifest;
pub mod rules;
pub mod types;

pub use config_manager::*;
pub use error::*;
pub use manifest::*;
pub use rules::*;
pub use types::*;
