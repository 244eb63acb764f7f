pub mod engine;
pub mod protector;
pub mod report;

pub use engine::*;
pub use protector::*;
pub use report::*;
