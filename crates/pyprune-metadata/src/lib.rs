pub mod python;
pub mod resolver;
pub mod service;

pub use python::*;
pub use resolver::*;
pub use service::*;
