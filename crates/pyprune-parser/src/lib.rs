pub mod classifier;
pub mod file_collect;
pub mod imports;
pub mod language;
pub mod scan;
pub mod syntax;
pub mod visitor;

pub use classifier::*;
pub use file_collect::*;
pub use imports::*;
pub use language::*;
pub use scan::*;
pub use syntax::*;
pub use visitor::*;
