pub mod classpath;
pub mod project;
pub mod search;
pub mod symbol;

pub use classpath::*;
pub use project::*;
pub use search::*;
pub use symbol::*;
