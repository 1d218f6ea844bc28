//! From an on-disk tree to a bound engine project.

pub mod binder;
pub mod classpath;
pub mod detect;
pub mod jdk;

pub use binder::{BoundProject, ProjectBinder};
pub use classpath::{ClasspathAssembler, ClasspathAssembly};
pub use detect::BuildSystemDetector;
