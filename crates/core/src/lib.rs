pub mod config;
pub mod error;
pub mod logging;
pub mod path;
pub mod process;
pub mod session;

pub mod facade;
pub mod project;
pub mod query;

pub use config::ServiceConfig;
pub use error::Result;
pub use facade::ProjectService;
pub use session::SessionWorkspace;
