pub mod backend;
pub mod batch;
pub mod config;
pub mod directive;
pub mod interpreter;
pub mod job;
pub mod modifier;
pub mod resolution;
pub mod script;
pub mod session;

pub use taxbot_common::error;
pub use taxbot_common::locator;
