pub mod error;
pub mod locator;

pub use error::backend_error::BackendError;
pub use locator::{ElementRef, Locator};
