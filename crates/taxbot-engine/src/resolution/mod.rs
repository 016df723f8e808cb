//! Element resolution: primary locator first, then the record's fallbacks.

pub mod strategy;

pub use strategy::ElementResolver;
