//! Stream module
//!
//! Declarative stream definitions and record locators.

mod definition;
mod locator;

pub use definition::{Partitioning, RequestParams, StreamDefinition};
pub use locator::RecordLocator;

#[cfg(test)]
mod tests;
