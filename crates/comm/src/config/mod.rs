//! Group layout configuration (`polyfold.toml`).

mod loading;
mod types;
mod validation;

#[cfg(test)]
mod tests;

pub use types::{GroupConfig, GroupSection, TransportSection};
