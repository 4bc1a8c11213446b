//! PH Core - Backend logic for the PowerHour generator
//!
//! This crate contains all processing logic with zero UI dependencies.
//! It turns a set of source videos into one hour-long compilation: a
//! random one-minute segment is drawn from each source, loudness is
//! normalized, every segment (plus a repeated interstitial clip) is
//! re-encoded to a uniform spec, and the results are concatenated with
//! fade transitions.
//!
//! A GUI or CLI drives the crate through [`orchestrator::spawn_run`] and
//! consumes progress/log/terminal events from the returned
//! [`events::EventReceiver`].

pub mod cancel;
pub mod config;
pub mod encoder;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod probe;
pub mod selection;
pub mod tools;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
