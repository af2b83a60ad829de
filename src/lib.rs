//! burnbox: single-use EC2 sandboxes over HTTP.
//!
//! Two endpoints drive the whole service: `POST /launch-instance`
//! provisions an instance with a pre-authorized firewall rule and a
//! first-boot bootstrap script, and `POST /terminate-instance` tears one
//! down on demand. Every sandbox is also reaped automatically after a
//! fixed idle timeout.

pub mod aws;
pub mod config;
pub mod defaults;
pub mod error;
pub mod orchestrator;
pub mod server;
pub mod wait;

#[cfg(test)]
pub mod testing;
