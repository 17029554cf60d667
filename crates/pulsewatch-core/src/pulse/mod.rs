//! Pulse-burst detection module
//!
//! This module contains the edge-to-burst pipeline:
//! - Edge-event registration on a monitored line ([`line`])
//! - Edge-side burst state machine ([`segmenter`])
//! - Burst-end detection and finalization ([`poller`])
//! - Finalized burst metrics ([`record`])
//! - Latest-value status slot ([`publisher`])
//! - Monitor lifecycle ([`monitor`])
//! - Synthetic burst patterns ([`generator`])

pub mod generator;
pub mod line;
pub mod monitor;
pub mod poller;
pub mod publisher;
pub mod record;
pub mod segmenter;
