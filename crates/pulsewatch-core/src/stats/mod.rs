//! Rolling statistics over finalized bursts
//!
//! - Fixed-size circular window of samples ([`window`])
//! - Outlier filtering and baseline tracking ([`aggregator`])
//! - Periodic report with baseline comparison ([`report`])

pub mod aggregator;
pub mod report;
pub mod window;
