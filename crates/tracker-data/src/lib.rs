//! Data ingestion layer for Pace Tracker.
//!
//! Responsible for discovering activity files written by the Garmin backup
//! tool, decoding FIT and Garmin JSON exports, normalising them into
//! activity records, and aggregating those records into statistics.

pub mod aggregator;
pub mod analysis;
pub mod extractor;
pub mod fit;
pub mod garmin_json;
pub mod metrics;
pub mod scanner;
pub mod splits;
pub mod stats;

pub use tracker_core as core;
