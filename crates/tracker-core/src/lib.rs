//! Shared types for Pace Tracker: activity models, errors, derived-metric
//! calculations, formatting, settings and time utilities.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;
