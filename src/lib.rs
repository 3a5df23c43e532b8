//! Temporal emission profiles and the operations for composing them.
//!
//! A [`profile::TemporalProfile`] distributes emissions over the periods of a cycle (the hours of
//! a day, the days of a week and so on). Profiles of different types are combined into
//! [`composite::CompositeTemporalProfiles`], which are assigned to category and substance pairs
//! with [`index::make_composite_profiles`] and expanded into hourly series with
//! [`time_series::create_time_serie`].
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod composite;
pub mod error;
pub mod id;
pub mod index;
pub mod log;
pub mod operators;
pub mod profile;
pub mod registry;
pub mod settings;
pub mod time_series;

#[cfg(test)]
mod fixture;

/// Get the directory in which program config files are stored, if there is one
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("emiprof"))
}
