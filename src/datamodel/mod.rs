//! Versioned `.haptic` clip format
//!
//! This module owns deserialization, validation and version upgrades of
//! clip files, plus the processing steps that turn a clip's envelopes into
//! driver-ready data (emphasis rendering, interpolation, waveform
//! conversion and AHAP export).

pub mod ahap;
pub mod emphasis;
pub mod interpolation;
pub mod v0;
pub mod v1;
pub mod version;
pub mod waveform;

#[cfg(test)]
pub mod test_utils;

pub use v1 as latest;
use version::{DataModelVersion, Version};

/// Valid range of envelope and emphasis values
const MAX_ENVELOPE_AMPLITUDE: f32 = 1.0;
const MIN_ENVELOPE_AMPLITUDE: f32 = 0.0;

/// A clip in whatever format version it was authored in
pub enum DataModel {
    V0(v0::DataModel),
    V1(v1::DataModel),
}

/// How completely this library supports a loaded clip's version
#[derive(PartialEq, Debug)]
pub enum VersionSupport {
    Full,

    /// The clip version is newer than this library, some playback features
    /// may not work
    Partial,
}

/// Validation of a deserialized clip, consuming it and returning it back
/// when valid
pub trait Validation {
    fn validate(self) -> Result<Self, String>
    where
        Self: Sized;
}

/// Deserializes a clip JSON string into the matching format version.
pub fn from_json(data: &str) -> Result<DataModel, String> {
    match Version::from_json(data) {
        Version {
            major: 1,
            minor: _,
            patch: _,
        } => match serde_json::from_str::<v1::DataModel>(data) {
            Ok(deserialized_data) => match deserialized_data.validate() {
                Ok(validated_data) => Ok(DataModel::V1(validated_data)),
                Err(e) => Err(format!("Error validating V1: {}", e)),
            },
            Err(e) => Err(format!("Error deserializing V1: {}", e)),
        },
        Version {
            major: 0,
            minor: 2,
            patch: 0,
        } => match serde_json::from_str::<v0::DataModel>(data) {
            Ok(deserialized_data) => match deserialized_data.validate() {
                Ok(validated_data) => Ok(DataModel::V0(validated_data)),
                Err(e) => Err(format!("Error validating V0: {}", e)),
            },
            Err(e) => Err(format!("Error deserializing V0: {}", e)),
        },
        _ => Err(String::from("Unsupported version")),
    }
}

/// Like from_json(), but also upgrades the clip to the latest version.
pub fn latest_from_json(data: &str) -> Result<(VersionSupport, latest::DataModel), String> {
    upgrade_to_latest(&from_json(data)?)
}

/// Upgrades a clip to the latest format version
pub fn upgrade_to_latest(data: &DataModel) -> Result<(VersionSupport, latest::DataModel), String> {
    match data {
        DataModel::V0(v0_data) => Ok((VersionSupport::Full, v1::DataModel::from(v0_data.clone()))),
        DataModel::V1(v1) => {
            if v1.version < latest::DataModel::CURRENT {
                // A lower 1.x version than CURRENT would run upgrade code
                // here, once a 1.x successor exists.
                let mut v1_latest = v1.clone();
                v1_latest.version = latest::DataModel::CURRENT;

                Ok((VersionSupport::Full, v1_latest))
            } else if v1.version == latest::DataModel::CURRENT {
                Ok((VersionSupport::Full, v1.clone()))
            } else {
                // The clip was authored with a newer 1.x tool than this
                // library. Parsing ignores unknown fields, so playback
                // proceeds with what is understood.
                Ok((VersionSupport::Partial, v1.clone()))
            }
        }
    }
}
