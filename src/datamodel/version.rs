//! Clip format versioning
//!
//! Clip versions follow the ideas of [Semantic Versioning][1].
//!
//! [1]: https://semver.org/

use serde::{Deserialize, Serialize};

/// Version triple carried in the header of every clip file
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, PartialOrd)]
pub struct Version {
    pub major: u32,
    #[serde(default = "Version::default_minor_patch")]
    pub minor: u32,
    #[serde(default = "Version::default_minor_patch")]
    pub patch: u32,
}

impl Version {
    /// Minor and patch default to 0 when only the major version is present
    /// in the JSON
    fn default_minor_patch() -> u32 {
        0
    }

    /// Reads just the version field from a clip JSON string, without
    /// deserializing the full clip.
    ///
    /// Returns the default version when the version field is missing or
    /// malformed, so that dispatching falls through to the legacy format.
    pub fn from_json(data: &str) -> Version {
        #[derive(Deserialize)]
        struct VersionCheck {
            version: Version,
        }

        match serde_json::from_str::<VersionCheck>(data) {
            Ok(checker) => checker.version,
            Err(_) => Version::default(),
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self {
            major: 0,
            minor: 2,
            patch: 0,
        }
    }
}

/// Implemented by each clip format revision to expose its version
pub trait DataModelVersion {
    /// The latest revision of the format
    const CURRENT: Version;

    /// The revision of this clip instance
    fn version(&self) -> &Version;
}
