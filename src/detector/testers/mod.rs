//! Pluggable media classifiers.
//!
//! Every tester type exists once as a prototype. The prototype receives the
//! per-cycle scan hooks and hands out fresh instances, one per rules
//! section, which are the actual classification candidates.

mod cd;
mod dvd;
mod file;
mod iso9660;
mod toc;

use std::path::PathBuf;

use async_trait::async_trait;
pub use cd::{CdTester, LinuxTrackProbe, TrackKind, TrackProbe};
pub use dvd::{DiscProbe, DvdTester, Iso9660DiscProbe};
pub use file::{FileScanState, FileTester, TrackedDevice, file_suffix};
pub use iso9660::{DVD_VMG_MAGIC, Iso9660Reader};
use tracing::info;

use super::{ActionKey, ConfigError, DeviceEventSource, KeyList, MediaHandle, Section, TesterError};

/// Key naming the tester type of a section.
pub const TYPE_KEY: &str = "TYPE";
/// Key holding the action list of a section.
pub const KEYS_KEY: &str = "KEYS";

/// What the scan hooks do with a device after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPolicy {
    /// Symlink to point at the mount path
    pub link_path: Option<PathBuf>,
    /// Leave an auto-mounted device mounted
    pub keep_mounted: bool,
}

impl Default for MountPolicy {
    fn default() -> Self {
        Self {
            link_path: None,
            keep_mounted: true,
        }
    }
}

/// Positive classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMatch {
    /// Actions to dispatch
    pub keys: KeyList,
    /// Mount handling requested by the matching section
    pub policy: MountPolicy,
}

impl MediaMatch {
    /// Match with the default mount policy.
    pub fn new(keys: KeyList) -> Self {
        Self {
            keys,
            policy: MountPolicy::default(),
        }
    }
}

/// Classifier for one category of removable media.
#[async_trait]
pub trait MediaTester: Send + Sync {
    /// Upper-case type tag matched against `TYPE`.
    fn type_tag(&self) -> &str;

    /// Human readable description reported on a match.
    fn description(&self) -> &str;

    /// Whether a `TYPE` value selects this tester.
    fn type_matches(&self, name: &str) -> bool {
        self.type_tag().eq_ignore_ascii_case(name)
    }

    /// Fresh, unconfigured instance of the same type.
    fn create(&self) -> Box<dyn MediaTester>;

    /// Binds the instance to one rules section.
    ///
    /// # Errors
    /// Any `ConfigError` for missing, unknown or invalid keys.
    fn load_config(&mut self, section: &Section) -> Result<(), ConfigError>;

    /// Classification predicate. Has no side effects.
    ///
    /// # Errors
    /// Returns `TesterError` if the medium could not be inspected.
    fn is_media(&self, handle: &MediaHandle) -> Result<Option<MediaMatch>, TesterError>;

    /// Called on every prototype before classification.
    ///
    /// # Errors
    /// Returns `TesterError` on failure, the detector logs it and goes on.
    async fn start_scan(
        &mut self,
        _handle: &mut MediaHandle,
        _source: &dyn DeviceEventSource,
    ) -> Result<(), TesterError> {
        Ok(())
    }

    /// Called on every prototype after classification, with the policy of
    /// the winning match or the default one.
    ///
    /// # Errors
    /// Returns `TesterError` on failure, the detector logs it and goes on.
    async fn end_scan(
        &mut self,
        _handle: &mut MediaHandle,
        _source: &dyn DeviceEventSource,
        _policy: &MountPolicy,
    ) -> Result<(), TesterError> {
        Ok(())
    }

    /// Called on every prototype when a device goes away.
    ///
    /// # Errors
    /// Returns `TesterError` on failure, the detector logs it and goes on.
    async fn remove_device(&mut self, _handle: &MediaHandle) -> Result<(), TesterError> {
        Ok(())
    }
}

/// Type metadata and key list shared by all tester variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesterBase {
    type_tag: &'static str,
    description: &'static str,
    keys: KeyList,
}

impl TesterBase {
    /// Unconfigured base for a type.
    pub fn new(type_tag: &'static str, description: &'static str) -> Self {
        Self {
            type_tag,
            description,
            keys: KeyList::new(),
        }
    }

    /// Type tag.
    pub fn type_tag(&self) -> &'static str {
        self.type_tag
    }

    /// Description.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Loaded key list.
    pub fn keys(&self) -> &[ActionKey] {
        &self.keys
    }

    /// Validates `section` and loads its `KEYS`.
    ///
    /// `required` and `optional` list the variant's own keys on top of
    /// `TYPE` and `KEYS`.
    ///
    /// # Errors
    /// `ConfigError` if the section has missing or unknown keys, an empty
    /// `KEYS` list or an invalid action key.
    pub fn load_config(
        &mut self,
        section: &Section,
        required: &[&str],
        optional: &[&str],
    ) -> Result<(), ConfigError> {
        let mut all_required = vec![TYPE_KEY, KEYS_KEY];
        all_required.extend_from_slice(required);
        section.check_keys(&all_required, optional)?;

        let keys = section
            .required_list(KEYS_KEY)?
            .iter()
            .map(|value| {
                value.parse::<ActionKey>().map_err(|err| ConfigError::InvalidValue {
                    section: section.name().to_string(),
                    key: KEYS_KEY.to_string(),
                    value: value.clone(),
                    reason: err.to_string(),
                })
            })
            .collect::<Result<KeyList, _>>()?;

        for key in &keys {
            info!(section = section.name(), key = %key, "Add key");
        }
        self.keys = keys;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
