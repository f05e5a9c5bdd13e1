use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tracing::debug;

use super::{MediaMatch, MediaTester, TesterBase, toc};
use crate::detector::{ConfigError, MediaHandle, MediaMask, Section, TesterError};

pub use super::toc::TrackKind;

/// Reads the format of the first track of a disc.
pub trait TrackProbe: Send + Sync {
    /// Kind of the first track of the disc in `device`.
    ///
    /// # Errors
    /// Returns an I/O error if the disc cannot be read.
    fn first_track(&self, device: &Path) -> std::io::Result<TrackKind>;
}

/// Probe using the kernel CDROM ioctls.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxTrackProbe;

impl TrackProbe for LinuxTrackProbe {
    fn first_track(&self, device: &Path) -> std::io::Result<TrackKind> {
        toc::first_track_kind(device)
    }
}

/// Matches discs whose first track is audio.
#[derive(Clone)]
pub struct CdTester {
    base: TesterBase,
    probe: Arc<dyn TrackProbe>,
}

impl CdTester {
    /// Type tag in rules sections.
    pub const TYPE: &'static str = "CD";

    /// Prototype using the kernel TOC probe.
    pub fn new() -> Self {
        Self::with_probe(Arc::new(LinuxTrackProbe))
    }

    /// Prototype using a custom probe.
    pub fn with_probe(probe: Arc<dyn TrackProbe>) -> Self {
        Self {
            base: TesterBase::new(Self::TYPE, "Audio CD"),
            probe,
        }
    }
}

impl Default for CdTester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaTester for CdTester {
    fn type_tag(&self) -> &str {
        self.base.type_tag()
    }

    fn description(&self) -> &str {
        self.base.description()
    }

    fn create(&self) -> Box<dyn MediaTester> {
        Box::new(Self::with_probe(Arc::clone(&self.probe)))
    }

    fn load_config(&mut self, section: &Section) -> Result<(), ConfigError> {
        self.base.load_config(section, &[], &[])
    }

    fn is_media(&self, handle: &MediaHandle) -> Result<Option<MediaMatch>, TesterError> {
        if !handle.has(MediaMask::OPTICAL | MediaMask::AVAILABLE) {
            return Ok(None);
        }

        let device = Path::new(handle.device_file());
        let kind = self
            .probe
            .first_track(device)
            .map_err(|err| TesterError::io(device, err))?;
        debug!(device = handle.device_file(), ?kind, "First track read");

        Ok((kind == TrackKind::Audio).then(|| MediaMatch::new(self.base.keys().to_vec())))
    }
}
