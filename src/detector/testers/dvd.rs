use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use async_trait::async_trait;
use tracing::debug;

use super::{Iso9660Reader, MediaMatch, MediaTester, TesterBase};
use crate::detector::{ConfigError, MediaHandle, MediaMask, Section, TesterError};

/// Decides whether a raw disc holds a video DVD.
pub trait DiscProbe: Send + Sync {
    /// Whether the disc in `device` has a video DVD info file.
    ///
    /// # Errors
    /// Returns an I/O error if the device cannot be opened.
    fn is_video_dvd(&self, device: &Path) -> std::io::Result<bool>;
}

/// Probe reading the ISO9660 view of the raw device.
///
/// UDF is not read. Video DVDs are UDF bridge discs and carry an ISO9660
/// view too, but a UDF-only disc is reported as not a video DVD.
#[derive(Debug, Default, Clone, Copy)]
pub struct Iso9660DiscProbe;

impl DiscProbe for Iso9660DiscProbe {
    fn is_video_dvd(&self, device: &Path) -> std::io::Result<bool> {
        let file = File::open(device)?;
        match Iso9660Reader::open(BufReader::new(file)) {
            Ok(mut reader) => reader.is_video_dvd(),
            Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                debug!(device = %device.display(), error = %err, "No ISO9660 volume");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

/// Matches video DVDs.
#[derive(Clone)]
pub struct DvdTester {
    base: TesterBase,
    probe: Arc<dyn DiscProbe>,
}

impl DvdTester {
    /// Type tag in rules sections.
    pub const TYPE: &'static str = "DVD";

    /// Prototype reading the disc's ISO9660 filesystem.
    pub fn new() -> Self {
        Self::with_probe(Arc::new(Iso9660DiscProbe))
    }

    /// Prototype using a custom probe.
    pub fn with_probe(probe: Arc<dyn DiscProbe>) -> Self {
        Self {
            base: TesterBase::new(Self::TYPE, "Video DVD"),
            probe,
        }
    }
}

impl Default for DvdTester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaTester for DvdTester {
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
        let readable = MediaMask::FS_ISO9660 | MediaMask::FS_UDF | MediaMask::FS_UNKNOWN;
        if !handle.media_mask().intersects(readable) {
            return Ok(None);
        }

        let device = Path::new(handle.device_file());
        let is_dvd = self
            .probe
            .is_video_dvd(device)
            .map_err(|err| TesterError::io(device, err))?;
        if !is_dvd {
            debug!(device = handle.device_file(), "Not a video DVD");
        }

        Ok(is_dvd.then(|| MediaMatch::new(self.base.keys().to_vec())))
    }
}
