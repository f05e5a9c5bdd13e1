//! Table of contents of an optical disc, read with the Linux CDROM ioctls.
#![allow(unsafe_code)]

use std::{
    fs::OpenOptions,
    io,
    os::{fd::AsRawFd, unix::fs::OpenOptionsExt},
    path::Path,
};

use nix::{ioctl_read_bad, ioctl_readwrite_bad};

const CDROMREADTOCHDR: libc::c_ulong = 0x5305;
const CDROMREADTOCENTRY: libc::c_ulong = 0x5306;
const CDROM_LBA: u8 = 0x01;
const CDROM_DATA_TRACK: u8 = 0x04;

#[repr(C)]
#[derive(Debug, Default)]
struct TocHeader {
    first_track: u8,
    last_track: u8,
}

#[repr(C)]
#[derive(Debug, Default)]
struct TocEntry {
    track: u8,
    /// `adr` in the low nibble, `ctrl` in the high nibble
    adr_ctrl: u8,
    format: u8,
    addr: i32,
    datamode: u8,
}

ioctl_read_bad!(read_toc_header, CDROMREADTOCHDR, TocHeader);
ioctl_readwrite_bad!(read_toc_entry, CDROMREADTOCENTRY, TocEntry);

/// Format of a disc track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Red book audio
    Audio,
    /// Any data format
    Data,
}

impl TrackKind {
    /// Classifies a track from the `ctrl` nibble of its TOC entry.
    pub fn from_control(ctrl: u8) -> Self {
        if ctrl & CDROM_DATA_TRACK == 0 {
            TrackKind::Audio
        } else {
            TrackKind::Data
        }
    }
}

/// Kind of the first track of the disc in `device`.
///
/// # Errors
/// Returns an I/O error if the device cannot be opened or holds no
/// readable table of contents.
pub fn first_track_kind(device: &Path) -> io::Result<TrackKind> {
    let file = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(device)?;
    let fd = file.as_raw_fd();

    let mut header = TocHeader::default();
    // SAFETY: `fd` stays open for the whole call and `header` matches
    // `struct cdrom_tochdr`.
    unsafe { read_toc_header(fd, &mut header) }.map_err(io::Error::from)?;
    if header.first_track == 0 || header.first_track > header.last_track {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "disc has no tracks"));
    }

    let mut entry = TocEntry {
        track: header.first_track,
        format: CDROM_LBA,
        ..TocEntry::default()
    };
    // SAFETY: as above, `entry` matches `struct cdrom_tocentry`.
    unsafe { read_toc_entry(fd, &mut entry) }.map_err(io::Error::from)?;

    Ok(TrackKind::from_control(entry.adr_ctrl >> 4))
}
