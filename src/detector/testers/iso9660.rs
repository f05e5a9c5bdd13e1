//! Just enough ISO9660 to find a file on a disc without mounting it.

use std::io::{self, Read, Seek, SeekFrom};

/// Logical sector size of an ISO9660 volume.
pub const SECTOR_SIZE: usize = 2048;

/// Header of the video manager information file of a video DVD.
pub const DVD_VMG_MAGIC: &[u8; 12] = b"DVDVIDEO-VMG";

const DESCRIPTORS_START: u64 = 16;
const MAX_DESCRIPTORS: u64 = 32;
const STANDARD_ID: &[u8; 5] = b"CD001";
const PRIMARY_DESCRIPTOR: u8 = 1;
const TERMINATOR: u8 = 255;
const ROOT_RECORD_OFFSET: usize = 156;
const ROOT_RECORD_LEN: usize = 34;
const DIRECTORY_FLAG: u8 = 0x02;
const MAX_DIRECTORY_SIZE: u32 = 1 << 20;

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

fn le_u32(bytes: &[u8], at: usize) -> io::Result<u32> {
    bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| invalid("truncated directory record"))
}

/// One directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Name without the `;N` version suffix
    pub name: String,
    /// First sector of the data
    pub extent: u32,
    /// Data length in bytes
    pub size: u32,
    /// Entry is a directory
    pub is_dir: bool,
}

impl DirEntry {
    fn parse(record: &[u8]) -> io::Result<Self> {
        let extent = le_u32(record, 2)?;
        let size = le_u32(record, 10)?;
        let flags = *record.get(25).ok_or_else(|| invalid("truncated directory record"))?;
        let name_len = usize::from(*record.get(32).ok_or_else(|| invalid("truncated directory record"))?);
        let raw_name = record
            .get(33..33 + name_len)
            .ok_or_else(|| invalid("directory record name out of bounds"))?;

        let name = String::from_utf8_lossy(raw_name);
        let name = name.split(';').next().unwrap_or_default();
        let name = name.strip_suffix('.').unwrap_or(name);

        Ok(Self {
            name: name.to_string(),
            extent,
            size,
            is_dir: flags & DIRECTORY_FLAG != 0,
        })
    }

    fn is_self_or_parent(&self) -> bool {
        self.name.is_empty() || self.name == "\u{1}" || self.name == "\0"
    }
}

/// Reader over an ISO9660 volume.
#[derive(Debug)]
pub struct Iso9660Reader<R> {
    inner: R,
    root: DirEntry,
}

impl<R: Read + Seek> Iso9660Reader<R> {
    /// Locates the primary volume descriptor.
    ///
    /// # Errors
    /// Returns `InvalidData` if the volume is not ISO9660, or any read error.
    pub fn open(mut inner: R) -> io::Result<Self> {
        let mut sector = vec![0u8; SECTOR_SIZE];

        for index in DESCRIPTORS_START..DESCRIPTORS_START + MAX_DESCRIPTORS {
            inner.seek(SeekFrom::Start(index * SECTOR_SIZE as u64))?;
            inner.read_exact(&mut sector)?;

            if &sector[1..6] != STANDARD_ID {
                return Err(invalid("no ISO9660 volume descriptor"));
            }
            match sector[0] {
                PRIMARY_DESCRIPTOR => {
                    let root = DirEntry::parse(
                        &sector[ROOT_RECORD_OFFSET..ROOT_RECORD_OFFSET + ROOT_RECORD_LEN],
                    )?;
                    return Ok(Self { inner, root });
                }
                TERMINATOR => break,
                _ => {}
            }
        }

        Err(invalid("no primary volume descriptor"))
    }

    /// Entries of a directory, without `.` and `..`.
    ///
    /// # Errors
    /// Returns any read error or `InvalidData` for corrupt records.
    pub fn read_dir(&mut self, dir: &DirEntry) -> io::Result<Vec<DirEntry>> {
        if !dir.is_dir {
            return Err(invalid("not a directory"));
        }
        let data = self.read_extent(dir.extent, dir.size.min(MAX_DIRECTORY_SIZE))?;

        let mut entries = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let len = usize::from(data[pos]);
            if len == 0 {
                // records never span sectors, the rest of this one is padding
                pos = (pos / SECTOR_SIZE + 1) * SECTOR_SIZE;
                continue;
            }
            let record = data
                .get(pos..pos + len)
                .ok_or_else(|| invalid("directory record out of bounds"))?;
            let entry = DirEntry::parse(record)?;
            if !entry.is_self_or_parent() {
                entries.push(entry);
            }
            pos += len;
        }
        Ok(entries)
    }

    /// Resolves a `/`-separated path, ignoring case.
    ///
    /// # Errors
    /// Returns any read error encountered while walking directories.
    pub fn lookup(&mut self, path: &str) -> io::Result<Option<DirEntry>> {
        let mut current = self.root.clone();

        for component in path.split('/').filter(|c| !c.is_empty()) {
            if !current.is_dir {
                return Ok(None);
            }
            let next = self
                .read_dir(&current)?
                .into_iter()
                .find(|e| e.name.eq_ignore_ascii_case(component));
            match next {
                Some(entry) => current = entry,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Reads up to `len` bytes from the start of a file.
    ///
    /// # Errors
    /// Returns any read error.
    pub fn read_prefix(&mut self, file: &DirEntry, len: usize) -> io::Result<Vec<u8>> {
        let len = u32::try_from(len).unwrap_or(u32::MAX).min(file.size);
        self.read_extent(file.extent, len)
    }

    fn read_extent(&mut self, extent: u32, len: u32) -> io::Result<Vec<u8>> {
        let mut data = vec![0u8; len as usize];
        self.inner
            .seek(SeekFrom::Start(u64::from(extent) * SECTOR_SIZE as u64))?;
        self.inner.read_exact(&mut data)?;
        Ok(data)
    }

    /// Whether the volume holds a valid `VIDEO_TS/VIDEO_TS.IFO`.
    ///
    /// # Errors
    /// Returns any read error.
    pub fn is_video_dvd(&mut self) -> io::Result<bool> {
        let Some(ifo) = self.lookup("VIDEO_TS/VIDEO_TS.IFO")? else {
            return Ok(false);
        };
        if ifo.is_dir {
            return Ok(false);
        }
        let header = self.read_prefix(&ifo, DVD_VMG_MAGIC.len())?;
        Ok(header.as_slice() == DVD_VMG_MAGIC)
    }
}
