//! C4 (file layout & creation), C5 (opener), C8 (writer + propagator) and
//! C9 (reader) -- the whole on-disk engine.

pub mod archive;
pub mod header;

use log::{debug, trace};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use self::archive::Archive;
use self::header::{ArchiveDescriptor, FileHeader};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::point::Point;
use crate::schema::Schema;

pub use self::header::{AggregationType, ARCHIVE_INFO_SIZE, STATIC_HEADER_SIZE};

/// mode 0600: rw for the owner only (spec §4.4 step 4).
const CREATE_MODE: u32 = 0o600;

pub struct WhisperFile {
    pub path: PathBuf,
    pub header: FileHeader,
    pub archives: Vec<Archive>,
    mmap: MmapMut,
}

impl fmt::Debug for WhisperFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "path: {:?}\naggregation method: {}\nmax retention: {}\nx_files_factor: {}\n",
            self.path, self.header.aggregation, self.header.max_retention, self.header.x_files_factor
        )?;
        for (index, archive) in self.archives.iter().enumerate() {
            writeln!(
                f,
                "archive {index}: offset={} seconds_per_point={} points={} retention={}",
                archive.offset,
                archive.seconds_per_point,
                archive.points,
                archive.retention()
            )?;
            let points = self.dump_archive(index);
            for (slot, point) in points.iter().enumerate() {
                writeln!(f, "  {slot}: {} {}", point.interval, point.value)?;
            }
        }
        Ok(())
    }
}

impl WhisperFile {
    /// Creates a new file at `path` per the given archive specs (spec
    /// §4.4). Refuses if `path` already exists (spec §9 open question --
    /// the reference's `O_CREAT` without `O_TRUNC` leaves stale trailing
    /// bytes on an existing longer file; we refuse instead).
    pub fn create<S: AsRef<str>>(
        path: impl AsRef<Path>,
        archive_specs: &[S],
        aggregation: AggregationType,
        x_files_factor: u8,
    ) -> Result<WhisperFile> {
        let schema = Schema::new_from_retention_specs(archive_specs)?;
        let descriptors = header::build_descriptors(&schema.retention_policies);

        let header = FileHeader {
            aggregation,
            max_retention: schema.max_retention(),
            x_files_factor,
            archive_count: descriptors.len() as u32,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .mode(CREATE_MODE)
            .open(path.as_ref())?;

        let mut header_buf = [0u8; STATIC_HEADER_SIZE];
        header.write_to_slice(&mut header_buf);
        file.write_all(&header_buf)?;

        for descriptor in &descriptors {
            let mut buf = [0u8; ARCHIVE_INFO_SIZE];
            descriptor.write_to_slice(&mut buf);
            file.write_all(&buf)?;
        }

        let total_size = header::archives_start(descriptors.len()) + schema.archives_size_on_disk();
        preallocate(&file, total_size)?;

        debug!(
            "created {:?}: {} archives, max_retention={}s",
            path.as_ref(),
            descriptors.len(),
            header.max_retention
        );

        drop(file);
        Self::open(path)
    }

    /// Opens an existing file and reconstructs the archive chain in
    /// memory (spec §4.5).
    pub fn open(path: impl AsRef<Path>) -> Result<WhisperFile> {
        let file = OpenOptions::new().read(true).write(true).open(path.as_ref())?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        let header = FileHeader::read_from_slice(&mmap[0..STATIC_HEADER_SIZE])?;

        let directory_end = header::archives_start(header.archive_count as usize) as usize;
        if mmap.len() < directory_end {
            return Err(Error::Corrupt("short archive directory".to_string()));
        }

        let mut descriptors = Vec::with_capacity(header.archive_count as usize);
        for i in 0..header.archive_count as usize {
            let start = STATIC_HEADER_SIZE + i * ARCHIVE_INFO_SIZE;
            descriptors.push(ArchiveDescriptor::read_from_slice(&mmap[start..start + ARCHIVE_INFO_SIZE]));
        }

        let count = descriptors.len();
        let archives: Vec<Archive> = descriptors
            .into_iter()
            .enumerate()
            .map(|(i, d)| {
                let lower = if i + 1 < count { Some(i + 1) } else { None };
                Archive::from_descriptor(d, lower)
            })
            .collect();

        for archive in &archives {
            let end = (archive.offset + archive.size()) as usize;
            if mmap.len() < end {
                return Err(Error::Corrupt(format!(
                    "archive region ends at {end} but file is only {} bytes",
                    mmap.len()
                )));
            }
        }

        debug!("opened {:?}: {} archives", path.as_ref(), archives.len());

        Ok(WhisperFile {
            path: path.as_ref().to_path_buf(),
            header,
            archives,
            mmap,
        })
    }

    /// The highest-precision archive whose retention covers `now - timestamp`
    /// (spec §4.8 step 1 / §4.9).
    fn primary_archive_index(&self, now: u64, timestamp: u64) -> Result<usize> {
        if timestamp > now {
            return Err(Error::OutOfRange { timestamp, now, max_retention: self.header.max_retention });
        }
        let diff = now - timestamp;
        if diff > self.header.max_retention {
            return Err(Error::OutOfRange { timestamp, now, max_retention: self.header.max_retention });
        }
        self.archives
            .iter()
            .position(|a| a.retention() > diff)
            .ok_or(Error::OutOfRange { timestamp, now, max_retention: self.header.max_retention })
    }

    /// Writes `value` at `timestamp`, then propagates into every coarser
    /// archive (spec §4.8).
    pub fn set(&mut self, clock: &dyn Clock, timestamp: u64, value: f64) -> Result<()> {
        let now = clock.now();
        let primary = self.primary_archive_index(now, timestamp)?;

        self.archives[primary].write(&mut self.mmap, timestamp, value);
        trace!("wrote point at archive {primary} for timestamp {timestamp}");

        self.propagate(primary, timestamp);
        Ok(())
    }

    /// Re-aggregates each coarser archive bucket that covers `timestamp`,
    /// starting from `from_index` (spec §4.8 step 3). Purely an in-memory
    /// mmap operation -- there is no fallible I/O on this path, so unlike
    /// the primary write this cannot fail.
    fn propagate(&mut self, from_index: usize, timestamp: u64) {
        let mut index = from_index;
        loop {
            let Some(lower) = self.archives[index].lower else {
                return;
            };

            let (k, start_interval) = {
                let fine = &self.archives[index];
                let coarse = &self.archives[lower];
                let k = (coarse.seconds_per_point / fine.seconds_per_point) as usize;
                let start_interval = coarse.bucket(timestamp);
                (k, start_interval)
            };

            let window = self.archives[index].read_window(&self.mmap, start_interval, k);

            let non_empty = window.iter().filter(|p| !p.is_empty()).count();
            let required = (k * self.header.x_files_factor as usize).div_ceil(100);
            if non_empty < required {
                trace!(
                    "propagation stopped at archive {index}->{lower}: {non_empty}/{k} non-empty slots, need {required}"
                );
                return;
            }

            let aggregated = self.header.aggregation.aggregate(&window);
            self.archives[lower].write(&mut self.mmap, timestamp, aggregated);
            trace!("propagated archive {index}->{lower}: value={aggregated}");

            index = lower;
        }
    }

    /// Point-in-time query against the same primary archive the writer
    /// would choose (spec §4.9).
    pub fn get(&self, clock: &dyn Clock, timestamp: u64) -> Result<f64> {
        let now = clock.now();
        let primary = self.primary_archive_index(now, timestamp)?;
        Ok(self.archives[primary].read(&self.mmap, timestamp).value)
    }

    /// Every slot of `archives[index]`, in on-disk slot order (used by the
    /// `dump` CLI subcommand and the `Debug` impl; not normative, spec §6.1).
    pub fn dump_archive(&self, index: usize) -> Vec<Point> {
        let archive = &self.archives[index];
        let start = archive.offset as usize;
        let end = start + archive.size() as usize;
        self.mmap[start..end]
            .chunks(crate::point::POINT_SIZE)
            .map(Point::read_from_slice)
            .collect()
    }
}

#[cfg(unix)]
fn preallocate(file: &File, size: u64) -> Result<()> {
    let ret = unsafe { libc::ftruncate(file.as_raw_fd(), size as libc::off_t) };
    if ret != 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}
