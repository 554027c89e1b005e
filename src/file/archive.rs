//! C6 point locator and the ring-slot read/write primitives built on top
//! of it. One `Archive` is one resolution layer; the byte storage itself
//! lives in the `WhisperFile`'s single memory map, which every archive
//! indexes into by absolute offset (see spec §4.6).

use crate::point::{Point, POINT_SIZE};
use crate::schema::RetentionPolicy;

use super::header::ArchiveDescriptor;

/// One resolution layer: a ring of `points` fixed-size slots starting at
/// `offset` in the file. `lower` is the index of the next-coarser archive
/// in the containing chain, or `None` for the coarsest (spec §9
/// Ownership: modeled as an index into the chain, not a reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Archive {
    pub offset: u64,
    pub seconds_per_point: u32,
    pub points: u32,
    pub lower: Option<usize>,
}

impl Archive {
    pub fn from_descriptor(descriptor: ArchiveDescriptor, lower: Option<usize>) -> Archive {
        Archive {
            offset: descriptor.offset as u64,
            seconds_per_point: descriptor.seconds_per_point,
            points: descriptor.points,
            lower,
        }
    }

    pub fn from_policy(offset: u64, policy: RetentionPolicy, lower: Option<usize>) -> Archive {
        Archive {
            offset,
            seconds_per_point: policy.precision,
            points: policy.points,
            lower,
        }
    }

    pub fn retention(&self) -> u64 {
        self.seconds_per_point as u64 * self.points as u64
    }

    pub fn size(&self) -> u64 {
        POINT_SIZE as u64 * self.points as u64
    }

    /// The canonical bucket start for `timestamp` (spec V7).
    pub fn bucket(&self, timestamp: u64) -> u64 {
        timestamp - (timestamp % self.seconds_per_point as u64)
    }

    /// Ring-address function (spec §4.6 step 2).
    fn slot_index(&self, interval: u64) -> u64 {
        (interval % self.retention()) / self.seconds_per_point as u64
    }

    fn slot_offset(&self, interval: u64) -> u64 {
        self.offset + POINT_SIZE as u64 * self.slot_index(interval)
    }

    /// Writes one point at the slot for `timestamp`, returning the
    /// bucket-start interval it was written under.
    pub fn write(&self, mmap: &mut [u8], timestamp: u64, value: f64) -> u64 {
        let interval = self.bucket(timestamp);
        let offset = self.slot_offset(interval) as usize;
        Point::new(interval, value).write_to_slice(&mut mmap[offset..offset + POINT_SIZE]);
        interval
    }

    /// Reads the single slot covering `timestamp`, without checking
    /// whether its stored interval actually matches (spec §4.9: stale
    /// slots from previous ring cycles are returned as-is).
    pub fn read(&self, mmap: &[u8], timestamp: u64) -> Point {
        let interval = self.bucket(timestamp);
        let offset = self.slot_offset(interval) as usize;
        Point::read_from_slice(&mmap[offset..offset + POINT_SIZE])
    }

    /// Reads `k` consecutive slots starting at the slot that covers
    /// `start_interval`, in temporal order. Splits the read in two when
    /// the window crosses the end of the ring (spec §4.8.3b / P7).
    pub fn read_window(&self, mmap: &[u8], start_interval: u64, k: usize) -> Vec<Point> {
        let start = self.offset as usize + self.slot_index(start_interval) as usize * POINT_SIZE;
        let bytes_needed = k * POINT_SIZE;
        let end = start + bytes_needed;
        let archive_end = self.offset as usize + self.size() as usize;

        if end > archive_end {
            let overflow = end - archive_end;
            let head = &mmap[start..archive_end];
            let tail = &mmap[self.offset as usize..self.offset as usize + overflow];
            head.chunks(POINT_SIZE)
                .chain(tail.chunks(POINT_SIZE))
                .map(Point::read_from_slice)
                .collect()
        } else {
            mmap[start..end].chunks(POINT_SIZE).map(Point::read_from_slice).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_zeroed(points: u32) -> Vec<u8> {
        vec![0u8; POINT_SIZE * points as usize]
    }

    #[test]
    fn bucket_rounds_down_to_precision() {
        let archive = Archive { offset: 0, seconds_per_point: 10, points: 6, lower: None };
        assert_eq!(archive.bucket(1005), 1000);
        assert_eq!(archive.bucket(1000), 1000);
    }

    #[test]
    fn write_then_read_same_timestamp_round_trips() {
        let archive = Archive { offset: 0, seconds_per_point: 10, points: 6, lower: None };
        let mut buf = write_zeroed(6);
        archive.write(&mut buf, 1005, 42.0);
        let point = archive.read(&buf, 1005);
        assert_eq!(point.interval, 1000);
        assert_eq!(point.value, 42.0);
    }

    #[test]
    fn ring_wraps_after_one_full_retention() {
        // 2-second precision, 3 points -> retention 6s.
        let archive = Archive { offset: 0, seconds_per_point: 2, points: 3, lower: None };
        let mut buf = write_zeroed(3);
        archive.write(&mut buf, 0, 1.0);
        archive.write(&mut buf, 6, 2.0); // same slot, one retention later
        let point = archive.read(&buf, 6);
        assert_eq!(point.interval, 6);
        assert_eq!(point.value, 2.0);
    }

    #[test]
    fn read_window_splits_across_the_wrap() {
        let archive = Archive { offset: 0, seconds_per_point: 10, points: 3, lower: None };
        let mut buf = write_zeroed(3);
        // points cover [0,10,20); write the 4th bucket (30) which wraps to slot 0
        archive.write(&mut buf, 10, 1.0);
        archive.write(&mut buf, 20, 2.0);
        archive.write(&mut buf, 30, 3.0);
        let window = archive.read_window(&buf, 20, 3);
        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().map(|p| p.interval).collect::<Vec<_>>(), vec![20, 30, 10]);
    }
}
