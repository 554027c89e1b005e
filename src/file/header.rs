//! Fixed-layout, big-endian codec for the file header and archive
//! directory (C1), plus the in-memory model the opener (C5) builds from
//! them.

use byteorder::{BigEndian, ByteOrder};
use std::fmt;

use crate::error::{Error, Result};
use crate::schema::RetentionPolicy;

pub const STATIC_HEADER_SIZE: usize = 14;
pub const ARCHIVE_INFO_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    Average,
    Sum,
    Last,
    Max,
    Min,
}

impl AggregationType {
    pub fn to_u8(self) -> u8 {
        match self {
            AggregationType::Average => 1,
            AggregationType::Sum => 2,
            AggregationType::Last => 3,
            AggregationType::Max => 4,
            AggregationType::Min => 5,
        }
    }

    /// `0` is defaulted to `Average` on create (spec §3 FileHeader).
    pub fn from_u8(byte: u8) -> Result<AggregationType> {
        match byte {
            0 | 1 => Ok(AggregationType::Average),
            2 => Ok(AggregationType::Sum),
            3 => Ok(AggregationType::Last),
            4 => Ok(AggregationType::Max),
            5 => Ok(AggregationType::Min),
            other => Err(Error::Corrupt(format!(
                "unknown aggregation method byte: {other}"
            ))),
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AggregationType::Average => "average",
            AggregationType::Sum => "sum",
            AggregationType::Last => "last",
            AggregationType::Max => "max",
            AggregationType::Min => "min",
        };
        write!(f, "{name}")
    }
}

/// On-disk archive descriptor (12 bytes, spec §3 ArchiveDescriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    pub offset: u32,
    pub seconds_per_point: u32,
    pub points: u32,
}

impl ArchiveDescriptor {
    pub fn write_to_slice(&self, slice: &mut [u8]) {
        debug_assert_eq!(slice.len(), ARCHIVE_INFO_SIZE);
        BigEndian::write_u32(&mut slice[0..4], self.offset);
        BigEndian::write_u32(&mut slice[4..8], self.seconds_per_point);
        BigEndian::write_u32(&mut slice[8..12], self.points);
    }

    pub fn read_from_slice(slice: &[u8]) -> ArchiveDescriptor {
        debug_assert_eq!(slice.len(), ARCHIVE_INFO_SIZE);
        ArchiveDescriptor {
            offset: BigEndian::read_u32(&slice[0..4]),
            seconds_per_point: BigEndian::read_u32(&slice[4..8]),
            points: BigEndian::read_u32(&slice[8..12]),
        }
    }

    pub fn size(&self) -> u64 {
        crate::point::POINT_SIZE as u64 * self.points as u64
    }

    pub fn retention(&self) -> u64 {
        self.seconds_per_point as u64 * self.points as u64
    }
}

/// On-disk file header (14 bytes, spec §3 FileHeader).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub aggregation: AggregationType,
    pub max_retention: u64,
    pub x_files_factor: u8,
    pub archive_count: u32,
}

impl FileHeader {
    pub fn write_to_slice(&self, slice: &mut [u8]) {
        debug_assert_eq!(slice.len(), STATIC_HEADER_SIZE);
        slice[0] = self.aggregation.to_u8();
        BigEndian::write_u64(&mut slice[1..9], self.max_retention);
        slice[9] = self.x_files_factor;
        BigEndian::write_u32(&mut slice[10..14], self.archive_count);
    }

    pub fn read_from_slice(slice: &[u8]) -> Result<FileHeader> {
        if slice.len() < STATIC_HEADER_SIZE {
            return Err(Error::Corrupt(format!(
                "short header read: got {} bytes, need {}",
                slice.len(),
                STATIC_HEADER_SIZE
            )));
        }
        let aggregation = AggregationType::from_u8(slice[0])?;
        let max_retention = BigEndian::read_u64(&slice[1..9]);
        let x_files_factor = slice[9];
        let archive_count = BigEndian::read_u32(&slice[10..14]);
        if archive_count == 0 {
            return Err(Error::Corrupt("archive_count is zero".to_string()));
        }
        Ok(FileHeader {
            aggregation,
            max_retention,
            x_files_factor,
            archive_count,
        })
    }
}

/// Byte offset of the first archive descriptor's ring region, i.e. the
/// end of the header + directory.
pub fn archives_start(archive_count: usize) -> u64 {
    STATIC_HEADER_SIZE as u64 + (ARCHIVE_INFO_SIZE as u64 * archive_count as u64)
}

/// Builds the canonical-order archive descriptors for a freshly created
/// file, computing each archive's cumulative byte offset (spec §4.4 step 3).
pub fn build_descriptors(policies: &[RetentionPolicy]) -> Vec<ArchiveDescriptor> {
    let mut offset = archives_start(policies.len()) as u32;
    policies
        .iter()
        .map(|p| {
            let descriptor = ArchiveDescriptor {
                offset,
                seconds_per_point: p.precision,
                points: p.points,
            };
            offset += descriptor.size() as u32;
            descriptor
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = FileHeader {
            aggregation: AggregationType::Average,
            max_retention: 300,
            x_files_factor: 50,
            archive_count: 1,
        };
        let mut buf = [0u8; STATIC_HEADER_SIZE];
        header.write_to_slice(&mut buf);
        assert_eq!(FileHeader::read_from_slice(&buf).unwrap(), header);
    }

    #[test]
    fn archive_descriptor_round_trips() {
        let descriptor = ArchiveDescriptor {
            offset: 14 + 12,
            seconds_per_point: 60,
            points: 5,
        };
        let mut buf = [0u8; ARCHIVE_INFO_SIZE];
        descriptor.write_to_slice(&mut buf);
        assert_eq!(ArchiveDescriptor::read_from_slice(&buf), descriptor);
    }

    #[test]
    fn rejects_short_header() {
        let buf = [0u8; 4];
        assert!(FileHeader::read_from_slice(&buf).is_err());
    }

    #[test]
    fn rejects_zero_archive_count() {
        let header = FileHeader {
            aggregation: AggregationType::Average,
            max_retention: 300,
            x_files_factor: 50,
            archive_count: 0,
        };
        let mut buf = [0u8; STATIC_HEADER_SIZE];
        header.write_to_slice(&mut buf);
        assert!(FileHeader::read_from_slice(&buf).is_err());
    }

    #[test]
    fn descriptor_offsets_are_cumulative() {
        let policies = vec![
            RetentionPolicy { precision: 10, points: 6 },
            RetentionPolicy { precision: 60, points: 5 },
        ];
        let descriptors = build_descriptors(&policies);
        let start = archives_start(2);
        assert_eq!(descriptors[0].offset as u64, start);
        assert_eq!(descriptors[1].offset as u64, start + descriptors[0].size());
    }
}
