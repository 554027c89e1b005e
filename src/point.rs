use byteorder::{BigEndian, ByteOrder};

/// One ring slot: a bucket-start timestamp and the sample stored there.
///
/// `interval == 0` means the slot has never been written (spec V7). The
/// on-disk `value` is 8 raw bytes; we commit to the IEEE-754 interpretation
/// (see DESIGN.md "Value representation"): bits round-trip unchanged
/// through write -> read, and aggregation reinterprets them as `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub interval: u64,
    pub value: f64,
}

pub const POINT_SIZE: usize = 16;

impl Point {
    pub fn new(interval: u64, value: f64) -> Point {
        Point { interval, value }
    }

    /// An empty slot: zero interval, zero value bits.
    pub fn empty() -> Point {
        Point { interval: 0, value: 0.0 }
    }

    pub fn is_empty(&self) -> bool {
        self.interval == 0
    }

    pub fn write_to_slice(&self, slice: &mut [u8]) {
        debug_assert_eq!(slice.len(), POINT_SIZE);
        BigEndian::write_u64(&mut slice[0..8], self.interval);
        BigEndian::write_u64(&mut slice[8..16], self.value.to_bits());
    }

    pub fn read_from_slice(slice: &[u8]) -> Point {
        debug_assert_eq!(slice.len(), POINT_SIZE);
        let interval = BigEndian::read_u64(&slice[0..8]);
        let value = f64::from_bits(BigEndian::read_u64(&slice[8..16]));
        Point { interval, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_slice() {
        let mut buf = [0u8; POINT_SIZE];
        let p = Point::new(1_690_000_000, 123.456);
        p.write_to_slice(&mut buf);
        assert_eq!(Point::read_from_slice(&buf), p);
    }

    #[test]
    fn empty_slot_is_all_zero_bytes() {
        let mut buf = [0xFFu8; POINT_SIZE];
        Point::empty().write_to_slice(&mut buf);
        assert_eq!(buf, [0u8; POINT_SIZE]);
    }

    #[test]
    fn negative_zero_and_nan_bits_round_trip() {
        let mut buf = [0u8; POINT_SIZE];
        let p = Point::new(5, f64::NAN);
        p.write_to_slice(&mut buf);
        let back = Point::read_from_slice(&buf);
        assert!(back.value.is_nan());
        assert_eq!(back.interval, 5);
    }
}
