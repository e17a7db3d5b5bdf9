//! Capture timestamps
//!
//! Legacy pcap records carry seconds plus a micro or nanosecond fraction. PCAP-NG packet
//! blocks carry a 64 bit count of units whose size is set by the owning interface's
//! `if_tsresol` option and shifted by `if_tsoffset`.

/// Value of the `if_tsresol` interface option
///
/// When the most significant bit is clear the remaining bits are a negative power of 10,
/// otherwise a negative power of 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampResolution(pub u8);

impl TimestampResolution {
    /// Microseconds, used when an interface does not carry the option
    pub const MICROSECONDS: TimestampResolution = TimestampResolution(6);
    pub const NANOSECONDS: TimestampResolution = TimestampResolution(9);

    /// Returns the number of units in one second
    ///
    /// `None` when the exponent does not fit in 64 bits.
    pub fn units_per_second(self) -> Option<u64> {
        let exponent = u32::from(self.0 & 0x7F);
        if self.0 & 0x80 == 0 {
            10u64.checked_pow(exponent)
        } else {
            1u64.checked_shl(exponent)
        }
    }
}
impl Default for TimestampResolution {
    fn default() -> Self {
        Self::MICROSECONDS
    }
}

/// A point in time split into whole seconds and a fraction of `units_per_second`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTimestamp {
    pub seconds: i64,
    pub fraction: u64,
    pub units_per_second: u64,
}

impl CaptureTimestamp {
    pub fn new(seconds: i64, fraction: u64, units_per_second: u64) -> Self {
        Self {
            seconds,
            fraction,
            units_per_second,
        }
    }
    /// Seconds and microseconds, the resolution legacy pcap readers normalise to
    pub fn from_micros(seconds: u32, micros: u32) -> Self {
        Self::new(i64::from(seconds), u64::from(micros), 1_000_000)
    }
    /// Converts a PCAP-NG 64 bit timestamp using the interface's resolution and offset
    pub fn from_units(units: u64, resolution: TimestampResolution, offset_seconds: i64) -> Self {
        let units_per_second = resolution.units_per_second().unwrap_or_else(|| {
            log::warn!(
                "Timestamp resolution {:#04x} overflows, assuming microseconds",
                resolution.0
            );
            1_000_000
        });
        let seconds = i64::try_from(units / units_per_second).unwrap_or(i64::MAX);
        Self::new(
            seconds.saturating_add(offset_seconds),
            units % units_per_second,
            units_per_second,
        )
    }
    /// Converts back into a unit count of the given resolution, the inverse of [Self::from_units]
    ///
    /// Times before `offset_seconds` saturate to zero units.
    pub fn to_units(&self, resolution: TimestampResolution, offset_seconds: i64) -> u64 {
        let units_per_second = resolution.units_per_second().unwrap_or(1_000_000);
        let seconds = u64::try_from(self.seconds.saturating_sub(offset_seconds)).unwrap_or(0);
        seconds
            .saturating_mul(units_per_second)
            .saturating_add(rescale(self.fraction, self.units_per_second, units_per_second))
    }
    /// The fractional part in nanoseconds
    pub fn subsec_nanos(&self) -> u32 {
        rescale(self.fraction, self.units_per_second, 1_000_000_000) as u32
    }
    /// The fractional part in microseconds
    pub fn subsec_micros(&self) -> u32 {
        rescale(self.fraction, self.units_per_second, 1_000_000) as u32
    }
    #[cfg(feature = "chrono")]
    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp(self.seconds, self.subsec_nanos())
    }
}

fn rescale(value: u64, from: u64, to: u64) -> u64 {
    if from == 0 {
        return 0;
    }
    (u128::from(value) * u128::from(to) / u128::from(from)) as u64
}
