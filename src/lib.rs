/*!
 # Thermite Schedule Codec Library

 A Rust library for the packed schedule formats used by the thermite
 thermostat. Each schedule slot holds one of four states (2 bits); the codecs
 convert between the dense form stored on the device and an addressable
 sequence of per-slot values.

 ## Features

 * Daily schedules: 48 half-hour slots packed into 12 bytes
 * Weekly schedules: 7 day slots packed into a 14-bit register
 * User settings (set points, daily programs, weekly schedule) as JSON
 * Target temperature resolution and hysteresis heater control
 * A line protocol for driving the codecs from another process

 ## Example

 ```rust
 use thermite_schedule::*;

 fn main() -> Result<()> {
     let mut slots = vec![0u8; DAILY_SLOTS];
     slots[..4].copy_from_slice(&[1, 2, 3, 0]);

     let packed = daily::encode_bytes(&slots)?;
     assert_eq!(packed[0], 0x39);
     assert_eq!(daily::decode_bytes(&packed)?, slots);

     let week = weekly::encode(&[3, 0, 1, 0, 0, 0, 2])?;
     assert_eq!(week, 0x2013);

     Ok(())
 }
 ```
*/

use thiserror::Error;

/// Custom error types for the schedule codec library
#[derive(Error, Debug)]
pub enum Error {
    /// Input sequence has the wrong number of elements
    #[error("{what} must have exactly {expected} elements, got {actual}")]
    Shape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Slot value does not fit in 2 bits
    #[error("Slot {index} has value {value}, expected 0..=3")]
    Range { index: usize, value: i64 },

    /// Set point or daily program name is empty or too long
    #[error("Invalid name {0:?} (1..=15 bytes)")]
    InvalidName(String),

    /// Target temperature outside the supported range
    #[error("Temperature {0} out of range")]
    TemperatureOutOfRange(f32),

    /// Stored weekly schedule uses bits above the 7 day slots
    #[error("Weekly schedule {0:#06x} has bits set above bit 13")]
    UnusedBitsSet(u16),

    /// Temporary schedule window is half-set or reversed
    #[error("Invalid temporary window {start}..{end}")]
    InvalidTemporaryWindow { start: i64, end: i64 },

    /// Index into a fixed table is out of bounds
    #[error("{what} index {index} out of range (0..{len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// General error
    #[error("Error: {0}")]
    General(String),

    /// Error from serde_json
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O error while loading or saving settings
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod daily;
pub mod protocol;
pub mod settings;
pub mod slot;
pub mod thermostat;
pub mod weekly;

// Re-export key types
pub use daily::{DAILY_BYTES, DAILY_SLOTS};
pub use settings::{DailyProgram, PackedDaily, SetPoint, SettingsUpdate, UserSettings};
pub use slot::{SLOT_BITS, SLOT_MASK};
pub use thermostat::{Thermostat, ThermostatState};
pub use weekly::{WEEKLY_MASK, WEEKLY_SLOTS};
