/*!
 # Weekly schedule codec

 A weekly schedule assigns one of four daily programs to each day. It is
 stored in a 16-bit register, 2 bits per day with Sunday in the lowest pair.
 Bits 14 and 15 are unused.
*/

use chrono::Weekday;
use tracing::trace;

use crate::slot::{check_shape, check_slots, SLOT_BITS, SLOT_MASK};
use crate::Result;

/// Number of day slots in a weekly schedule
pub const WEEKLY_SLOTS: usize = 7;

/// Bits of the packed register that carry day slots
pub const WEEKLY_MASK: u16 = 0x3fff;

/// Expands a packed weekly schedule into 7 day slots
///
/// Never fails: bits above bit 13 are ignored.
pub fn decode(packed: u16) -> Vec<u8> {
    let schedule: Vec<u8> = (0..WEEKLY_SLOTS)
        .map(|d| ((packed >> (d as u32 * SLOT_BITS)) as u8) & SLOT_MASK)
        .collect();

    trace!("Decoded weekly schedule {:#06x}: {:?}", packed, schedule);
    schedule
}

/// Packs 7 day slots into the low 14 bits of a register
pub fn encode<S: Copy + Into<i64>>(schedule: &[S]) -> Result<u16> {
    check_shape("weekly schedule", WEEKLY_SLOTS, schedule.len())?;
    let slots = check_slots(schedule)?;

    let packed = slots
        .iter()
        .enumerate()
        .fold(0u16, |p, (d, &s)| p | (u16::from(s) << (d as u32 * SLOT_BITS)));

    trace!("Encoded weekly schedule: {:#06x}", packed);
    Ok(packed)
}

/// Slot assigned to `day`
pub fn slot_at(packed: u16, day: Weekday) -> u8 {
    let shift = day.num_days_from_sunday() * SLOT_BITS;
    ((packed >> shift) as u8) & SLOT_MASK
}
