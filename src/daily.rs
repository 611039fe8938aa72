/*!
 # Daily schedule codec

 A daily schedule is 48 half-hour slots. On the device it is stored as
 12 bytes, four slots per byte, least-significant pair first.
*/

use tracing::trace;

use crate::slot::{check_shape, check_slots, SLOT_BITS, SLOT_MASK};
use crate::Result;

/// Number of slots in a daily schedule
pub const DAILY_SLOTS: usize = 48;

/// Number of bytes in a packed daily schedule
pub const DAILY_BYTES: usize = 12;

/// Slots packed into each byte
pub const SLOTS_PER_BYTE: usize = 4;

/// Minutes covered by one slot
pub const SLOT_MINUTES: u32 = 30;

/// Expands 12 packed bytes into 48 slot values
pub fn decode_bytes(packed: &[u8]) -> Result<Vec<u8>> {
    check_shape("packed daily schedule", DAILY_BYTES, packed.len())?;

    let schedule: Vec<u8> = packed
        .iter()
        .flat_map(|&b| {
            (0..SLOTS_PER_BYTE).map(move |j| (b >> (j as u32 * SLOT_BITS)) & SLOT_MASK)
        })
        .collect();

    trace!("Decoded daily schedule: {:02x?}", packed);
    Ok(schedule)
}

/// Packs 48 slot values into 12 bytes
///
/// Fails with [`crate::Error::Shape`] for any other length and with
/// [`crate::Error::Range`] if a slot does not fit in 2 bits.
pub fn encode_bytes<S: Copy + Into<i64>>(schedule: &[S]) -> Result<Vec<u8>> {
    check_shape("daily schedule", DAILY_SLOTS, schedule.len())?;
    let slots = check_slots(schedule)?;

    let packed: Vec<u8> = slots
        .chunks_exact(SLOTS_PER_BYTE)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |b, (j, &s)| b | (s << (j as u32 * SLOT_BITS)))
        })
        .collect();

    trace!("Encoded daily schedule: {:02x?}", packed);
    Ok(packed)
}

/// Slot index covering `hour:minute`
///
/// # Panics
///
/// Panics if `hour` is not in `0..24` or `minute` is not in `0..60`.
pub fn slot_index(hour: u32, minute: u32) -> usize {
    assert!(hour < 24 && minute < 60, "invalid time of day {hour}:{minute:02}");
    (hour * (60 / SLOT_MINUTES) + minute / SLOT_MINUTES) as usize
}

/// Reads one slot straight from the packed form
///
/// # Panics
///
/// Panics if `index` is not below [`DAILY_SLOTS`].
pub fn slot_at(packed: &[u8; DAILY_BYTES], index: usize) -> u8 {
    let shift = (index % SLOTS_PER_BYTE) as u32 * SLOT_BITS;
    (packed[index / SLOTS_PER_BYTE] >> shift) & SLOT_MASK
}
