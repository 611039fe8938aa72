/*!
 # Slot values

 A slot is one schedule unit holding a 2-bit state. The codecs treat the
 value as opaque; what each of the four states means is up to the caller.
*/

use crate::{Error, Result};

/// Width of one slot in the packed form
pub const SLOT_BITS: u32 = 2;

/// Mask selecting one slot after shifting
pub const SLOT_MASK: u8 = 0b11;

/// Checks that `actual` matches the fixed length of `what`
pub(crate) fn check_shape(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if actual != expected {
        return Err(Error::Shape {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Validates every slot before anything is packed, so a bad value never
/// bleeds into its neighbours.
pub(crate) fn check_slots<S: Copy + Into<i64>>(schedule: &[S]) -> Result<Vec<u8>> {
    schedule
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            let value: i64 = value.into();
            if (0..=i64::from(SLOT_MASK)).contains(&value) {
                Ok(value as u8)
            } else {
                Err(Error::Range { index, value })
            }
        })
        .collect()
}
