//! Seat allocator: deterministic label from the count of seats already sold
//! in the same cabin class.

use crate::models::enums::CabinClass;

/// Assign the next seat label for a cabin class given `sold_in_class`, the
/// number of confirmed tickets already sold on the flight in that class.
///
/// First class is a single 8-seat row `P`; business fills 6-abreast rows
/// starting at `E`; economy fills 30-abreast rows starting at `A`. The
/// allocator is total: the caller's availability check is the only ceiling,
/// so the count must be read inside the same transaction as the ticket
/// insert.
pub fn seat_label(cabin: CabinClass, sold_in_class: i64) -> String {
    let n = sold_in_class.max(0);
    match cabin {
        CabinClass::First => format!("P{}", n % 8 + 1),
        CabinClass::Business => {
            let row = (b'E' + (n / 6) as u8) as char;
            format!("{row}{}", n % 6 + 1)
        }
        CabinClass::Economy => {
            let row = (b'A' + (n / 30) as u8) as char;
            format!("{row}{}", n % 30 + 1)
        }
    }
}
