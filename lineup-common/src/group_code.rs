//! Group display codes
//!
//! Person-groups are identified internally by an integer from the id
//! allocator; for human display they are additionally rendered as short
//! alphabetic codes: base-26 with a two-letter minimum (0→"AA", 25→"AZ",
//! 26→"BA", 676→"BAA"). Pure functions only — the integer id remains the
//! single source of truth for uniqueness and ordering.

const ALPHABET_LEN: i64 = 26;
const MIN_CODE_LEN: usize = 2;

/// Render a group id as its display code
///
/// Negative ids never occur (the allocator starts at 1); they are clamped
/// to 0 rather than panicking.
pub fn group_id_to_code(id: i64) -> String {
    let mut n = id.max(0);

    let mut digits: Vec<u8> = Vec::with_capacity(MIN_CODE_LEN);
    loop {
        digits.push((n % ALPHABET_LEN) as u8);
        n /= ALPHABET_LEN;
        if n == 0 {
            break;
        }
    }
    while digits.len() < MIN_CODE_LEN {
        digits.push(0);
    }

    digits
        .iter()
        .rev()
        .map(|d| (b'A' + d) as char)
        .collect()
}

/// Parse a display code back to its group id
///
/// Accepts codes of two or more letters, case-insensitive. Returns `None`
/// for anything else.
pub fn code_to_group_id(code: &str) -> Option<i64> {
    if code.len() < MIN_CODE_LEN {
        return None;
    }

    let mut value: i64 = 0;
    for ch in code.chars() {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        let digit = (upper as u8 - b'A') as i64;
        value = value.checked_mul(ALPHABET_LEN)?.checked_add(digit)?;
    }

    Some(value)
}
