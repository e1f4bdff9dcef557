//! Checksum Engine - GS1 Mod-10
//!
//! One weighting for EAN-13, EAN-8, UPC-A and ITF-14: walk the digits
//! right-to-left with weights 3,1,3,1... starting at the rightmost digit.

/// Compute the GS1 check digit for a string of ASCII digits.
///
/// Callers validate upstream. Non-digit bytes are not rejected here; use
/// [`try_check_digit`] when the input is untrusted.
pub fn check_digit(digits: &str) -> u8 {
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b.wrapping_sub(b'0'));
            let weight = if i % 2 == 0 { 3 } else { 1 };
            digit * weight
        })
        .sum();

    ((10 - (sum % 10)) % 10) as u8
}

/// Checked variant: `None` for empty input or any non-digit character.
pub fn try_check_digit(digits: &str) -> Option<u8> {
    if digits.is_empty() || !is_all_digits(digits) {
        return None;
    }
    Some(check_digit(digits))
}

/// True if the trailing digit of `full_code` is the check digit of the rest.
pub fn verify(full_code: &str) -> bool {
    if full_code.len() < 2 || !is_all_digits(full_code) {
        return false;
    }
    let (body, check) = full_code.split_at(full_code.len() - 1);
    check.as_bytes()[0] - b'0' == check_digit(body)
}

pub(crate) fn is_all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}
