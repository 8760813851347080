//! Primary-data validation for the linear symbologies.
//!
//! The primary data of an EAN/UPC or DataBar symbol is a fixed-length GTIN
//! whose final digit is a GS1 mod-10 check digit.
use crate::error::Gs1Error;

/// Computes the GS1 mod-10 check digit for `payload` (the digits excluding
/// the check digit slot). Weights alternate 3, 1 from the rightmost payload
/// digit leftwards.
pub(crate) fn check_digit(payload: &[u8]) -> u8 {
    let sum: u32 = payload
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let weight = if (payload.len() - 1 - i) % 2 == 0 { 3 } else { 1 };
            u32::from(d - b'0') * weight
        })
        .sum();
    b'0' + ((10 - sum % 10) % 10) as u8
}

/// Verifies the final digit of `digits` against the computed check digit,
/// rewriting it in place when it mismatches. Returns whether the original
/// digit was already correct.
pub(crate) fn validate_parity(digits: &mut [u8]) -> bool {
    let Some((last, payload)) = digits.split_last_mut() else {
        return false;
    };
    let expected = check_digit(payload);
    if *last == expected {
        true
    } else {
        *last = expected;
        false
    }
}

/// Checks that `input` is primary data of the expected length made up
/// entirely of digits, and returns it with a verified (or, under
/// `add_check_digit`, freshly computed) check digit.
pub(crate) fn check_and_normalise_primary_data(
    input: &str,
    expected_len: usize,
    add_check_digit: bool,
) -> Result<String, Gs1Error> {
    let required = if add_check_digit {
        expected_len - 1
    } else {
        expected_len
    };
    if input.len() != required {
        return Err(if add_check_digit {
            Gs1Error::PrimaryDataWrongLengthWithoutCheckDigit(required)
        } else {
            Gs1Error::PrimaryDataWrongLength(required)
        });
    }
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Gs1Error::PrimaryDataNotDigits);
    }
    let mut digits = input.as_bytes().to_vec();
    if add_check_digit {
        // Placeholder check digit; the parity pass below fills it in.
        digits.push(b'-');
    }
    let ok = validate_parity(&mut digits);
    if !add_check_digit && !ok {
        return Err(Gs1Error::PrimaryDataCheckDigit);
    }
    Ok(String::from_utf8_lossy(&digits).into_owned())
}
