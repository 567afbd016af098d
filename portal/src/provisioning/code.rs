//! Apartment code allocation.
//!
//! A code is the owning agent's two-letter prefix followed by a decimal
//! sequence number, e.g. `AC100`, `AC101`. Sequences start at 100 and only
//! ever move forward.

use super::ProvisionError;

/// Sequence number of an agent's first apartment.
pub const FIRST_SEQUENCE: u64 = 100;

const PREFIX_LEN: usize = 2;
const PREFIX_PAD: char = 'X';

/// Derive an agent's prefix from its email: the first two letters, upper-cased,
/// padded with `X` when the address has fewer than two.
pub fn derive_prefix(email: &str) -> String {
    let mut prefix: String = email
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .take(PREFIX_LEN)
        .collect();
    while prefix.len() < PREFIX_LEN {
        prefix.push(PREFIX_PAD);
    }
    prefix
}

/// Parse the sequence number of `code`. A code that does not carry `prefix`
/// or whose remainder is not a plain decimal number is corrupt data.
pub fn sequence_of(prefix: &str, code: &str) -> Result<u64, ProvisionError> {
    let digits = code.strip_prefix(prefix).ok_or_else(|| {
        ProvisionError::validation(
            "code",
            format!("{code:?} does not start with prefix {prefix:?}"),
        )
    })?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProvisionError::validation(
            "code",
            format!("{code:?} has a non-numeric suffix"),
        ));
    }

    digits.parse().map_err(|_| {
        ProvisionError::validation("code", format!("{code:?} suffix is out of range"))
    })
}

/// Next code after `last_issued`, or the first code when nothing was issued yet.
pub fn allocate(prefix: &str, last_issued: Option<&str>) -> Result<String, ProvisionError> {
    let next = match last_issued {
        None => FIRST_SEQUENCE,
        Some(code) => sequence_of(prefix, code)?
            .checked_add(1)
            .ok_or_else(|| ProvisionError::validation("code", "sequence exhausted"))?,
    };
    Ok(format!("{prefix}{next}"))
}

/// Pick the code with the greatest sequence number. Insertion order is
/// irrelevant, so deleted or out-of-order rows cannot pull the counter back.
pub fn highest_code<'a, I>(prefix: &str, codes: I) -> Result<Option<&'a str>, ProvisionError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(u64, &'a str)> = None;
    for code in codes {
        let seq = sequence_of(prefix, code)?;
        if best.is_none_or(|(max, _)| seq > max) {
            best = Some((seq, code));
        }
    }
    Ok(best.map(|(_, code)| code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_code_is_prefix_100() {
        assert_eq!(allocate("AC", None).unwrap(), "AC100");
        assert_eq!(allocate("ZQ", None).unwrap(), "ZQ100");
    }

    #[test]
    fn next_code_increments_suffix() {
        assert_eq!(allocate("AC", Some("AC100")).unwrap(), "AC101");
        assert_eq!(allocate("AC", Some("AC999")).unwrap(), "AC1000");
    }

    #[test]
    fn non_numeric_suffix_fails_loudly() {
        let err = allocate("AC", Some("ACabc")).unwrap_err();
        assert!(matches!(err, ProvisionError::Validation { ref field, .. } if field == "code"));

        assert!(allocate("AC", Some("AC")).is_err());
        assert!(allocate("AC", Some("AC+5")).is_err());
        assert!(allocate("AC", Some("AC 12")).is_err());
    }

    #[test]
    fn foreign_prefix_is_rejected() {
        assert!(allocate("AC", Some("BD100")).is_err());
    }

    #[test]
    fn highest_code_uses_numeric_order_not_insertion_order() {
        let codes = ["AC100", "AC1000", "AC102", "AC99"];
        assert_eq!(highest_code("AC", codes).unwrap(), Some("AC1000"));
    }

    #[test]
    fn highest_code_of_nothing_is_none() {
        assert_eq!(highest_code("AC", []).unwrap(), None);
    }

    #[test]
    fn highest_code_propagates_corruption() {
        assert!(highest_code("AC", ["AC100", "ACx"]).is_err());
    }

    #[test]
    fn sequence_is_strictly_increasing_without_gaps() {
        let mut last: Option<String> = None;
        let mut seen = Vec::new();
        for _ in 0..50 {
            let code = allocate("AC", last.as_deref()).unwrap();
            seen.push(sequence_of("AC", &code).unwrap());
            last = Some(code);
        }
        let expected: Vec<u64> = (FIRST_SEQUENCE..FIRST_SEQUENCE + 50).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn prefix_takes_first_two_letters_uppercased() {
        assert_eq!(derive_prefix("acme@estates.test"), "AC");
        assert_eq!(derive_prefix("1b2ob@x.test"), "BO");
    }

    #[test]
    fn prefix_is_padded_when_letters_are_missing() {
        assert_eq!(derive_prefix("7@1.2"), "XX");
        assert_eq!(derive_prefix("q9@1.2"), "QX");
    }
}
