//! Phone / idTag normalisation
//!
//! The station identifies a charging client by its OCPP `idTag`, which we
//! set to the client's phone number. Stations echo the tag back verbatim,
//! so both sides are compared after stripping everything but digits.

/// Normalise a phone number (or idTag) to digits only.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plus_and_spaces() {
        assert_eq!(normalize_phone("+996 555 123 456"), "996555123456");
    }

    #[test]
    fn strips_dashes_and_parens() {
        assert_eq!(normalize_phone("+996(555)123-456"), "996555123456");
    }

    #[test]
    fn plain_digits_unchanged() {
        assert_eq!(normalize_phone("996555123456"), "996555123456");
    }

    #[test]
    fn non_numeric_tag_becomes_empty() {
        assert_eq!(normalize_phone("RFID-CARD"), "");
    }
}
