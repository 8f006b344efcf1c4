//! Text canonicalization shared by indexing and querying

use std::fmt::{self, Write};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize text for matching.
///
/// Applies NFKC (folds full-width and half-width forms), lowercases, and
/// trims surrounding whitespace. The result is a fixed point:
/// `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.nfkc().collect::<String>().to_lowercase();
    // Lowercasing can produce sequences NFKC would recompose.
    let recomposed: String = lowered.nfkc().collect();
    recomposed.trim().to_string()
}

/// Coerce any displayable value to text and normalize it.
///
/// A value whose `Display` implementation fails contributes an empty string
/// instead of aborting the caller; the degradation is logged as a warning.
pub fn normalize_display<T: fmt::Display + ?Sized>(value: &T) -> String {
    let mut buffer = String::new();
    if let Err(e) = write!(buffer, "{}", value) {
        tracing::warn!(
            value_type = std::any::type_name::<T>(),
            "Text coercion failed, substituting empty string: {}",
            e
        );
        return String::new();
    }
    normalize(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unprintable;

    impl fmt::Display for Unprintable {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn test_full_width_folding() {
        assert_eq!(normalize("ＵＳＢ充電式"), "usb充電式");
        assert_eq!(normalize("ｶﾞｼｬ"), "ガシャ");
        assert_eq!(normalize("\u{3000}Ｈｕｍｉｄｉｆｉｅｒ\u{3000}"), "humidifier");
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(normalize("  Desk LAMP \n"), "desk lamp");
        assert_eq!(normalize("Ⅻ"), "xii");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "   ",
            "\t\n",
            "ＵＳＢ充電式卓上加湿器『モイストミニ』",
            "Ⅻ ℌello ﬁle",
            "Am\u{0065}\u{0301}lie",
            " \u{0301}x",
            "価格: 2980",
            "İstanbul ǅ",
        ];

        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_display_coercion() {
        assert_eq!(normalize_display(&2980), "2980");
        assert_eq!(normalize_display(&true), "true");
        assert_eq!(normalize_display("ＡＢＣ"), "abc");
    }

    #[test]
    fn test_failed_coercion_degrades_to_empty() {
        assert_eq!(normalize_display(&Unprintable), "");
    }
}
