//! Name normalization shared by indexing, matching, and cache keys.
//!
//! Every component that compares or keys ingredient names goes through
//! [`normalize`], so knowledge-base index keys and source cache keys always
//! agree. [`split_list`] tokenizes combined ingredient-list strings and is
//! deliberately a separate step from normalization.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize free text into a comparable key.
///
/// Trims, lowercases, NFKD-decomposes and drops combining marks, removes
/// every character outside lowercase ASCII letters, digits, space, and
/// hyphen, then collapses whitespace runs. Pure and idempotent.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .trim()
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-'
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a combined ingredient-list string into display tokens.
///
/// Splits on any run of commas, semicolons, pipes, slashes, or newlines,
/// trims each piece, and drops empty pieces. Left-to-right order is
/// preserved and no normalization is applied.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(|c: char| matches!(c, ',' | ';' | '|' | '/' | '\n'))
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Scenario: diacritics and punctuation fold away ===
    #[test]
    fn strips_diacritics_and_punctuation() {
        assert_eq!(normalize("Café   Déjà-vu!!"), "cafe deja-vu");
    }

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize("  Sodium Chloride  "), "sodium chloride");
    }

    #[test]
    fn keeps_digits_and_hyphens() {
        assert_eq!(normalize("Ci 77491"), "ci 77491");
        assert_eq!(normalize("alpha-tocopherol"), "alpha-tocopherol");
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(normalize("aqua \t\n  water"), "aqua water");
    }

    // === Scenario: normalize is idempotent ===
    #[test]
    fn idempotent() {
        for input in ["Café   Déjà-vu!!", "  AQUA / Water ", "glycérine", ""] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn empty_and_symbol_only_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("!!!***"), "");
    }

    // === Scenario: ingredient lists split on every separator class ===
    #[test]
    fn splits_on_separator_runs() {
        assert_eq!(
            split_list("Water, Glycerin; Fragrance/Parfum"),
            vec!["Water", "Glycerin", "Fragrance", "Parfum"]
        );
    }

    #[test]
    fn split_preserves_order_and_casing() {
        assert_eq!(
            split_list("AQUA|Butylene Glycol\nNiacinamide"),
            vec!["AQUA", "Butylene Glycol", "Niacinamide"]
        );
    }

    #[test]
    fn split_drops_empty_pieces() {
        assert_eq!(split_list(",,Water,, ,Glycerin,"), vec!["Water", "Glycerin"]);
        assert!(split_list("").is_empty());
        assert!(split_list(" ;;, ").is_empty());
    }
}
