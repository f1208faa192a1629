//! Search-key normalization for guest names.

use std::ops::RangeInclusive;

use unicode_normalization::UnicodeNormalization;

/// The Combining Diacritical Marks block.
const DIACRITICS: RangeInclusive<char> = '\u{0300}'..='\u{036F}';

/// Fold a display name into its search key.
///
/// The name is canonically decomposed (NFD), marks from the Combining
/// Diacritical Marks block are dropped and the rest is lowercased, so
/// `"José Á."` becomes `"jose a."`. Marks outside that block, such as Indic
/// vowel signs, are part of the letter and stay.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_diacritic(*c))
        .collect::<String>()
        .to_lowercase()
}

fn is_diacritic(c: char) -> bool {
    DIACRITICS.contains(&c)
}
