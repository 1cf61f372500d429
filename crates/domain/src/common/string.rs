//! Name normalization utilities.

/// Normalizes an entity name for indexing: trimmed and lowercased.
///
/// All by-name lookups in the compendium go through this, so `"SPell1"`,
/// `" spell1 "`, and `"spell1"` all address the same record.
///
/// # Examples
///
/// ```
/// use grimoire_domain::common::normalize_name;
///
/// assert_eq!(normalize_name("  Fire Bolt "), "fire bolt");
/// ```
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Squashes a name for fuzzy comparison: normalized with every whitespace
/// character removed, so `"spel l2"` and `"spell2"` compare equal.
///
/// # Examples
///
/// ```
/// use grimoire_domain::common::squash_name;
///
/// assert_eq!(squash_name("Fire  Bolt"), "firebolt");
/// assert_eq!(squash_name("spel l2"), squash_name("Spell2"));
/// ```
pub fn squash_name(raw: &str) -> String {
    normalize_name(raw)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Splits a comma-separated field into its trimmed, non-empty parts.
///
/// Compendium data frequently packs multi-valued fields into a single
/// string (`"spell1, spell2"`); this is the one place that unpacking
/// happens.
pub fn split_comma_set(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}
