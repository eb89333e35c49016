//! Content normalization applied to both sides before comparison.

use regex::Regex;
use std::sync::LazyLock;

/// Legacy namespace token and its canonical replacement.
pub const LEGACY_NAMESPACE: &str = "Dev:";
pub const CANONICAL_NAMESPACE: &str = "Module:Dev/";

static INTERLANGUAGE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[(en|ru|pt-br):[^\]]*\]\]").expect("interlanguage link pattern is valid")
});

/// Normalize a document body.
///
/// Removes `en`/`ru`/`pt-br` interlanguage links, rewrites `Dev:` to
/// `Module:Dev/` and trims trailing whitespace. Idempotent.
///
/// ```rust
/// use core_sync::transform::transform;
///
/// assert_eq!(transform("see [[en:Foo]] and Dev:Bar"), "see  and Module:Dev/Bar");
/// ```
pub fn transform(text: &str) -> String {
    let mut stripped = text.to_string();
    // Removing one link can splice the remaining text into a new one.
    while INTERLANGUAGE_LINK.is_match(&stripped) {
        stripped = INTERLANGUAGE_LINK.replace_all(&stripped, "").into_owned();
    }

    stripped
        .replace(LEGACY_NAMESPACE, CANONICAL_NAMESPACE)
        .trim_end()
        .to_string()
}

/// Map a legacy `Dev:` title onto its `Module:Dev/` destination title.
pub fn remap_title(title: &str) -> String {
    match title.strip_prefix(LEGACY_NAMESPACE) {
        Some(rest) => format!("{}{}", CANONICAL_NAMESPACE, rest),
        None => title.to_string(),
    }
}
