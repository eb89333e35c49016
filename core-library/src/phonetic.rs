//! Phonetic keys for Chinese titles
//!
//! Titles are reduced to CJK ideographs (U+4E00..=U+9FA5), ASCII letters and
//! digits. Ideographs become toneless pinyin; ASCII passes through. Both keys
//! are lowercase and unseparated.

use pinyin::ToPinyin;

/// Full pinyin and initials of a text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneticKeys {
    pub full: String,
    pub initials: String,
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Derive `(full, initials)` keys for `text`.
///
/// ```rust
/// use core_library::phonetic::keys;
///
/// let keys = keys("电解水箱");
/// assert_eq!(keys.full, "dianjieshuixiang");
/// assert_eq!(keys.initials, "djsx");
/// ```
pub fn keys(text: &str) -> PhoneticKeys {
    let mut keys = PhoneticKeys::default();

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            let lower = c.to_ascii_lowercase();
            keys.full.push(lower);
            keys.initials.push(lower);
        } else if is_cjk(c) {
            if let Some(reading) = c.to_pinyin() {
                keys.full.push_str(reading.plain());
                keys.initials.push_str(reading.first_letter());
            }
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cjk_title() {
        let k = keys("水藻箱");
        assert_eq!(k.full, "shuizaoxiang");
        assert_eq!(k.initials, "szx");
    }

    #[test]
    fn test_mixed_title_strips_punctuation() {
        let k = keys("MediaWiki:Common.css");
        assert_eq!(k.full, "mediawikicommoncss");
        assert_eq!(k.initials, "mediawikicommoncss");

        let k = keys("氧石 (Oxylite) 2");
        assert_eq!(k.full, "yangshioxylite2");
        assert_eq!(k.initials, "ysoxylite2");
    }

    #[test]
    fn test_empty_and_symbol_only() {
        assert_eq!(keys(""), PhoneticKeys::default());
        assert_eq!(keys("—·！"), PhoneticKeys::default());
    }

    #[test]
    fn test_query_fragment_is_ascii_passthrough() {
        let k = keys("shuizao");
        assert_eq!(k.full, "shuizao");
        assert_eq!(k.initials, "shuizao");
    }
}
