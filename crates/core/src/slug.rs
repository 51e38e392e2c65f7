//! URL slug derivation.

use std::collections::HashSet;

/// Maximum slug length stored in the database.
pub const MAX_SLUG_LENGTH: usize = 120;

/// Derive a URL slug from a display name.
///
/// Lowercases, folds common Latin accents to ASCII, and collapses every run of
/// other characters into a single hyphen. Returns an empty string when nothing
/// usable remains; callers substitute a fallback.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            push_part(&mut slug, &mut pending_hyphen, c.encode_utf8(&mut [0; 4]));
        } else if let Some(folded) = fold_accent(c) {
            push_part(&mut slug, &mut pending_hyphen, folded);
        } else {
            pending_hyphen = !slug.is_empty();
        }
    }

    if slug.len() > MAX_SLUG_LENGTH {
        slug.truncate(MAX_SLUG_LENGTH);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

/// Pick `base`, or `base-2`, `base-3`, ... whichever is not already taken.
#[must_use]
pub fn next_available_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2_u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn push_part(slug: &mut String, pending_hyphen: &mut bool, part: &str) {
    if *pending_hyphen {
        slug.push('-');
        *pending_hyphen = false;
    }
    slug.push_str(part);
}

fn fold_accent(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'æ' => "ae",
        'ç' | 'č' | 'ć' => "c",
        'ď' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ě' | 'ę' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ř' => "r",
        'ß' => "ss",
        'š' | 'ś' => "s",
        'ť' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ž' | 'ź' | 'ż' => "z",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Organic Cotton T-Shirt"), "organic-cotton-t-shirt");
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Crème Brûlée"), "creme-brulee");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn test_slugify_drops_unsupported_scripts() {
        assert_eq!(slugify("日本 Tea"), "tea");
        assert_eq!(slugify("日本"), "");
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "a ".repeat(200);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LENGTH);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_next_available_slug() {
        let mut taken = HashSet::new();
        assert_eq!(next_available_slug("shirts", &taken), "shirts");
        taken.insert("shirts".to_string());
        taken.insert("shirts-2".to_string());
        assert_eq!(next_available_slug("shirts", &taken), "shirts-3");
    }
}
