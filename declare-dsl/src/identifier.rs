//! Identifier normalization and bracket pluralization.
//!
//! Every parser funnels free-text names (field names, role names, model
//! names) through these functions so the AST only ever carries canonical
//! identifiers:
//!
//! ```text
//! "created at"      -> created_at
//! "two-factor code" -> two_factor_code
//! User[s]           -> (User, Users)
//! Categor[y|ies]    -> (Category, Categories)
//! Person[|People]   -> (Person, People)
//! ```

use crate::error::IdentifierError;

/// Longest identifier accepted, matching the common database limit.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Convert free text into a canonical identifier.
///
/// Runs of spaces and hyphens collapse into a single underscore; case is
/// preserved.
pub fn normalize_identifier(text: &str) -> Result<String, IdentifierError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(IdentifierError::Empty);
    }

    let mut normalized = String::with_capacity(trimmed.len());
    let mut in_separator = false;
    for c in trimmed.chars() {
        if c.is_whitespace() || c == '-' {
            in_separator = true;
            continue;
        }
        if in_separator {
            normalized.push('_');
            in_separator = false;
        }
        normalized.push(c);
    }
    // Trailing hyphens survive `trim`.
    if in_separator {
        normalized.push('_');
    }

    match normalized.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => {
            return Err(IdentifierError::InvalidStart {
                identifier: normalized,
            })
        }
    }

    if normalized.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong {
            identifier: normalized,
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if let Some(bad) = normalized
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(IdentifierError::InvalidCharacter {
            identifier: normalized,
            character: bad,
        });
    }

    Ok(normalized)
}

/// Whether `text` is already a canonical identifier.
pub fn is_valid_identifier(text: &str) -> bool {
    matches!(normalize_identifier(text), Ok(normalized) if normalized == text)
}

/// Singular and plural forms decoded from a model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelNameParts {
    pub singular: String,
    pub plural: String,
    /// The text as written, brackets included.
    pub original_form: String,
}

/// Decode the bracket pluralization notation.
///
/// - `User` → (User, User)
/// - `User[s]` → (User, Users)
/// - `Categor[y|ies]` → (Category, Categories)
/// - `Person[|People]` → (Person, People), the plural taken verbatim
pub fn parse_model_name(raw: &str) -> Result<ModelNameParts, IdentifierError> {
    let raw = raw.trim();
    let malformed = |reason: &str| IdentifierError::MalformedPluralization {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };

    let Some(open) = raw.find('[') else {
        if raw.contains(']') {
            return Err(malformed("unmatched ']'"));
        }
        if raw.contains('|') {
            return Err(malformed("'|' outside brackets"));
        }
        let name = normalize_identifier(raw)?;
        return Ok(ModelNameParts {
            singular: name.clone(),
            plural: name,
            original_form: raw.to_string(),
        });
    };

    if !raw.ends_with(']') {
        return Err(malformed("expected ']' at the end of the name"));
    }
    let stem = raw[..open].trim();
    if stem.is_empty() {
        return Err(malformed("missing name before '['"));
    }
    if stem.contains('|') || stem.contains(']') {
        return Err(malformed("'|' or ']' before '['"));
    }
    let inner = &raw[open + 1..raw.len() - 1];
    if inner.contains('[') || inner.contains(']') {
        return Err(malformed("nested brackets"));
    }

    let suffixes: Vec<&str> = inner.split('|').map(str::trim).collect();
    let (singular, plural) = match suffixes.as_slice() {
        [suffix] => (stem.to_string(), format!("{}{}", stem, suffix)),
        ["", irregular] => {
            if irregular.is_empty() {
                return Err(malformed("irregular plural is empty"));
            }
            (stem.to_string(), irregular.to_string())
        }
        [singular_suffix, plural_suffix] => (
            format!("{}{}", stem, singular_suffix),
            format!("{}{}", stem, plural_suffix),
        ),
        _ => return Err(malformed("at most one '|' is allowed")),
    };

    Ok(ModelNameParts {
        singular: normalize_identifier(&singular)?,
        plural: normalize_identifier(&plural)?,
        original_form: raw.to_string(),
    })
}

/// Strip exactly one trailing `s` from names longer than one character.
///
/// Used for role and model references in authorization rules. It cannot tell
/// `Status` from a plural and knows nothing of irregular plurals such as
/// `People`; resolving against declared model names happens downstream.
pub fn depluralize(word: &str) -> String {
    if word.chars().count() > 1 && (word.ends_with('s') || word.ends_with('S')) {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_spaces_and_hyphens() {
        assert_eq!(normalize_identifier("created at").unwrap(), "created_at");
        assert_eq!(
            normalize_identifier("two-factor  code").unwrap(),
            "two_factor_code"
        );
        assert_eq!(normalize_identifier("  Display Name ").unwrap(), "Display_Name");
        assert_eq!(normalize_identifier("a - b").unwrap(), "a_b");
    }

    #[test]
    fn test_normalize_rejects_invalid() {
        assert_eq!(normalize_identifier("   "), Err(IdentifierError::Empty));
        assert!(matches!(
            normalize_identifier("2fa code"),
            Err(IdentifierError::InvalidStart { .. })
        ));
        assert!(matches!(
            normalize_identifier("_private"),
            Err(IdentifierError::InvalidStart { .. })
        ));
        assert!(matches!(
            normalize_identifier("price$"),
            Err(IdentifierError::InvalidCharacter { character: '$', .. })
        ));
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(matches!(
            normalize_identifier(&long),
            Err(IdentifierError::TooLong { .. })
        ));
        assert!(normalize_identifier(&"a".repeat(MAX_IDENTIFIER_LEN)).is_ok());
    }

    #[test]
    fn test_normalize_is_idempotent_on_examples() {
        for input in ["created at", "x-y z", "Already_Fine", "a1 b2"] {
            let once = normalize_identifier(input).unwrap();
            assert_eq!(normalize_identifier(&once).unwrap(), once);
            assert!(is_valid_identifier(&once));
        }
        assert!(!is_valid_identifier("created at"));
    }

    #[test]
    fn test_model_name_bare() {
        let parts = parse_model_name("User").unwrap();
        assert_eq!(parts.singular, "User");
        assert_eq!(parts.plural, "User");
        assert_eq!(parts.original_form, "User");
    }

    #[test]
    fn test_model_name_laws() {
        let user = parse_model_name("User[s]").unwrap();
        assert_eq!((user.singular.as_str(), user.plural.as_str()), ("User", "Users"));

        let category = parse_model_name("Categor[y|ies]").unwrap();
        assert_eq!(category.singular, "Category");
        assert_eq!(category.plural, "Categories");

        let person = parse_model_name("Person[|People]").unwrap();
        assert_eq!(person.singular, "Person");
        assert_eq!(person.plural, "People");

        let item = parse_model_name("Item[]").unwrap();
        assert_eq!(item.singular, "Item");
        assert_eq!(item.plural, "Item");
    }

    #[test]
    fn test_model_name_multi_word_stem() {
        let parts = parse_model_name("Blog Post[s]").unwrap();
        assert_eq!(parts.singular, "Blog_Post");
        assert_eq!(parts.plural, "Blog_Posts");
        assert_eq!(parts.original_form, "Blog Post[s]");
    }

    #[test]
    fn test_model_name_malformed() {
        for raw in [
            "User[a|b|c]",
            "User[s",
            "Users]",
            "User[s]x",
            "[s]",
            "User[s][t]",
            "User|s",
            "Person[|]",
        ] {
            assert!(
                matches!(
                    parse_model_name(raw),
                    Err(IdentifierError::MalformedPluralization { .. })
                ),
                "expected malformed pluralization for {raw}"
            );
        }
    }

    #[test]
    fn test_depluralize() {
        assert_eq!(depluralize("admins"), "admin");
        assert_eq!(depluralize("posts"), "post");
        assert_eq!(depluralize("s"), "s");
        assert_eq!(depluralize("editor"), "editor");
        // Known limitation: singular nouns ending in `s` lose it too.
        assert_eq!(depluralize("Status"), "Statu");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_normalize_idempotent(input in "[A-Za-z][A-Za-z0-9 _-]{0,40}") {
            if let Ok(once) = normalize_identifier(&input) {
                prop_assert_eq!(normalize_identifier(&once), Ok(once.clone()));
            }
        }

        #[test]
        fn prop_normalize_removes_separators(input in "[A-Za-z][A-Za-z0-9 -]{0,40}") {
            let normalized = normalize_identifier(&input);
            prop_assert!(normalized.is_ok());
            let normalized = normalized.unwrap_or_default();
            prop_assert!(!normalized.contains(' '));
            prop_assert!(!normalized.contains('-'));
        }

        #[test]
        fn prop_suffix_plural(stem in "[A-Z][a-z]{1,10}", suffix in "[a-z]{0,3}") {
            let parts = parse_model_name(&format!("{stem}[{suffix}]")).unwrap();
            prop_assert_eq!(parts.singular, stem.clone());
            prop_assert_eq!(parts.plural, format!("{stem}{suffix}"));
        }
    }
}
