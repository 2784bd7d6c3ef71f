//! Naming conventions for tables and columns.

/// Converts a camelCase or PascalCase name to snake_case.
///
/// ```rust
/// use spellbook_core::naming::snake_case;
///
/// assert_eq!(snake_case("authorId"), "author_id");
/// assert_eq!(snake_case("TagMap"), "tag_map");
/// assert_eq!(snake_case("created_at"), "created_at");
/// ```
#[must_use]
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// Pluralizes an English noun, covering the regular cases.
#[must_use]
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if ["s", "x", "z", "ch", "sh"].iter().any(|end| lower.ends_with(end)) {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiouAEIOU".contains(c)) {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

/// Derives the default table name of a model: the snake_case plural.
#[must_use]
pub fn table_name(model: &str) -> String {
    pluralize(&snake_case(model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("wordCount"), "word_count");
        assert_eq!(snake_case("isPrivate"), "is_private");
        assert_eq!(snake_case("Post"), "post");
        assert_eq!(snake_case("id"), "id");
        assert_eq!(snake_case("ID"), "id");
    }

    #[test]
    fn test_table_name() {
        assert_eq!(table_name("Post"), "posts");
        assert_eq!(table_name("TagMap"), "tag_maps");
        assert_eq!(table_name("Category"), "categories");
        assert_eq!(table_name("Box"), "boxes");
        assert_eq!(table_name("Day"), "days");
        assert_eq!(table_name("Match"), "matches");
    }
}
