//! Font-family configuration string parsing.
//!
//! Terminal font options use the CSS convention: an ordered, comma-separated
//! fallback list where individual names may be wrapped in single or double
//! quotes (`'"Fira Code", monospace'`). Order defines preference; the first
//! resolvable monospace candidate wins downstream.

/// Parse a font-family option value into ordered, unquoted candidate names.
///
/// `None` (the analog of an unset or non-string option value) and the empty
/// string both yield an empty candidate list. Quoted and unquoted spellings
/// of the same name parse identically; surrounding whitespace is trimmed
/// and empty segments are dropped.
pub fn parse(value: Option<&str>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };

    let mut names = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in value.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                ',' => flush_name(&mut names, &mut current),
                _ => current.push(ch),
            },
        }
    }
    // An unterminated quote is treated as running to the end of the value.
    flush_name(&mut names, &mut current);

    names
}

fn flush_name(names: &mut Vec<String>, current: &mut String) {
    let name = current.trim();
    if !name.is_empty() {
        names.push(name.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_names() {
        assert_eq!(parse(Some("Fira Code, monospace")), vec![
            "Fira Code",
            "monospace"
        ]);
    }

    #[test]
    fn test_quoted_names_match_unquoted() {
        assert_eq!(
            parse(Some("\"Fira Code\", monospace")),
            parse(Some("Fira Code, monospace"))
        );
        assert_eq!(
            parse(Some("'Fira Code', monospace")),
            parse(Some("Fira Code, monospace"))
        );
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(parse(Some("  Iosevka ,  'JetBrains Mono'  ")), vec![
            "Iosevka",
            "JetBrains Mono"
        ]);
    }

    #[test]
    fn test_empty_segments_dropped() {
        assert_eq!(parse(Some("Fira Code,,monospace,")), vec![
            "Fira Code",
            "monospace"
        ]);
    }

    #[test]
    fn test_empty_and_missing_values() {
        assert!(parse(Some("")).is_empty());
        assert!(parse(Some("   ")).is_empty());
        assert!(parse(None).is_empty());
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(parse(Some("'Fira Code, monospace")), vec![
            "Fira Code, monospace"
        ]);
    }

    #[test]
    fn test_order_preserved() {
        assert_eq!(parse(Some("b, a, c")), vec!["b", "a", "c"]);
    }
}
