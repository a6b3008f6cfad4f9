/// One scoring unit of a query, still in raw (unnormalized) words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryComponent {
    Term(String),
    Phrase(Vec<String>),
}

/// Split a query into terms and double-quoted phrases, left to right.
///
/// A quoted span holding a single word becomes a `Term`; an empty one is
/// dropped. A quote with no closing partner is read as plain terms.
pub fn parse_query(query: &str) -> Vec<QueryComponent> {
    let mut components = Vec::new();
    let mut rest = query.trim();
    while !rest.is_empty() {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(after_quote) = rest.strip_prefix('"') {
            if let Some(end) = after_quote.find('"') {
                push_phrase(&mut components, &after_quote[..end]);
                rest = &after_quote[end + 1..];
                continue;
            }
            components.extend(after_quote.split_whitespace().map(|w| QueryComponent::Term(w.to_string())));
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        components.push(QueryComponent::Term(rest[..end].to_string()));
        rest = &rest[end..];
    }
    components
}

fn push_phrase(components: &mut Vec<QueryComponent>, inner: &str) {
    let mut words: Vec<String> = inner.split_whitespace().map(str::to_string).collect();
    match words.len() {
        0 => {}
        1 => components.push(QueryComponent::Term(words.remove(0))),
        _ => components.push(QueryComponent::Phrase(words)),
    }
}

#[cfg(test)]
mod tests {
    use super::QueryComponent::{Phrase, Term};
    use super::*;

    fn t(s: &str) -> QueryComponent {
        Term(s.to_string())
    }

    fn p(words: &[&str]) -> QueryComponent {
        Phrase(words.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn terms_and_phrases() {
        assert_eq!(
            parse_query(r#""hong kong" universities  "computer   science" ranking"#),
            vec![p(&["hong", "kong"]), t("universities"), p(&["computer", "science"]), t("ranking")]
        );
    }

    #[test]
    fn single_word_phrase_is_a_term() {
        assert_eq!(parse_query(r#""cat" dog"#), vec![t("cat"), t("dog")]);
    }

    #[test]
    fn degenerate_queries() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("   ").is_empty());
        assert!(parse_query(r#""  ""#).is_empty());
    }

    #[test]
    fn unterminated_quote_reads_as_terms() {
        assert_eq!(parse_query(r#"cat "big dog"#), vec![t("cat"), t("big"), t("dog")]);
    }

    #[test]
    fn adjacent_phrase_and_term() {
        assert_eq!(parse_query(r#"a"b c"d"#), vec![t(r#"a"b"#), t(r#"c"d"#)]);
    }
}
