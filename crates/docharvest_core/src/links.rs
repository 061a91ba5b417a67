use std::collections::HashSet;

use regex::Regex;

use crate::types::RawLink;

/// Finds `href` attributes whose value ends in a document extension.
///
/// The value may be quoted with `"`, `'` or the escaped quote `%22` that some
/// pages emit. Matching is literal and case-sensitive on the extension.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    pattern: Regex,
}

impl LinkExtractor {
    pub fn new(extension: &str) -> Self {
        let pattern = format!(
            r#"href=(?:%22|"|')([^"'<>]+?{})(?:%22|"|')"#,
            regex::escape(extension)
        );
        Self {
            pattern: Regex::new(&pattern).expect("escaped extension forms a valid pattern"),
        }
    }

    /// Matched attribute expressions in first-seen order, without duplicates.
    pub fn extract(&self, html: &str) -> Vec<RawLink> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for line in html.lines() {
            for found in self.pattern.find_iter(line) {
                let matched = found.as_str();
                if seen.insert(matched) {
                    links.push(matched.to_string());
                }
            }
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::LinkExtractor;

    #[test]
    fn extension_is_escaped() {
        let extractor = LinkExtractor::new(".pdf");
        assert!(extractor.extract(r#"<a href="/report_pdf">x</a>"#).is_empty());
    }

    #[test]
    fn matches_do_not_span_attributes() {
        let extractor = LinkExtractor::new(".pdf");
        let html = r#"<a href="/a.html" title="b.pdf">x</a>"#;
        assert!(extractor.extract(html).is_empty());
    }

    #[test]
    fn escaped_quotes_are_matched() {
        let extractor = LinkExtractor::new(".pdf");
        let html = "<a href=%22/sds/glue.pdf%22>Glue</a>";
        assert_eq!(extractor.extract(html), vec!["href=%22/sds/glue.pdf%22"]);
    }
}
