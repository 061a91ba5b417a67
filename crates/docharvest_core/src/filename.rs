use std::borrow::Cow;

use url::Url;

use crate::types::NormalizedLink;

/// Deterministic, filesystem-safe filename for a document link:
/// `{host}_{path}_{query}{extension}`, lower-cased.
pub fn derive_filename(link: &NormalizedLink, extension: &str) -> String {
    filename_for_url(link.url(), extension)
}

pub fn filename_for_url(url: &Url, extension: &str) -> String {
    let mut name = String::new();
    if let Some(host) = url.host_str() {
        name.push_str(host);
    }
    // Explicit ports keep two servers on one host apart.
    if let Some(port) = url.port() {
        name.push(':');
        name.push_str(&port.to_string());
    }

    let path = decoded_path(url);
    if !path.is_empty() {
        name.push('_');
        name.push_str(&path.replace('/', "_"));
    }
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        name.push('_');
        name.push_str(&query.replace('&', "_"));
    }

    let mut name = name
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect::<String>()
        .to_lowercase();

    let extension = extension.to_lowercase();
    if !name.ends_with(&extension) {
        name.push_str(&extension);
    }
    name
}

fn decoded_path(url: &Url) -> Cow<'_, str> {
    urlencoding::decode(url.path()).unwrap_or(Cow::Borrowed(url.path()))
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '"' | '\\' | '/' | ':' | '*' | '?' | '<' | '>' | '|') || c.is_control()
}

#[cfg(test)]
mod tests {
    use super::filename_for_url;
    use url::Url;

    fn name(url: &str) -> String {
        filename_for_url(&Url::parse(url).unwrap(), ".pdf")
    }

    #[test]
    fn host_path_and_query_are_joined() {
        assert_eq!(
            name("https://example.com/sheets/a.pdf?v=2&lang=en"),
            "example.com__sheets_a.pdf_v=2_lang=en.pdf"
        );
    }

    #[test]
    fn plain_path_keeps_extension_once() {
        assert_eq!(name("https://example.com/sheets/a.pdf"), "example.com__sheets_a.pdf");
    }

    #[test]
    fn output_is_lower_case() {
        assert_eq!(name("https://Example.COM/Docs/Glue.PDF"), "example.com__docs_glue.pdf");
    }

    #[test]
    fn port_is_kept_and_sanitized() {
        assert_eq!(name("http://127.0.0.1:8080/a.pdf"), "127.0.0.1_8080__a.pdf");
    }

    #[test]
    fn percent_encoding_is_decoded_and_forbidden_chars_replaced() {
        assert_eq!(
            name("https://example.com/my%20doc%3F%22x%22.pdf"),
            "example.com__my doc__x_.pdf"
        );
    }

    #[test]
    fn root_path_still_contributes_a_separator() {
        assert_eq!(name("https://example.com/?f=a.pdf"), "example.com___f=a.pdf");
    }
}
