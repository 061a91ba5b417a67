use url::Url;

use crate::policy::LinkPolicy;
use crate::types::{NormalizeOutput, NormalizedLink, RawLink, RejectReason, RejectedLink};

const QUOTE_ARTIFACTS: [&str; 4] = ["%22", "\\\"", "\"", "'"];

/// True for absolute `http`/`https` URLs with a host.
pub fn is_valid_url(candidate: &str) -> bool {
    parse_absolute(candidate).is_ok()
}

/// Turns extracted markup into absolute links, repairing relative and
/// escaped forms against the configured base origin.
#[derive(Debug, Clone)]
pub struct Normalizer {
    extension: String,
    base_origin: String,
}

impl Normalizer {
    pub fn new(policy: &LinkPolicy) -> Self {
        Self {
            extension: policy.extension.clone(),
            base_origin: policy.base_origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn normalize(&self, raw: &str) -> Result<NormalizedLink, RejectedLink> {
        let reject = |candidate: &str, reason| RejectedLink {
            raw: raw.to_string(),
            candidate: candidate.to_string(),
            reason,
        };

        let candidate = strip_wrapper(raw);
        if candidate.is_empty() {
            return Err(reject(candidate, RejectReason::Empty));
        }

        // Valid links pass through untouched.
        let (text, url) = match parse_absolute(candidate) {
            Ok(url) => (candidate.to_string(), url),
            Err(_) => {
                let repaired = self.repair(candidate);
                match parse_absolute(&repaired) {
                    Ok(url) => (url.as_str().to_string(), url),
                    Err(detail) => {
                        return Err(reject(&repaired, RejectReason::InvalidUrl(detail)));
                    }
                }
            }
        };

        if !text.ends_with(&self.extension) {
            return Err(reject(&text, RejectReason::WrongExtension));
        }
        Ok(NormalizedLink::new(text, url))
    }

    /// Normalizes every raw link; repaired forms that collapse onto the same
    /// URL keep only their first occurrence.
    pub fn normalize_all<I, S>(&self, raws: I) -> NormalizeOutput
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut output = NormalizeOutput::default();
        for raw in raws {
            match self.normalize(raw.as_ref()) {
                Ok(link) => {
                    output.links.insert(link);
                }
                Err(rejected) => output.rejected.push(rejected),
            }
        }
        output
    }

    fn repair(&self, candidate: &str) -> String {
        let trimmed = trim_quote_artifacts(candidate);
        if let Some(rest) = trimmed.strip_prefix("//") {
            // Protocol-relative: borrow the scheme of the base origin.
            let scheme = self
                .base_origin
                .split_once("://")
                .map(|(scheme, _)| scheme)
                .unwrap_or("https");
            return format!("{scheme}://{rest}");
        }
        let path = trim_quote_artifacts(trimmed.trim_start_matches('/'));
        format!("{}/{}", self.base_origin, path)
    }
}

/// Convenience wrapper around [`Normalizer::normalize_all`].
pub fn normalize_links(raws: &[RawLink], policy: &LinkPolicy) -> NormalizeOutput {
    Normalizer::new(policy).normalize_all(raws)
}

fn parse_absolute(candidate: &str) -> Result<Url, String> {
    let url = Url::parse(candidate).map_err(|err| err.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {}", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(url)
}

fn strip_wrapper(raw: &str) -> &str {
    let value = raw.trim();
    let value = value.strip_prefix("href=").unwrap_or(value);
    trim_quote_artifacts(value).trim()
}

fn trim_quote_artifacts(value: &str) -> &str {
    let mut current = value;
    loop {
        let before = current.len();
        for artifact in QUOTE_ARTIFACTS {
            current = current.strip_prefix(artifact).unwrap_or(current);
            current = current.strip_suffix(artifact).unwrap_or(current);
        }
        if current.len() == before {
            return current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{strip_wrapper, trim_quote_artifacts};

    #[test]
    fn wrapper_variants_are_stripped() {
        assert_eq!(strip_wrapper(r#"href="/a.pdf""#), "/a.pdf");
        assert_eq!(strip_wrapper("href='/a.pdf'"), "/a.pdf");
        assert_eq!(strip_wrapper("href=%22/a.pdf%22"), "/a.pdf");
        assert_eq!(strip_wrapper("/a.pdf"), "/a.pdf");
    }

    #[test]
    fn nested_artifacts_are_trimmed() {
        assert_eq!(trim_quote_artifacts(r#"%22"a.pdf"%22"#), "a.pdf");
        assert_eq!(trim_quote_artifacts(r#"\"a.pdf\""#), "a.pdf");
    }
}
