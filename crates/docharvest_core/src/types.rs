use std::collections::HashSet;
use std::fmt;

use url::Url;

/// Markup substring captured verbatim from the page, e.g. `href="/a.pdf"`.
pub type RawLink = String;

/// An absolute `http(s)` URL ending in the document extension.
///
/// Only the normalizer can build one, so holding a `NormalizedLink` means the
/// URL has already been validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedLink {
    text: String,
    url: Url,
}

impl NormalizedLink {
    pub(crate) fn new(text: String, url: Url) -> Self {
        Self { text, url }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for NormalizedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for NormalizedLink {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Ordered, duplicate-free collection of links. First insertion wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    links: Vec<NormalizedLink>,
    seen: HashSet<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when an equal link was already present.
    pub fn insert(&mut self, link: NormalizedLink) -> bool {
        if !self.seen.insert(link.text.clone()) {
            return false;
        }
        self.links.push(link);
        true
    }

    pub fn contains(&self, link: &str) -> bool {
        self.seen.contains(link)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedLink> {
        self.links.iter()
    }

    pub fn as_slice(&self) -> &[NormalizedLink] {
        &self.links
    }

    pub fn into_vec(self) -> Vec<NormalizedLink> {
        self.links
    }
}

impl IntoIterator for LinkSet {
    type Item = NormalizedLink;
    type IntoIter = std::vec::IntoIter<NormalizedLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a NormalizedLink;
    type IntoIter = std::slice::Iter<'a, NormalizedLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}

impl FromIterator<NormalizedLink> for LinkSet {
    fn from_iter<T: IntoIterator<Item = NormalizedLink>>(iter: T) -> Self {
        let mut set = LinkSet::new();
        for link in iter {
            set.insert(link);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    InvalidUrl(String),
    WrongExtension,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Empty => write!(f, "empty link"),
            RejectReason::InvalidUrl(detail) => write!(f, "invalid url ({detail})"),
            RejectReason::WrongExtension => write!(f, "does not end in the document extension"),
        }
    }
}

/// A raw link that could not be turned into a [`NormalizedLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLink {
    pub raw: RawLink,
    /// Last candidate tried, after unwrapping and repair.
    pub candidate: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOutput {
    pub links: LinkSet,
    pub rejected: Vec<RejectedLink>,
}
