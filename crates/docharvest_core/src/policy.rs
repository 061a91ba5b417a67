pub const DEFAULT_EXTENSION: &str = ".pdf";
pub const DEFAULT_BASE_ORIGIN: &str = "https://millcraft.com";

/// What counts as a document link and how broken links are repaired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPolicy {
    /// Case-sensitive suffix of document links, including the dot.
    pub extension: String,
    /// Origin prepended to links that are not absolute URLs.
    pub base_origin: String,
}

impl LinkPolicy {
    pub fn new(extension: impl Into<String>, base_origin: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            base_origin: base_origin.into(),
        }
    }
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION, DEFAULT_BASE_ORIGIN)
    }
}
