//! Docharvest core: pure link discovery, normalization and filename derivation.
mod filename;
mod links;
mod normalize;
mod policy;
mod types;

pub use filename::{derive_filename, filename_for_url};
pub use links::LinkExtractor;
pub use normalize::{is_valid_url, normalize_links, Normalizer};
pub use policy::{LinkPolicy, DEFAULT_BASE_ORIGIN, DEFAULT_EXTENSION};
pub use types::{LinkSet, NormalizeOutput, NormalizedLink, RawLink, RejectReason, RejectedLink};
