//! Proxyforge Core - config assembly for proxy routing rules.
//!
//! This crate provides the building blocks for assembling a single
//! proxy-routing configuration out of several partial fragments:
//!
//! - Fetching fragments through an ordered list of mirror hosts ([`fetch`])
//! - Loading fragments from GitHub-style paths, plain URLs, or local JSON5
//!   files ([`source`])
//! - Converting the third-party host-list format into the intercept /
//!   preSetIpList schema ([`convert`])
//! - Deep-merging fragments, stripping excluded domain keys, and canonically
//!   ordering the result ([`value`])
//!
//! # Example
//!
//! ```
//! use proxyforge_core::{merge_into, sort_tree, subtract_keys, ExcludedDomains};
//! use serde_json::json;
//!
//! let base = json!({"server": {"intercepts": {"a.com": {}}}});
//! let overlay = json!({"server": {"intercepts": {"b.com": {}}}});
//!
//! let mut merged = merge_into(base, overlay, true);
//!
//! let excluded = ExcludedDomains::from_domains(["a.com"]);
//! subtract_keys(&mut merged, &excluded);
//! let merged = sort_tree(merged);
//!
//! assert!(merged["server"]["intercepts"].get("a.com").is_none());
//! assert!(merged["server"]["intercepts"].get("b.com").is_some());
//! ```

pub mod convert;
pub mod excluded;
pub mod fetch;
pub mod source;
pub mod value;

pub use convert::{convert_host_list, ConvertError, HostListEntry};
pub use excluded::ExcludedDomains;
pub use fetch::{build_url, FetchError, MirrorClient};
pub use source::{Source, SourceError};
pub use value::{merge_all, merge_into, sort_tree, subtract_keys};
