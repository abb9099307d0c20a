//! Mirror lists and default source locations.
//!
//! All of this is configuration data: which hosts the same logical resource
//! can be fetched through, and where the default fragments live.

/// GitHub mirror hosts, tried in order.
pub const GITHUB_MIRRORS: &[&str] = &[
    "github.com",
    "ghfast.top/https://github.com",
    "xget.xi-xu.me/gh",
];

/// raw.githubusercontent.com mirrors, used when the `raw/` redirect on the
/// primary mirrors is unavailable.
pub const USER_CONTENT_MIRRORS: &[&str] = &[
    "raw.githubusercontent.com",
    "ghproxy.net/https://raw.githubusercontent.com",
];

/// Built-in default remote config of the target proxy.
pub const DEFAULT_REMOTE_URL: &str =
    "https://gitee.com/wangliang181230/dev-sidecar/raw/docmirror2.x/packages/core/src/config/remote_config.json";

/// Community overlay fragment, GitHub-mirrored.
pub const OVERLAY_PATH: &str = "8odream/Devsidecar-8odream-config/raw/main/config.json";

/// Third-party host list, GitHub-mirrored.
pub const HOST_LIST_PATH: &str = "SpaceTimee/Cealing-Host/raw/main/Cealing-Host.json";

/// Rewrites a `owner/repo/raw/branch/file` resource path into the
/// `owner/repo/branch/file` form served by raw.githubusercontent.com.
///
/// Returns `None` for paths without a `raw/` segment.
pub fn raw_content_path(path: &str) -> Option<String> {
    let (prefix, rest) = path.split_once("/raw/")?;
    Some(format!("{prefix}/{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_raw_segment() {
        assert_eq!(
            raw_content_path("SpaceTimee/Cealing-Host/raw/main/Cealing-Host.json").as_deref(),
            Some("SpaceTimee/Cealing-Host/main/Cealing-Host.json")
        );
    }

    #[test]
    fn paths_without_raw_segment_have_no_rewrite() {
        assert_eq!(raw_content_path("owner/repo/main/file.json"), None);
    }

    #[test]
    fn default_host_list_path_is_rewritable() {
        assert!(raw_content_path(HOST_LIST_PATH).is_some());
    }
}
