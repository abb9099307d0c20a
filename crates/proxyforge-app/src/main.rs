//! Proxyforge - assembles a proxy-routing configuration from remote and
//! local fragments.
//!
//! The pipeline is strictly sequential:
//!
//! 1. Load the excluded-domain list
//! 2. Fetch the target proxy's built-in remote config (plain URL)
//! 3. Fetch the community overlay config (GitHub mirrors)
//! 4. Fetch the third-party host list (GitHub mirrors) and convert it into
//!    the intercept schema
//! 5. Read the local overrides file
//! 6. Merge in precedence order, strip excluded domain keys, canonically
//!    sort, and write the result
//!
//! Any fatal error aborts before the output file is touched.

mod mirrors;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use proxyforge_core::source::save_fragment;
use proxyforge_core::{
    convert_host_list, merge_all, sort_tree, subtract_keys, ExcludedDomains, MirrorClient, Source,
    SourceError,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use mirrors::{
    DEFAULT_REMOTE_URL, GITHUB_MIRRORS, HOST_LIST_PATH, OVERLAY_PATH, USER_CONTENT_MIRRORS,
};

/// Proxyforge - assembles the proxy-routing configuration
#[derive(Parser, Debug)]
#[command(name = "proxyforge", version, about)]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output path for the assembled configuration
    #[arg(long, default_value = "final_config.json")]
    output: PathBuf,

    /// Excluded-domain list (JSON5 array of plain domains)
    #[arg(long, default_value = "assets/excluded_domains.json5")]
    excluded_domains: PathBuf,

    /// Local override fragment (JSON5, highest precedence)
    #[arg(long, default_value = "assets/local_overrides.json5")]
    local_overrides: PathBuf,

    /// Keep preSetIpList entries for IPv6 targets
    #[arg(long)]
    keep_ipv6: bool,

    /// Save each loaded fragment next to the output for inspection
    #[arg(long)]
    save_fragments: bool,
}

/// Initializes logging from the CLI flags (env filter wins when set).
fn init_logging(args: &Args) {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("proxyforge={log_level},warn")));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);
    run(&args).await
}

async fn run(args: &Args) -> Result<()> {
    let excluded =
        ExcludedDomains::load(&args.excluded_domains).context("loading excluded-domain list")?;

    let client = MirrorClient::new().context("building HTTP client")?;

    let default_remote = Source::remote("Default Remote", DEFAULT_REMOTE_URL)
        .load(&client)
        .await
        .context("loading default remote config")?;

    let overlay = Source::github("Community Overlay", OVERLAY_PATH, GITHUB_MIRRORS)
        .load(&client)
        .await
        .context("loading community overlay config")?;

    let raw_host_list = load_host_list(&client).await?;
    let host_rules = convert_host_list(raw_host_list, &excluded, !args.keep_ipv6)
        .context("converting host list")?;

    let local = Source::local("Local Overrides", &args.local_overrides)
        .load(&client)
        .await
        .context("loading local overrides")?;

    if args.save_fragments {
        let fragments = [
            ("default-remote", &default_remote),
            ("overlay", &overlay),
            ("host-rules", &host_rules),
            ("local-overrides", &local),
        ];
        for (slug, value) in fragments {
            save_fragment(slug, value, &fragment_path(&args.output, slug))
                .context("saving fragment")?;
        }
    }

    let final_config = assemble(vec![default_remote, overlay, host_rules, local], &excluded);

    let text = serde_json::to_string_pretty(&final_config).context("serializing final config")?;
    fs::write(&args.output, text)
        .with_context(|| format!("writing {}", args.output.display()))?;
    tracing::info!("Saved final config as {}", args.output.display());

    Ok(())
}

/// Fetches the host list, retrying through the raw-content mirrors (with an
/// empty-list fallback) once the primary mirrors are exhausted.
async fn load_host_list(client: &MirrorClient) -> Result<Value> {
    let primary = Source::github("Host List", HOST_LIST_PATH, GITHUB_MIRRORS);
    match primary.load(client).await {
        Ok(value) => Ok(value),
        Err(SourceError::Fetch(err)) => {
            let Some(alt_path) = mirrors::raw_content_path(HOST_LIST_PATH) else {
                return Err(err).context("loading host list");
            };
            tracing::warn!("{err}; retrying through the raw-content mirrors");
            Source::github("Host List", alt_path, USER_CONTENT_MIRRORS)
                .with_fallback("[]")
                .load(client)
                .await
                .context("loading host list")
        }
        Err(err) => Err(err).context("loading host list"),
    }
}

/// Merges fragments in precedence order (first is base, last wins), strips
/// excluded domain keys at every depth, and canonically orders the result.
fn assemble(fragments: Vec<Value>, excluded: &ExcludedDomains) -> Value {
    let mut merged = merge_all(fragments);
    subtract_keys(&mut merged, excluded);
    tracing::info!("Merged all configs and cleared excluded domain rules");
    sort_tree(merged)
}

/// Places a fragment dump next to the output file.
fn fragment_path(output: &Path, slug: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("final_config");
    output.with_file_name(format!("{stem}-{slug}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assemble_applies_precedence_subtraction_and_ordering() {
        let default_remote = json!({
            "server": {"enabled": false, "setting": {"timeout": 30}}
        });
        let overlay = json!({
            "server": {"enabled": true}
        });
        let host_rules = json!({
            "server": {
                "intercepts": {"a.com": {".*": {"sni": "none"}}, "blocked.com": {}},
                "preSetIpList": {"a.com": {"1.2.3.4": true}}
            }
        });
        let local = json!({
            "server": {"setting": {"timeout": 10}}
        });

        let excluded = ExcludedDomains::from_domains(["blocked.com"]);
        let out = assemble(vec![default_remote, overlay, host_rules, local], &excluded);

        // Later fragments win at scalar leaves.
        assert_eq!(out["server"]["enabled"], true);
        assert_eq!(out["server"]["setting"]["timeout"], 10);
        // The host-list fragment always contributes both rule maps.
        assert!(out["server"]["intercepts"].is_object());
        assert!(out["server"]["preSetIpList"].is_object());
        // Excluded keys are gone at every depth.
        assert!(out["server"]["intercepts"].get("blocked.com").is_none());
        // Canonical order: longest key first.
        let server_keys: Vec<&String> = out["server"].as_object().unwrap().keys().collect();
        assert_eq!(
            server_keys,
            ["preSetIpList", "intercepts", "enabled", "setting"]
        );
    }

    #[test]
    fn assemble_of_nothing_is_null() {
        let out = assemble(vec![], &ExcludedDomains::new());
        assert_eq!(out, json!(null));
    }

    #[test]
    fn fragment_paths_sit_next_to_the_output() {
        assert_eq!(
            fragment_path(Path::new("out/final_config.json"), "overlay"),
            Path::new("out/final_config-overlay.json")
        );
    }

    #[test]
    fn cli_defaults_parse() {
        let args = Args::parse_from(["proxyforge"]);
        assert!(!args.debug);
        assert!(!args.keep_ipv6);
        assert_eq!(args.output, Path::new("final_config.json"));
    }
}
