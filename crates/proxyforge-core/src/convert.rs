//! Host-list conversion: third-party domain overrides → intercept schema.
//!
//! The third-party format is a JSON array of 3-element rows
//! `[domainPatterns, sni, target]`. Each row becomes at most one intercept
//! rule and one preSetIpList entry keyed by a "domain rule": the surviving
//! domain patterns of the row joined with `|` (parenthesized when more than
//! one remains).

use std::net::Ipv6Addr;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::excluded::ExcludedDomains;

/// Conversion errors.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The raw value is not an array of `[domains, sni, target]` rows.
    #[error("host list is not an array of [domains, sni, target] entries: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// One row of the third-party host list: `[domains, sni, target]`.
///
/// `sni` is `None` for rows the upstream marks as no-ops; an empty string
/// means "send no SNI" and an empty target means localhost.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostListEntry(Vec<String>, Option<String>, String);

impl HostListEntry {
    /// Creates an entry (rows normally come from [`parse_host_list`]).
    pub fn new(
        domains: Vec<String>,
        sni: Option<impl Into<String>>,
        target: impl Into<String>,
    ) -> Self {
        Self(domains, sni.map(Into::into), target.into())
    }

    /// Raw domain patterns, still carrying upstream decorations.
    pub fn domains(&self) -> &[String] {
        &self.0
    }

    /// SNI override, `None` when the row is a no-op marker.
    pub fn sni(&self) -> Option<&str> {
        self.1.as_deref()
    }

    /// Pinned target IP or host.
    pub fn target(&self) -> &str {
        &self.2
    }
}

/// Decodes the raw downloaded value into typed host-list rows.
///
/// Malformed shapes are fatal; nothing is coerced.
pub fn parse_host_list(raw: Value) -> Result<Vec<HostListEntry>> {
    serde_json::from_value(raw).map_err(ConvertError::Malformed)
}

/// Returns true iff `target` is a bracketed IPv6 literal like `[240e::1]`.
///
/// Malformed bracketed text is not IPv6; neither is a bare address.
pub fn is_ipv6_literal(target: &str) -> bool {
    target
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(|inner| inner.parse::<Ipv6Addr>().is_ok())
        .unwrap_or(false)
}

/// Converts the raw host list into a `server.intercepts` /
/// `server.preSetIpList` fragment, dropping excluded domains.
///
/// With `skip_ipv6` set, rows whose target is an IPv6 literal still produce
/// an intercept rule but no preSetIpList entry.
pub fn convert_host_list(
    raw: Value,
    excluded: &ExcludedDomains,
    skip_ipv6: bool,
) -> Result<Value> {
    let entries = parse_host_list(raw)?;
    tracing::info!("Loaded host list with {} entries", entries.len());

    let mut intercepts = Map::new();
    let mut pre_set_ip_list = Map::new();

    for entry in &entries {
        // A null sni marks the row as an explicit no-op.
        let Some(sni) = entry.sni() else {
            tracing::debug!("Skipping no-op entry {:?}", entry.domains());
            continue;
        };
        let sni = if sni.is_empty() { "none" } else { sni };

        let target = if entry.target().is_empty() {
            "127.0.0.1"
        } else {
            entry.target()
        };

        // Patterns containing `^` are upstream negations with no counterpart
        // in the target schema; the rest lose their `$`/`#` decorations.
        let stripped: Vec<&str> = entry
            .domains()
            .iter()
            .filter(|pattern| !pattern.contains('^'))
            .map(|pattern| pattern.trim_start_matches(['$', '#']))
            .filter(|domain| !excluded.contains(domain))
            .collect();

        if stripped.is_empty() {
            tracing::debug!("Skipping entry with no usable domains {:?}", entry.domains());
            continue;
        }

        let domain_rule = if stripped.len() > 1 {
            format!("({})", stripped.join("|"))
        } else {
            stripped[0].to_string()
        };

        // A lone decoration character strips down to nothing; an empty rule
        // matches nothing and is dropped.
        if domain_rule.is_empty() {
            tracing::debug!("Skipping entry with an empty domain rule {:?}", entry.domains());
            continue;
        }

        // Last row wins when two rows normalize to the same domain rule.
        if intercepts.contains_key(&domain_rule) {
            tracing::debug!("Overwriting sni for duplicate domain rule {domain_rule}");
        }
        intercepts.insert(domain_rule.clone(), json!({".*": {"sni": sni}}));

        if !(skip_ipv6 && is_ipv6_literal(target)) {
            if let Value::Object(targets) = pre_set_ip_list
                .entry(domain_rule)
                .or_insert_with(|| Value::Object(Map::new()))
            {
                targets.insert(target.to_string(), Value::Bool(true));
            }
        }
    }

    tracing::info!(
        "Converted host list into {} intercept rules and {} pinned targets",
        intercepts.len(),
        pre_set_ip_list.len()
    );

    Ok(json!({
        "server": {
            "intercepts": intercepts,
            "preSetIpList": pre_set_ip_list,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(raw: Value) -> Value {
        convert_host_list(raw, &ExcludedDomains::new(), true).unwrap()
    }

    #[test]
    fn strips_decorations_and_defaults_empty_fields() {
        let out = convert(json!([[["$a.com", "#b.com"], "", ""]]));

        let rule = "(a.com|b.com)";
        assert_eq!(out["server"]["intercepts"][rule][".*"]["sni"], "none");
        assert_eq!(out["server"]["preSetIpList"][rule]["127.0.0.1"], true);
    }

    #[test]
    fn single_domain_rule_is_bare() {
        let out = convert(json!([[["a.com"], "cdn", "1.2.3.4"]]));

        assert_eq!(out["server"]["intercepts"]["a.com"][".*"]["sni"], "cdn");
        assert_eq!(out["server"]["preSetIpList"]["a.com"]["1.2.3.4"], true);
    }

    #[test]
    fn null_sni_skips_entry() {
        let out = convert(json!([[["a.com"], null, "1.2.3.4"]]));

        assert_eq!(out["server"]["intercepts"], json!({}));
        assert_eq!(out["server"]["preSetIpList"], json!({}));
    }

    #[test]
    fn caret_patterns_are_dropped() {
        let out = convert(json!([[["^a.com"], "cdn", ""]]));

        assert_eq!(out["server"]["intercepts"], json!({}));
        assert_eq!(out["server"]["preSetIpList"], json!({}));
    }

    #[test]
    fn bare_decoration_pattern_yields_no_rule() {
        let out = convert(json!([[["$"], "cdn", ""]]));

        assert_eq!(out["server"]["intercepts"], json!({}));
        assert_eq!(out["server"]["preSetIpList"], json!({}));
    }

    #[test]
    fn excluded_domains_are_dropped_after_stripping() {
        let excluded = ExcludedDomains::from_domains(["b.com"]);
        let out =
            convert_host_list(json!([[["a.com", "$b.com"], "cdn", ""]]), &excluded, true).unwrap();

        assert!(out["server"]["intercepts"].get("a.com").is_some());
        assert!(out["server"]["intercepts"].get("(a.com|b.com)").is_none());
    }

    #[test]
    fn ipv6_target_skips_pinning_but_keeps_intercept() {
        let out = convert(json!([[["a.com"], "cdn", "[2001:db8::1]"]]));

        assert_eq!(out["server"]["intercepts"]["a.com"][".*"]["sni"], "cdn");
        assert_eq!(out["server"]["preSetIpList"], json!({}));
    }

    #[test]
    fn ipv6_target_is_pinned_when_not_skipping() {
        let out = convert_host_list(
            json!([[["a.com"], "cdn", "[2001:db8::1]"]]),
            &ExcludedDomains::new(),
            false,
        )
        .unwrap();

        assert_eq!(out["server"]["preSetIpList"]["a.com"]["[2001:db8::1]"], true);
    }

    #[test]
    fn duplicate_domain_rule_last_sni_wins_targets_accumulate() {
        let out = convert(json!([
            [["a.com"], "first", "1.1.1.1"],
            [["a.com"], "second", "2.2.2.2"]
        ]));

        assert_eq!(out["server"]["intercepts"]["a.com"][".*"]["sni"], "second");
        assert_eq!(out["server"]["preSetIpList"]["a.com"]["1.1.1.1"], true);
        assert_eq!(out["server"]["preSetIpList"]["a.com"]["2.2.2.2"], true);
    }

    #[test]
    fn malformed_host_list_is_rejected() {
        let err = convert_host_list(json!({"not": "a list"}), &ExcludedDomains::new(), true);
        assert!(matches!(err, Err(ConvertError::Malformed(_))));

        let err = convert_host_list(json!([["a.com", "b"]]), &ExcludedDomains::new(), true);
        assert!(matches!(err, Err(ConvertError::Malformed(_))));
    }

    #[test]
    fn ipv6_literal_classification() {
        assert!(is_ipv6_literal("[2001:db8::1]"));
        assert!(is_ipv6_literal("[::1]"));
        assert!(!is_ipv6_literal("2001:db8::1"));
        assert!(!is_ipv6_literal("[not-an-address]"));
        assert!(!is_ipv6_literal("1.2.3.4"));
        assert!(!is_ipv6_literal(""));
    }
}
