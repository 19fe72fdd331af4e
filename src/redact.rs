//! Secret redaction applied before a value is written to the live log ring
//! or to stdout (spec §9 "Secret handling").
//!
//! Never logs bearer tokens, HF tokens, or AWS keys. Two passes: a
//! key-name pass for JSON-ish `key: value` pairs and a value-pattern pass
//! for the provider/HF token shapes the system hands around at runtime.

use regex::Regex;
use std::sync::OnceLock;

fn sensitive_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)"?(api_key|token|secret|password)"?\s*[:=]\s*"?([^"\s,}]+)"?"#).unwrap()
    })
}

fn token_shape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(rpa_|hf_)[A-Za-z0-9]{6,}\b").unwrap())
}

/// Redact any `(api_key|token|secret|password)` key's value, and any
/// `rpa_…`/`hf_…`-shaped token appearing anywhere else in `input`.
pub fn redact(input: &str) -> String {
    let pass1 = sensitive_key_re().replace_all(input, |caps: &regex::Captures| {
        format!("{}: [REDACTED]", &caps[1])
    });
    token_shape_re().replace_all(&pass1, "[REDACTED]").into_owned()
}
