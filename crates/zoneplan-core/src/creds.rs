//! Provider credentials loading
//!
//! The credentials file maps DSP instance names to string-to-string
//! configuration blocks. The format is JSON with comments (`//` and
//! `/* */` outside strings) and tolerated trailing commas. After
//! parsing, any value beginning with `$` is replaced by the named
//! process environment variable; a missing variable yields an empty
//! string, not an error.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use tracing::info;

/// Per-instance provider configuration blocks.
pub type ProviderConfigs = HashMap<String, HashMap<String, String>>;

/// Load the credentials file.
///
/// A missing file is not fatal: it is logged and an empty map is
/// returned. A present-but-malformed file is a configuration error.
pub fn load_provider_configs(path: &Path) -> Result<ProviderConfigs> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("credentials file {} does not exist, skipping", path.display());
            return Ok(ProviderConfigs::new());
        }
        Err(e) => {
            return Err(Error::config(format!(
                "reading credentials file {}: {e}",
                path.display()
            )));
        }
    };

    let cleaned = strip_comments_and_trailing_commas(&raw);
    let mut configs: ProviderConfigs = serde_json::from_str(&cleaned).map_err(|e| {
        Error::config(format!(
            "parsing credentials file {}: {e}",
            path.display()
        ))
    })?;

    replace_env_vars(&mut configs);
    Ok(configs)
}

/// Substitute `$VAR` values from the environment, in place.
fn replace_env_vars(configs: &mut ProviderConfigs) {
    for block in configs.values_mut() {
        for value in block.values_mut() {
            if let Some(var) = value.strip_prefix('$') {
                *value = env::var(var).unwrap_or_default();
            }
        }
    }
}

/// Remove `//`/`/* */` comments and trailing commas, leaving strings
/// untouched.
fn strip_comments_and_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            ',' => {
                // drop the comma if the next non-whitespace closes a scope
                let mut lookahead = chars.clone();
                let upcoming = loop {
                    match lookahead.next() {
                        Some(w) if w.is_whitespace() => continue,
                        other => break other,
                    }
                };
                if !matches!(upcoming, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}
