//! Non-destructive `.env` loading for local development setups.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, keys
/// and values are trimmed, and a value may be wrapped in matching single or
/// double quotes. Later duplicates of a key win.
pub fn parse_env_lines(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            log::warn!(".env line {} has no '='; ignored", idx + 1);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            log::warn!(".env line {} has an empty key; ignored", idx + 1);
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    vars
}

fn unquote(value: &str) -> &str {
    let b = value.as_bytes();
    if b.len() >= 2 && (b[0] == b'"' || b[0] == b'\'') && b[b.len() - 1] == b[0] {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Load `./.env` into the process environment if the file exists. Variables
/// already present in the real environment are never overridden.
pub fn load_dotenv_if_present() -> Result<()> {
    let path = Path::new(".env");
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)?;
    for (key, value) in parse_env_lines(&content) {
        if std::env::var_os(&key).is_none() {
            unsafe {
                std::env::set_var(&key, &value);
            }
        }
    }
    Ok(())
}
