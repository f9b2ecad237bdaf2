mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Prefix for environment overrides, e.g. `NETCHECK_PING__ATTEMPTS=5`.
pub const ENV_PREFIX: &str = "NETCHECK";

/// Load configuration from a settings file (INI, YAML, JSON or TOML, picked
/// by extension) with environment overrides on top.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let builder = ::config::Config::builder();
    let builder = if is_ini(path) {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        builder.add_source(::config::File::from_str(
            &strip_inline_comments(&text),
            ::config::FileFormat::Ini,
        ))
    } else {
        builder.add_source(::config::File::from(path))
    };

    let config: Config = builder
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to read config file {}", path.display()))?
        .try_deserialize()
        .context("Failed to parse config")?;

    config.validate()?;
    Ok(config)
}

fn is_ini(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("ini"))
}

/// Drops trailing `;` or `#` comments from `key = value` lines.
fn strip_inline_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim_start();
        let is_entry = !trimmed.starts_with(['#', ';', '[']);
        match line.split_once('=') {
            Some((key, value)) if is_entry => {
                let value = value.split(['#', ';']).next().unwrap_or_default();
                out.push_str(key.trim_end());
                out.push_str(" = ");
                out.push_str(value.trim());
            }
            _ => out.push_str(line),
        }
        out.push('\n');
    }
    out
}
