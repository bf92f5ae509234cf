//! Interpreter settings: width, EOF policy and tape limit.
//!
//! Each setting is resolved in order from CLI flags, then environment
//! variables (`BF_WIDTH`, `BF_EOF`, `BF_MAX_CELLS`), then the `[interpreter]`
//! section of `$XDG_CONFIG_HOME/bf.toml`, then the defaults.

use std::fs;
use std::path::PathBuf;
use cross_xdg::BaseDirs;
use crate::{CellWidth, EofPolicy, RunOptions};

pub const CONFIG_FILE_NAME: &str = "bf.toml";

/// Fully resolved settings for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub width: CellWidth,
    pub eof: EofPolicy,
    pub max_cells: Option<usize>,
}

impl Settings {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            eof: self.eof,
            max_cells: self.max_cells,
        }
    }
}

/// Settings from a single source. `None` means "not set here".
///
/// A `max_cells` of 0 means explicitly unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Overrides {
    pub width: Option<CellWidth>,
    pub eof: Option<EofPolicy>,
    pub max_cells: Option<usize>,
}

impl Overrides {
    /// Fill unset fields from `lower`.
    pub fn or(self, lower: Overrides) -> Overrides {
        Overrides {
            width: self.width.or(lower.width),
            eof: self.eof.or(lower.eof),
            max_cells: self.max_cells.or(lower.max_cells),
        }
    }

    pub fn into_settings(self) -> Settings {
        Settings {
            width: self.width.unwrap_or_default(),
            eof: self.eof.unwrap_or_default(),
            max_cells: self.max_cells.filter(|&n| n != 0),
        }
    }
}

/// Resolve `flags` against the environment, the config file and the defaults.
///
/// Values that fail to parse are skipped and described in `warnings`.
pub fn resolve(flags: Overrides, warnings: &mut Vec<String>) -> Settings {
    let env = from_env(|key| std::env::var(key).ok(), warnings);
    let file = load_from_toml(warnings).unwrap_or_default();
    flags.or(env).or(file).into_settings()
}

/// Read the `BF_*` variables through `lookup`.
pub fn from_env<F>(lookup: F, warnings: &mut Vec<String>) -> Overrides
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = Overrides::default();
    if let Some(v) = lookup("BF_WIDTH") {
        out.width = parse_value("BF_WIDTH", &v, warnings);
    }
    if let Some(v) = lookup("BF_EOF") {
        out.eof = parse_value("BF_EOF", &v, warnings);
    }
    if let Some(v) = lookup("BF_MAX_CELLS") {
        out.max_cells = parse_value("BF_MAX_CELLS", &v, warnings);
    }
    out
}

fn parse_value<T: std::str::FromStr>(origin: &str, raw: &str, warnings: &mut Vec<String>) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warnings.push(format!("ignoring {origin}: cannot parse '{}'", raw.trim()));
            None
        }
    }
}

fn config_path() -> Option<PathBuf> {
    let base_dirs = BaseDirs::new().ok()?;

    // On Linux: resolves to /home/<user>/.config
    // On Windows: resolves to C:\Users\<user>\.config
    // On macOS: resolves to /Users/<user>/.config
    let config_home = base_dirs.config_home();

    let mut path = PathBuf::from(config_home);
    path.push(CONFIG_FILE_NAME);
    Some(path)
}

fn load_from_toml(warnings: &mut Vec<String>) -> Option<Overrides> {
    let path = config_path()?;
    let content = fs::read_to_string(path).ok()?;
    Some(parse_config(&content, warnings))
}

/// Parse the `[interpreter]` section of a config file.
///
/// Very small hand-rolled parser: section headers and `key = value` pairs,
/// values quoted or not, `#` comments on their own line.
pub fn parse_config(content: &str, warnings: &mut Vec<String>) -> Overrides {
    let mut in_section = false;
    let mut out = Overrides::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        if line.starts_with('[') && line.ends_with(']') {
            in_section = line[1..line.len() - 1].trim() == "interpreter";
            continue;
        }
        if !in_section { continue; }

        let Some((key, val_raw)) = line.split_once('=') else { continue };
        let key = key.trim();
        let val_raw = val_raw.trim();
        // Accept quoted or unquoted
        let val = if val_raw.len() >= 2 && val_raw.starts_with('"') && val_raw.ends_with('"') {
            &val_raw[1..val_raw.len() - 1]
        } else {
            val_raw
        };

        let origin = format!("{CONFIG_FILE_NAME} key '{key}'");
        match key {
            "width" => out.width = parse_value(&origin, val, warnings),
            "eof" => out.eof = parse_value(&origin, val, warnings),
            "max_cells" => out.max_cells = parse_value(&origin, val, warnings),
            _ => warnings.push(format!("ignoring unknown {CONFIG_FILE_NAME} key '{key}'")),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interpreter_section_only() {
        let mut warnings = Vec::new();
        let cfg = parse_config(
            r#"
# global defaults
[colors]
width = 64

[interpreter]
width = 16
eof = "unchanged"
max_cells = 4096
"#,
            &mut warnings,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(cfg.width, Some(CellWidth::W16));
        assert_eq!(cfg.eof, Some(EofPolicy::Unchanged));
        assert_eq!(cfg.max_cells, Some(4096));
    }

    #[test]
    fn bad_values_are_skipped_with_a_warning() {
        let mut warnings = Vec::new();
        let cfg = parse_config("[interpreter]\nwidth = 12\ncolour = red\n", &mut warnings);
        assert_eq!(cfg.width, None);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("width"));
    }

    #[test]
    fn env_lookup_is_layered_below_flags() {
        let mut warnings = Vec::new();
        let env = from_env(
            |key| match key {
                "BF_WIDTH" => Some("32".to_string()),
                "BF_EOF" => Some("error".to_string()),
                _ => None,
            },
            &mut warnings,
        );
        let flags = Overrides { width: Some(CellWidth::W8), ..Overrides::default() };
        let settings = flags.or(env).into_settings();
        assert_eq!(settings.width, CellWidth::W8);
        assert_eq!(settings.eof, EofPolicy::Error);
        assert_eq!(settings.max_cells, None);
    }

    #[test]
    fn zero_max_cells_means_unlimited() {
        let low = Overrides { max_cells: Some(10), ..Overrides::default() };
        let high = Overrides { max_cells: Some(0), ..Overrides::default() };
        assert_eq!(high.or(low).into_settings().max_cells, None);
        assert_eq!(low.into_settings().run_options().max_cells, Some(10));
    }

    #[test]
    fn defaults() {
        let settings = Overrides::default().into_settings();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.width, CellWidth::W8);
        assert_eq!(settings.eof, EofPolicy::Zero);
    }
}
