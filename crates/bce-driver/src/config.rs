//! Feeder configuration file loading
//!
//! The config file is a plain key/value format:
//!
//! ```text
//! # BC_EMU feeder configuration
//! pci_device      = 10ee:903f
//! reg_rtl_id      = 0x0000
//! reg_fifo0       = 0x0100
//! reg_fifo1       = 0x0104
//! reg_fifo_ctl    = 0x0108
//! reg_fifo_select = 0x010C
//! reg_cont_mode   = 0x0110
//! reg_nshot_limit = 0x0114
//!
//! data_files =
//!     patterns/ramp.csv
//!     patterns/checker.csv
//! ```
//!
//! `key = value` and `key value` are both accepted. Lines starting with `#`
//! or `//` are comments. `data_files` starts a multi-line list: every
//! indented line that follows is one path entry.

use crate::error::{FeederError, Result};
use crate::regs::RegisterOffsets;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Config filename used when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "bce_feeder.conf";

/// Parsed feeder configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PCI vendor:device pair identifying the BC_EMU carrier card
    pub pci_device: String,

    /// Byte offsets of the BC_EMU registers inside BAR0
    pub offsets: RegisterOffsets,

    /// Frame data files, in feed order
    pub data_files: Vec<PathBuf>,

    /// How many times each frame is loaded before advancing (>= 1)
    pub repeat_factor: u32,
}

impl Config {
    /// Load and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `FeederError::Config` if the file cannot be read or a
    /// required key is missing or malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FeederError::config(format!("cannot read {}: {e}", path.display()))
        })?;

        tracing::debug!("Loaded config file {}", path.display());
        Self::parse(&text)
    }

    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns `FeederError::Config` on a missing or malformed key.
    pub fn parse(text: &str) -> Result<Self> {
        let mut values: HashMap<&str, &str> = HashMap::new();
        let mut data_files: Vec<PathBuf> = Vec::new();
        let mut in_file_list = false;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }

            // Indented lines continue the data_files list
            if in_file_list && raw.starts_with([' ', '\t']) {
                data_files.push(PathBuf::from(line));
                continue;
            }
            in_file_list = false;

            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => match line.split_once(char::is_whitespace) {
                    Some((k, v)) => (k.trim(), v.trim()),
                    None => (line, ""),
                },
            };

            if key == "data_files" {
                in_file_list = true;
                if !value.is_empty() {
                    data_files.push(PathBuf::from(value));
                }
            } else {
                values.insert(key, value);
            }
        }

        let offsets = RegisterOffsets {
            rtl_id: require_offset(&values, "reg_rtl_id")?,
            fifo0: require_offset(&values, "reg_fifo0")?,
            fifo1: require_offset(&values, "reg_fifo1")?,
            fifo_ctl: require_offset(&values, "reg_fifo_ctl")?,
            fifo_select: require_offset(&values, "reg_fifo_select")?,
            cont_mode: require_offset(&values, "reg_cont_mode")?,
            nshot_limit: require_offset(&values, "reg_nshot_limit")?,
        };

        let repeat_factor = match values.get("repeat_factor") {
            Some(v) => parse_u32(v).ok_or_else(|| {
                FeederError::config(format!("invalid repeat_factor \"{v}\""))
            })?,
            None => 1,
        };
        if repeat_factor == 0 {
            return Err(FeederError::config("repeat_factor must be >= 1"));
        }

        Ok(Self {
            pci_device: require(&values, "pci_device")?.to_string(),
            offsets,
            data_files,
            repeat_factor,
        })
    }
}

fn require<'a>(values: &HashMap<&str, &'a str>, key: &str) -> Result<&'a str> {
    match values.get(key) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(FeederError::config(format!("missing config key \"{key}\""))),
    }
}

fn require_offset(values: &HashMap<&str, &str>, key: &str) -> Result<usize> {
    let raw = require(values, key)?;
    let value = parse_u32(raw).ok_or_else(|| {
        FeederError::config(format!("invalid offset for \"{key}\": \"{raw}\""))
    })?;
    Ok(value as usize)
}

/// Parse an unsigned integer with C-style literal rules: `0x`-prefixed hex
/// or plain decimal.
pub(crate) fn parse_u32(s: &str) -> Option<u32> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# BC_EMU feeder configuration
pci_device      = 10ee:903f
reg_rtl_id      = 0x0000
reg_fifo0       = 0x0100
reg_fifo1       = 0x0104
reg_fifo_ctl    = 0x0108
reg_fifo_select = 0x010C
reg_cont_mode   = 0x0110
reg_nshot_limit = 276

data_files =
    patterns/ramp.csv
    patterns/checker.csv
";

    #[test]
    fn parse_full_config() {
        let cfg = Config::parse(SAMPLE).expect("valid config");
        assert_eq!(cfg.pci_device, "10ee:903f");
        assert_eq!(cfg.offsets.rtl_id, 0x0000);
        assert_eq!(cfg.offsets.fifo_select, 0x010C);
        assert_eq!(cfg.offsets.nshot_limit, 276);
        assert_eq!(cfg.repeat_factor, 1);
        assert_eq!(
            cfg.data_files,
            vec![
                PathBuf::from("patterns/ramp.csv"),
                PathBuf::from("patterns/checker.csv"),
            ]
        );
    }

    #[test]
    fn missing_key_is_config_error() {
        let text = SAMPLE.replace("pci_device      = 10ee:903f\n", "");
        let err = Config::parse(&text).unwrap_err();
        assert!(matches!(err, FeederError::Config { .. }), "got {err}");
    }

    #[test]
    fn bad_offset_is_config_error() {
        let text = SAMPLE.replace("0x0108", "0xZZ");
        assert!(Config::parse(&text).is_err());
    }

    #[test]
    fn repeat_factor_parses_and_rejects_zero() {
        let cfg = Config::parse(&format!("{SAMPLE}\nrepeat_factor = 3\n")).unwrap();
        assert_eq!(cfg.repeat_factor, 3);

        let err = Config::parse(&format!("{SAMPLE}\nrepeat_factor = 0\n")).unwrap_err();
        assert!(matches!(err, FeederError::Config { .. }));
    }

    #[test]
    fn comments_and_key_value_without_equals() {
        let text = SAMPLE.replace("pci_device      = 10ee:903f", "pci_device 10ee:903f")
            + "// trailing comment\n";
        let cfg = Config::parse(&text).unwrap();
        assert_eq!(cfg.pci_device, "10ee:903f");
    }

    #[test]
    fn parse_u32_accepts_hex_and_decimal() {
        assert_eq!(parse_u32("0x10"), Some(16));
        assert_eq!(parse_u32("0X0c"), Some(12));
        assert_eq!(parse_u32("42"), Some(42));
        assert_eq!(parse_u32("banana"), None);
    }
}
