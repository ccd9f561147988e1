//! Main-section parsing for `META-INF/MANIFEST.MF`.
//!
//! Only the main attributes are kept; per-entry sections after the first blank
//! line are ignored. Attribute names compare case-insensitively, and a line
//! starting with a single space continues the previous value.

use std::collections::HashMap;

pub const META_INF: &str = "META-INF";
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
pub const MULTI_RELEASE: &str = "Multi-Release";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    main: HashMap<String, String>,
}

impl Manifest {
    /// Parses manifest bytes. Errors describe the first offending line.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| format!("not valid UTF-8: {e}"))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut main = HashMap::new();
        let mut current: Option<(String, String)> = None;

        for (idx, line) in text.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                let Some((_, value)) = current.as_mut() else {
                    return Err(format!("line {}: continuation without attribute", idx + 1));
                };
                value.push_str(rest);
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(format!("line {}: missing ':' in {line:?}", idx + 1));
            };
            if !is_valid_name(name) {
                return Err(format!("line {}: invalid attribute name {name:?}", idx + 1));
            }
            let value = value.strip_prefix(' ').unwrap_or(value);

            if let Some((k, v)) = current.take() {
                main.insert(k, v);
            }
            current = Some((name.to_ascii_lowercase(), value.to_string()));
        }

        if let Some((k, v)) = current {
            main.insert(k, v);
        }
        Ok(Self { main })
    }

    pub fn main_attribute(&self, name: &str) -> Option<&str> {
        self.main.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_multi_release(&self) -> bool {
        self.main_attribute(MULTI_RELEASE)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 70
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
