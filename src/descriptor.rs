//! Show descriptors: the entries of a batch file.
//!
//! An entry is either a plain URL or a single-key mapping naming a
//! directive. Entries are converted from YAML once, at load time, into a
//! [`Descriptor`]; the resolver then matches on it exhaustively.
//!
//! ```yaml
//! - https://www.cagematch.net/?id=1&nr=12345
//! - taping:
//!     name: Superstars Taping
//!     urls: [https://www.cagematch.net/?id=1&nr=1, https://www.cagematch.net/?id=1&nr=2]
//! - partial:
//!     url: https://www.cagematch.net/?id=1&nr=3
//!     exclude: [1, 4]
//!     exclude_from_count: true
//! - squashmatch:
//!     url: https://www.cagematch.net/?id=1&nr=4
//!     squash: ["2-5"]
//! ```

use std::str::FromStr;

use serde_yaml::Value;

use crate::error::{ResolveError, Result};

const SQUASH: &str = "squashmatch";
const TAPING: &str = "taping";
const PARTIAL: &str = "partial";

/// How to obtain one logical show.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    /// A single event page.
    Url(String),
    /// Combine runs of matches into single matches.
    Squash {
        show: Box<Descriptor>,
        ranges: Vec<SquashRange>,
    },
    /// Several parts merged into one show, optionally renamed.
    Taping {
        name: Option<String>,
        parts: Vec<Descriptor>,
    },
    /// A broadcast missing some matches (1-based positions).
    Partial {
        show: Box<Descriptor>,
        exclude: Vec<i64>,
        exclude_from_count: Option<bool>,
    },
}

/// Inclusive, 1-based range of matches written `start-end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquashRange {
    pub start: usize,
    pub end: usize,
}

impl FromStr for SquashRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("squash range '{s}' is not of the form x-y"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|e| format!("squash range '{s}': {e}"))
        };
        Ok(Self {
            start: parse(start)?,
            end: parse(end)?,
        })
    }
}

impl Descriptor {
    /// Short name of the directive, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Squash { .. } => SQUASH,
            Self::Taping { .. } => TAPING,
            Self::Partial { .. } => PARTIAL,
        }
    }

    pub fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::String(url) => Ok(Self::Url(url.clone())),
            Value::Mapping(map) if map.len() == 1 => {
                let Some((key, body)) = map.iter().next() else {
                    return Err(invalid(value));
                };
                let parsed = match key.as_str() {
                    Some(SQUASH) => Self::parse_squash(body)?,
                    Some(TAPING) => Self::parse_taping(body)?,
                    Some(PARTIAL) => Self::parse_partial(body)?,
                    _ => None,
                };
                parsed.ok_or_else(|| invalid(value))
            }
            _ => Err(invalid(value)),
        }
    }

    /// `{url: <descriptor>, squash: ["x-y", ...]}`
    fn parse_squash(body: &Value) -> Result<Option<Self>> {
        let (Some(url), Some(squash)) = (
            body.get("url"),
            body.get("squash").and_then(Value::as_sequence),
        ) else {
            return Ok(None);
        };

        let ranges = squash
            .iter()
            .map(|r| {
                r.as_str()
                    .ok_or_else(|| invalid(r))?
                    .parse::<SquashRange>()
                    .map_err(ResolveError::InvalidDescriptor)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Self::Squash {
            show: Box::new(Self::parse(url)?),
            ranges,
        }))
    }

    /// `{name: str, urls: [...]}`, `{urls: [...]}` or a bare list.
    fn parse_taping(body: &Value) -> Result<Option<Self>> {
        let urls = match body {
            Value::Sequence(urls) => urls,
            _ => match body.get("urls").and_then(Value::as_sequence) {
                Some(urls) => urls,
                None => return Ok(None),
            },
        };
        if urls.is_empty() {
            return Err(ResolveError::InvalidDescriptor(
                "taping has no parts".to_string(),
            ));
        }

        let name = body.get("name").and_then(Value::as_str).map(str::to_string);
        let parts = urls.iter().map(Self::parse).collect::<Result<Vec<_>>>()?;
        Ok(Some(Self::Taping { name, parts }))
    }

    /// `{url: <descriptor>, exclude: [int, ...], exclude_from_count: bool}`,
    /// the last key being optional.
    fn parse_partial(body: &Value) -> Result<Option<Self>> {
        let (Some(url), Some(exclude)) = (
            body.get("url"),
            body.get("exclude").and_then(Value::as_sequence),
        ) else {
            return Ok(None);
        };

        let exclude = exclude
            .iter()
            .map(|x| x.as_i64().ok_or_else(|| invalid(x)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Self::Partial {
            show: Box::new(Self::parse(url)?),
            exclude,
            exclude_from_count: body.get("exclude_from_count").and_then(Value::as_bool),
        }))
    }
}

impl TryFrom<Value> for Descriptor {
    type Error = ResolveError;

    fn try_from(value: Value) -> Result<Self> {
        Self::parse(&value)
    }
}

fn invalid(value: &Value) -> ResolveError {
    let shown = serde_yaml::to_string(value).unwrap_or_else(|_| format!("{value:?}"));
    ResolveError::InvalidDescriptor(format!(
        "unexpected entry type or bad syntax: {}",
        shown.trim()
    ))
}

/// Read a batch file into raw entries. Each entry is converted on its own
/// so one bad entry does not reject the whole batch.
pub fn load_batch(text: &str) -> std::result::Result<Vec<Value>, serde_yaml::Error> {
    serde_yaml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.cagematch.net/?id=1&nr=1";

    fn parse(yaml: &str) -> Result<Descriptor> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        Descriptor::try_from(value)
    }

    fn url(nr: u32) -> Descriptor {
        Descriptor::Url(format!("https://www.cagematch.net/?id=1&nr={nr}"))
    }

    #[test]
    fn test_plain_url() {
        assert_eq!(parse(URL).unwrap(), Descriptor::Url(URL.to_string()));
    }

    #[test]
    fn test_squash() {
        let d = parse(&format!("squashmatch:\n  url: {URL}\n  squash: [\"1-3\", 5-6]\n")).unwrap();
        assert_eq!(
            d,
            Descriptor::Squash {
                show: Box::new(Descriptor::Url(URL.to_string())),
                ranges: vec![SquashRange { start: 1, end: 3 }, SquashRange { start: 5, end: 6 }],
            }
        );
        assert_eq!(d.kind(), "squashmatch");
    }

    #[test]
    fn test_squash_bad_range() {
        let yaml = format!("squashmatch:\n  url: {URL}\n  squash: [\"one-two\"]\n");
        let err = parse(&yaml).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidDescriptor(_)));
    }

    #[test]
    fn test_taping_shapes() {
        let yaml = "taping:\n  - https://www.cagematch.net/?id=1&nr=1\n  - https://www.cagematch.net/?id=1&nr=2\n";
        assert_eq!(
            parse(yaml).unwrap(),
            Descriptor::Taping { name: None, parts: vec![url(1), url(2)] }
        );

        let yaml = "taping:\n  urls: [\"https://www.cagematch.net/?id=1&nr=1\"]\n";
        assert_eq!(
            parse(yaml).unwrap(),
            Descriptor::Taping { name: None, parts: vec![url(1)] }
        );

        let yaml = "taping:\n  name: Superstars\n  urls: [\"https://www.cagematch.net/?id=1&nr=1\"]\n";
        assert_eq!(
            parse(yaml).unwrap(),
            Descriptor::Taping { name: Some("Superstars".to_string()), parts: vec![url(1)] }
        );
    }

    #[test]
    fn test_taping_non_string_name_is_ignored() {
        let yaml = "taping:\n  name: 42\n  urls: [\"https://www.cagematch.net/?id=1&nr=1\"]\n";
        assert_eq!(
            parse(yaml).unwrap(),
            Descriptor::Taping { name: None, parts: vec![url(1)] }
        );
    }

    #[test]
    fn test_empty_taping_rejected() {
        assert!(matches!(parse("taping: []"), Err(ResolveError::InvalidDescriptor(_))));
    }

    #[test]
    fn test_partial_shapes() {
        let d = parse(&format!("partial:\n  url: {URL}\n  exclude: [1, 3]\n")).unwrap();
        assert_eq!(
            d,
            Descriptor::Partial {
                show: Box::new(Descriptor::Url(URL.to_string())),
                exclude: vec![1, 3],
                exclude_from_count: None,
            }
        );

        let d = parse(&format!(
            "partial:\n  url: {URL}\n  exclude: [2]\n  exclude_from_count: true\n"
        ))
        .unwrap();
        assert!(matches!(d, Descriptor::Partial { exclude_from_count: Some(true), .. }));

        let d = parse(&format!(
            "partial:\n  url: {URL}\n  exclude: [2]\n  exclude_from_count: sometimes\n"
        ))
        .unwrap();
        assert!(matches!(d, Descriptor::Partial { exclude_from_count: None, .. }));
    }

    #[test]
    fn test_nested_directives() {
        let yaml = r#"
taping:
  name: Nested
  urls:
    - partial:
        url: https://www.cagematch.net/?id=1&nr=1
        exclude: [1]
    - https://www.cagematch.net/?id=1&nr=2
"#;
        let d = parse(yaml).unwrap();
        let Descriptor::Taping { name, parts } = d else {
            panic!("expected taping");
        };
        assert_eq!(name.as_deref(), Some("Nested"));
        assert_eq!(parts[0].kind(), "partial");
        assert_eq!(parts[1], url(2));
    }

    #[test]
    fn test_invalid_shapes() {
        for yaml in [
            "42",
            "unknown: https://www.cagematch.net/?id=1&nr=1",
            "partial:\n  url: https://www.cagematch.net/?id=1&nr=1\n",
            "squashmatch:\n  squash: [\"1-2\"]\n",
            "taping: https://www.cagematch.net/?id=1&nr=1",
            "{taping: [a], partial: {url: b, exclude: []}}",
            "partial:\n  url: 7\n  exclude: [1]\n",
        ] {
            assert!(
                matches!(parse(yaml), Err(ResolveError::InvalidDescriptor(_))),
                "accepted {yaml}"
            );
        }
    }

    #[test]
    fn test_load_batch_keeps_entries_separate() {
        let entries = load_batch("- https://www.cagematch.net/?id=1&nr=1\n- 12\n").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(Descriptor::parse(&entries[0]).is_ok());
        assert!(Descriptor::parse(&entries[1]).is_err());
    }
}
