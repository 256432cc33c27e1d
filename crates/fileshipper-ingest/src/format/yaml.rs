//! YAML parser
//!
//! YAML mappings may be keyed by anything. A mapping keyed exactly by
//! `0..n` in order is a list in disguise and becomes an array; every other
//! mapping becomes an object with string keys. The rule applies at every depth.
//! Falsy values (null, false, 0, "", "0", empty collections) are converted
//! shallowly without descending into them.

use super::{read_text, FormatParser};
use crate::record::{into_record, Record};
use fileshipper_common::{Result, ShipperError};
use serde_json::{Map, Number, Value};
use serde_yaml::{Mapping, Value as YamlValue};
use std::path::Path;

/// Decodes the whole file as one YAML document
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl YamlParser {
    /// Decode YAML text and split it into top-level records
    ///
    /// `<<` merge keys are resolved first. A sequence (or index-keyed mapping)
    /// yields its items, a mapping whose values are all mappings yields its
    /// values, any other mapping is one record.
    pub fn parse_str(&self, path: &Path, content: &str) -> Result<Vec<YamlValue>> {
        let mut document: YamlValue = serde_yaml::from_str(content).map_err(|e| {
            ShipperError::data_format(path, format!("Unable to load YAML data: {}", e))
        })?;
        document.apply_merge().map_err(|e| {
            ShipperError::data_format(path, format!("Unable to resolve YAML merge keys: {}", e))
        })?;
        top_level_records(path, document)
    }
}

impl FormatParser for YamlParser {
    type Raw = YamlValue;

    fn parse(&self, path: &Path) -> Result<Vec<YamlValue>> {
        let content = read_text(path)?;
        self.parse_str(path, &content)
    }

    fn normalize(&self, path: &Path, index: usize, raw: YamlValue) -> Result<Record> {
        into_record(path, index, normalize_yaml(raw))
    }
}

fn top_level_records(path: &Path, document: YamlValue) -> Result<Vec<YamlValue>> {
    match document {
        YamlValue::Null => Ok(Vec::new()),
        YamlValue::Tagged(tagged) => top_level_records(path, tagged.value),
        YamlValue::Sequence(items) => Ok(items),
        YamlValue::Mapping(map) if map.is_empty() => Ok(Vec::new()),
        YamlValue::Mapping(map)
            if is_index_sequence(&map) || map.values().all(|v| untagged(v).is_mapping()) =>
        {
            Ok(map.into_iter().map(|(_, value)| value).collect())
        },
        YamlValue::Mapping(map) => Ok(vec![YamlValue::Mapping(map)]),
        _ => Err(ShipperError::data_format(
            path,
            "Expected a list or a map of records at the top level, found a scalar",
        )),
    }
}

fn untagged(value: &YamlValue) -> &YamlValue {
    match value {
        YamlValue::Tagged(tagged) => untagged(&tagged.value),
        other => other,
    }
}

/// Convert a YAML value into its canonical JSON form
pub fn normalize_yaml(value: YamlValue) -> Value {
    if is_falsy(&value) {
        return shallow(value);
    }

    match value {
        YamlValue::Sequence(items) => Value::Array(items.into_iter().map(normalize_yaml).collect()),
        YamlValue::Mapping(map) if is_index_sequence(&map) => {
            Value::Array(map.into_iter().map(|(_, v)| normalize_yaml(v)).collect())
        },
        YamlValue::Mapping(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (key_to_string(k), normalize_yaml(v)))
                .collect::<Map<String, Value>>(),
        ),
        YamlValue::Tagged(tagged) => normalize_yaml(tagged.value),
        scalar => shallow(scalar),
    }
}

/// Convert without recursion; collections become empty arrays
fn shallow(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => number_to_json(&n),
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(_) | YamlValue::Mapping(_) => Value::Array(Vec::new()),
        YamlValue::Tagged(tagged) => shallow(tagged.value),
    }
}

fn is_falsy(value: &YamlValue) -> bool {
    match value {
        YamlValue::Null => true,
        YamlValue::Bool(b) => !b,
        YamlValue::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        YamlValue::String(s) => s.is_empty() || s == "0",
        YamlValue::Sequence(items) => items.is_empty(),
        YamlValue::Mapping(map) => map.is_empty(),
        YamlValue::Tagged(tagged) => is_falsy(&tagged.value),
    }
}

/// Keys are exactly 0, 1, .., n-1 in that order
fn is_index_sequence(map: &Mapping) -> bool {
    !map.is_empty()
        && map
            .keys()
            .enumerate()
            .all(|(position, key)| key_index(key) == Some(position as u64))
}

fn key_index(key: &YamlValue) -> Option<u64> {
    match key {
        YamlValue::Number(n) => n.as_u64(),
        // canonical decimal strings count as integer keys
        YamlValue::String(s) if s == "0" || (!s.starts_with('0') && !s.starts_with('+')) => {
            s.parse().ok()
        },
        _ => None,
    }
}

fn key_to_string(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => String::new(),
        YamlValue::Tagged(tagged) => key_to_string(tagged.value),
        complex => normalize_yaml(complex).to_string(),
    }
}

fn number_to_json(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Value::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn yaml(text: &str) -> YamlValue {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_sequential_integer_keys_stay_a_list() {
        assert_eq!(normalize_yaml(yaml("{0: x, 1: y}")), json!(["x", "y"]));
    }

    #[test]
    fn test_mixed_keys_become_an_object() {
        assert_eq!(normalize_yaml(yaml("{0: x, name: y}")), json!({"0": "x", "name": "y"}));
    }

    #[test]
    fn test_sparse_integer_keys_become_an_object() {
        assert_eq!(normalize_yaml(yaml("{1: x, 2: y}")), json!({"1": "x", "2": "y"}));
    }

    #[test]
    fn test_reclassification_applies_at_every_depth() {
        let value = normalize_yaml(yaml(
            "host: web1\nvars:\n  disks:\n    0: sda\n    1: sdb\n  tags: {0: a, env: prod}\n",
        ));
        assert_eq!(
            value,
            json!({
                "host": "web1",
                "vars": {
                    "disks": ["sda", "sdb"],
                    "tags": {"0": "a", "env": "prod"}
                }
            })
        );
    }

    #[test]
    fn test_falsy_values_are_kept_shallow() {
        let value = normalize_yaml(yaml("a: ~\nb: false\nc: 0\nd: ''\ne: '0'\nf: []\ng: {}\n"));
        assert_eq!(
            value,
            json!({"a": null, "b": false, "c": 0, "d": "", "e": "0", "f": [], "g": []})
        );
    }

    #[test]
    fn test_tags_are_unwrapped() {
        assert_eq!(normalize_yaml(yaml("!host {name: web1}")), json!({"name": "web1"}));
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(normalize_yaml(yaml("x: .nan")), json!({"x": null}));
    }

    #[test]
    fn test_top_level_list_of_hosts() {
        let path = Path::new("hosts.yaml");
        let raw = YamlParser
            .parse_str(path, "- name: web1\n  port: 80\n- name: web2\n  port: 443\n")
            .unwrap();
        assert_eq!(raw.len(), 2);
        let record = YamlParser.normalize(path, 1, raw[1].clone()).unwrap();
        assert_eq!(record.get("port"), Some(&json!(443)));
    }

    #[test]
    fn test_top_level_keyed_collection() {
        let path = Path::new("hosts.yaml");
        let raw = YamlParser
            .parse_str(path, "web1:\n  address: 10.0.0.1\nweb2:\n  address: 10.0.0.2\n")
            .unwrap();
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn test_merge_keys_are_resolved() {
        let path = Path::new("inventory.yaml");
        let raw = YamlParser
            .parse_str(
                path,
                "defaults: &d {zone: dmz, port: 22}\nhosts:\n  - <<: *d\n    name: web1\n  - <<: *d\n    name: db1\n    port: 5432\n",
            )
            .unwrap();
        assert_eq!(raw.len(), 1);

        let record = YamlParser.normalize(path, 0, raw[0].clone()).unwrap();
        assert_eq!(
            record.get("hosts"),
            Some(&json!([
                {"name": "web1", "zone": "dmz", "port": 22},
                {"name": "db1", "zone": "dmz", "port": 5432}
            ]))
        );
        assert!(!record["hosts"][0].as_object().unwrap().contains_key("<<"));
    }

    #[test]
    fn test_merge_of_a_scalar_is_data_error() {
        let err = YamlParser
            .parse_str(Path::new("bad.yaml"), "- <<: 5\n  name: web1\n")
            .unwrap_err();
        assert!(err.is_data_format());
    }

    #[test]
    fn test_empty_document_has_no_records() {
        assert!(YamlParser.parse_str(Path::new("e.yaml"), "").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_data_error() {
        let err = YamlParser
            .parse_str(Path::new("bad.yaml"), "a: [1, 2\n")
            .unwrap_err();
        assert!(err.is_data_format());
    }
}
