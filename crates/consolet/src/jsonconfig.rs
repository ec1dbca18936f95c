//! Nested JSON config file editing for the installer flows.
//!
//! The installer merges a launch descriptor into configuration files
//! owned by other programs, so edits are conservative: a merge that would
//! change nothing writes nothing, removal deletes exactly the key the
//! merge added, and a file that fails to parse is never written through.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: '{key}' exists but is not a JSON object", .path.display())]
    NotAnObject { path: PathBuf, key: String },

    #[error("failed to encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Merge `value` at `key_path`, creating the file and any intermediate
/// objects. Returns `false` without touching the file when the leaf
/// already equals `value` - merging twice is a byte-identical no-op.
pub fn merge_value(
    path: &Path,
    key_path: &[&str],
    value: &Value,
) -> Result<bool, ConfigFileError> {
    let Some((leaf, parents)) = key_path.split_last() else {
        return Ok(false);
    };

    let mut root = load(path)?;
    let mut current = &mut root;

    for key in parents {
        let entry = current
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry.as_object_mut() {
            Some(obj) => obj,
            None => {
                return Err(ConfigFileError::NotAnObject {
                    path: path.to_path_buf(),
                    key: (*key).to_string(),
                });
            }
        };
    }

    if current.get(*leaf) == Some(value) {
        return Ok(false);
    }

    current.insert((*leaf).to_string(), value.clone());
    store(path, &root)?;
    Ok(true)
}

/// Remove the leaf at `key_path`. Returns `false` when the file, a parent
/// object, or the key itself is absent - symmetric with [`merge_value`].
pub fn remove_key(path: &Path, key_path: &[&str]) -> Result<bool, ConfigFileError> {
    let Some((leaf, parents)) = key_path.split_last() else {
        return Ok(false);
    };
    if !path.exists() {
        return Ok(false);
    }

    let mut root = load(path)?;
    let mut current = &mut root;

    for key in parents {
        current = match current.get_mut(*key).and_then(Value::as_object_mut) {
            Some(obj) => obj,
            None => return Ok(false),
        };
    }

    if current.remove(*leaf).is_none() {
        return Ok(false);
    }

    store(path, &root)?;
    Ok(true)
}

/// Read the leaf at `key_path`, if the file parses and the path exists.
pub fn read_value(path: &Path, key_path: &[&str]) -> Result<Option<Value>, ConfigFileError> {
    if !path.exists() {
        return Ok(None);
    }

    let root = load(path)?;
    let Some((first, rest)) = key_path.split_first() else {
        return Ok(Some(Value::Object(root)));
    };

    let mut current = match root.get(*first) {
        Some(value) => value,
        None => return Ok(None),
    };
    for key in rest {
        match current.get(*key) {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current.clone()))
}

fn load(path: &Path) -> Result<Map<String, Value>, ConfigFileError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Map::new());
        }
        Err(e) => {
            return Err(ConfigFileError::Read {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    if text.trim().is_empty() {
        return Ok(Map::new());
    }

    let root: Value = serde_json::from_str(&text).map_err(|e| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    match root {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigFileError::NotAnObject {
            path: path.to_path_buf(),
            key: "<root>".to_string(),
        }),
    }
}

fn store(path: &Path, root: &Map<String, Value>) -> Result<(), ConfigFileError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| ConfigFileError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let mut text = serde_json::to_string_pretty(root).map_err(|e| ConfigFileError::Encode {
        path: path.to_path_buf(),
        source: e,
    })?;
    text.push('\n');

    fs::write(path, text).map_err(|e| ConfigFileError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_creates_file_and_parents() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("agents.json");

        let changed =
            merge_value(&path, &["servers", "consolet"], &json!({"command": "x"})).unwrap();
        assert!(changed);

        let root: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(root["servers"]["consolet"]["command"], json!("x"));
    }

    #[test]
    fn second_merge_is_a_byte_identical_noop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agents.json");
        let value = json!({"command": "/usr/bin/consolet", "args": []});

        assert!(merge_value(&path, &["servers", "consolet"], &value).unwrap());
        let first = fs::read(&path).unwrap();

        assert!(!merge_value(&path, &["servers", "consolet"], &value).unwrap());
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn merge_replaces_a_different_value() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agents.json");

        merge_value(&path, &["key"], &json!(1)).unwrap();
        assert!(merge_value(&path, &["key"], &json!(2)).unwrap());

        let root: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(root["key"], json!(2));
    }

    #[test]
    fn merge_preserves_unrelated_keys() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agents.json");
        fs::write(&path, r#"{"other": {"keep": true}}"#).unwrap();

        merge_value(&path, &["servers", "consolet"], &json!({"command": "x"})).unwrap();

        let root: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(root["other"]["keep"], json!(true));
    }

    #[test]
    fn remove_after_merge_restores_key_set() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agents.json");
        fs::write(&path, r#"{"servers": {"existing": 1}}"#).unwrap();

        merge_value(&path, &["servers", "consolet"], &json!({"command": "x"})).unwrap();
        assert!(remove_key(&path, &["servers", "consolet"]).unwrap());

        let root: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let servers = root["servers"].as_object().unwrap();
        assert_eq!(servers.keys().collect::<Vec<_>>(), vec!["existing"]);
    }

    #[test]
    fn remove_is_false_for_absent_key_or_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agents.json");

        assert!(!remove_key(&path, &["servers", "consolet"]).unwrap());

        fs::write(&path, r#"{"servers": {}}"#).unwrap();
        assert!(!remove_key(&path, &["servers", "consolet"]).unwrap());
    }

    #[test]
    fn malformed_file_is_never_written_through() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agents.json");
        fs::write(&path, "{not json").unwrap();

        let err = merge_value(&path, &["key"], &json!(1)).unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[test]
    fn intermediate_non_object_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agents.json");
        fs::write(&path, r#"{"servers": 42}"#).unwrap();

        let err = merge_value(&path, &["servers", "consolet"], &json!(1)).unwrap_err();
        assert!(matches!(err, ConfigFileError::NotAnObject { .. }));
    }

    #[test]
    fn read_value_finds_nested_leaf() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agents.json");
        fs::write(&path, r#"{"servers": {"consolet": {"command": "x"}}}"#).unwrap();

        let value = read_value(&path, &["servers", "consolet"]).unwrap();
        assert_eq!(value, Some(json!({"command": "x"})));
        assert_eq!(read_value(&path, &["servers", "missing"]).unwrap(), None);
    }

    #[test]
    fn empty_key_path_is_a_noop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("agents.json");

        assert!(!merge_value(&path, &[], &json!(1)).unwrap());
        assert!(!path.exists());
    }
}
