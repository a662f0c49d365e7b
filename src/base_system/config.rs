//! Local settings file: YAML, generated with per-field comment headers.
//!
//! A missing file is created from defaults; an existing file is merged over
//! the defaults so new fields added in later versions appear with their
//! default values (and the file is rewritten to include them).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid yaml at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("config validation: {0}")]
    Validation(String),
}

/// Per-field documentation written as a comment above the field.
#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub description: &'static str,
}

pub trait ConfigSpec: Serialize + DeserializeOwned + Default {
    const FILE_NAME: &'static str;
    fn fields() -> &'static [FieldMeta];
}

/// Load `path` (or `FILE_NAME` in the current directory), creating it from
/// defaults when absent.
pub fn load_or_create<T: ConfigSpec>(config_path: Option<&Path>) -> Result<T, ConfigError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(T::FILE_NAME));

    if !path.exists() {
        let defaults = T::default();
        write_with_comments(&defaults, &path)?;
        return Ok(defaults);
    }

    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let user: Value = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    let mut merged = serde_yaml::to_value(T::default())
        .map_err(|err| ConfigError::Validation(err.to_string()))?;
    let incomplete = missing_fields::<T>(&user);
    merge(&mut merged, user);

    let config: T =
        serde_yaml::from_value(merged).map_err(|err| ConfigError::Validation(err.to_string()))?;

    if incomplete {
        write_with_comments(&config, &path)?;
    }
    Ok(config)
}

pub fn write_with_comments<T: ConfigSpec>(config: &T, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let rendered = render_with_comments(config)?;
    fs::write(path, rendered).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn render_with_comments<T: ConfigSpec>(config: &T) -> Result<String, ConfigError> {
    let value =
        serde_yaml::to_value(config).map_err(|err| ConfigError::Validation(err.to_string()))?;
    let Value::Mapping(mapping) = value else {
        return Err(ConfigError::Validation(
            "config must serialize to a mapping".to_string(),
        ));
    };

    let mut lines = Vec::new();
    for field in T::fields() {
        if !field.description.is_empty() {
            lines.push(format!("# {}", field.description.replace('\n', "\n# ")));
        }
        let key = Value::String(field.name.to_string());
        let val = mapping.get(&key).cloned().unwrap_or(Value::Null);
        let entry = serde_yaml::to_string(&serde_yaml::Mapping::from_iter([(key, val)]))
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        lines.push(entry.trim().to_string());
    }
    lines.push(String::new());
    Ok(lines.join("\n"))
}

fn missing_fields<T: ConfigSpec>(user: &Value) -> bool {
    let Value::Mapping(map) = user else {
        return true;
    };
    T::fields()
        .iter()
        .any(|f| !map.contains_key(Value::String(f.name.to_string())))
}

fn merge(defaults: &mut Value, user: Value) {
    match (defaults, user) {
        (Value::Mapping(dest), Value::Mapping(src)) => {
            for (key, val) in src {
                if let Some(existing) = dest.get_mut(&key) {
                    merge(existing, val);
                } else {
                    dest.insert(key, val);
                }
            }
        }
        (dest, other) => *dest = other,
    }
}
