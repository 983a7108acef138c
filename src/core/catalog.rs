use crate::core::validate::check_tags;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Catalog {path:?} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid catalog entry '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },

    #[error("Failed to write catalog {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
#[error("{field} '{value}' is not one of [\"\", {allowed}]")]
pub struct UnknownValue {
    field: &'static str,
    value: String,
    allowed: String,
}

/// Licenses an entry may carry (a subset of the SPDX identifiers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum License {
    Cc0,
}

impl License {
    pub const ALL: [License; 1] = [License::Cc0];

    pub fn as_str(&self) -> &'static str {
        match self {
            License::Cc0 => "CC0-1.0",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Dutch,
    English,
    French,
    German,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Dutch,
        Language::English,
        Language::French,
        Language::German,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Dutch => "dutch",
            Language::English => "english",
            Language::French => "french",
            Language::German => "german",
        }
    }
}

macro_rules! string_enum {
    ($ty:ty, $field:literal) => {
        impl FromStr for $ty {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| UnknownValue {
                        field: $field,
                        value: s.to_string(),
                        allowed: <$ty>::ALL
                            .iter()
                            .map(|v| format!("\"{}\"", v.as_str()))
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

string_enum!(License, "license");
string_enum!(Language, "language");

/// One logical image: every file sharing `base_name`, one per extension.
///
/// Fields are declared in persisted key order. Keys this tool does not know
/// about are kept in `extra` so hand edits survive a rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub author: Option<String>,

    #[serde(rename = "exts")]
    pub extensions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub language: Option<Language>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub license: Option<License>,

    pub tags: String,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CatalogEntry {
    pub fn new(extension: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            author: None,
            extensions: vec![extension.into()],
            language: None,
            license: None,
            tags: tags.into(),
            title: None,
            extra: BTreeMap::new(),
        }
    }

    fn validate(&self, name: &str) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidEntry {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("empty base name".to_string()));
        }
        if self.extensions.is_empty() {
            return Err(invalid("exts: no extensions listed".to_string()));
        }
        for (i, ext) in self.extensions.iter().enumerate() {
            if ext.is_empty() || ext.contains('.') {
                return Err(invalid(format!("exts: bad extension '{ext}'")));
            }
            if self.extensions[..i].contains(ext) {
                return Err(invalid(format!("exts: '{ext}' listed twice")));
            }
        }
        check_tags(&self.tags).map_err(|reason| invalid(format!("tags: {reason}")))
    }
}

/// Treats a missing key and an empty string alike.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

/// The whole catalog, keyed by base name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate the catalog at `path`. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::parse(&raw, path)?;
        tracing::debug!(entries = catalog.len(), "loaded catalog from {}", path.display());
        Ok(catalog)
    }

    /// Parse catalog JSON read from `path`. Syntax errors are reported
    /// against the file; content errors against the offending entry.
    pub fn parse(raw: &[u8], path: &Path) -> Result<Self, CatalogError> {
        let objects: BTreeMap<String, serde_json::Value> =
            serde_json::from_slice(raw).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut entries = BTreeMap::new();
        for (name, object) in objects {
            match CatalogEntry::deserialize(object) {
                Ok(entry) => {
                    entries.insert(name, entry);
                }
                Err(err) => {
                    return Err(CatalogError::InvalidEntry {
                        name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let catalog = Catalog { entries };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        self.entries
            .iter()
            .try_for_each(|(name, entry)| entry.validate(name))
    }

    /// Normalized form: keys sorted at every level, two-space indent,
    /// trailing newline.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CatalogError> {
        // Going through `Value` sorts flattened extra keys along with the rest.
        let value = serde_json::to_value(self)?;
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"  "));
        value.serialize(&mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Replace the file at `path` in one rename, so readers never observe a
    /// half-written catalog.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let bytes = self.to_json_bytes()?;
        let write_err = |source| CatalogError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(tmp.path(), metadata.permissions()).map_err(write_err)?;
        }
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        tracing::debug!(entries = self.len(), "wrote catalog to {}", path.display());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, base_name: &str) -> bool {
        self.entries.contains_key(base_name)
    }

    pub fn get(&self, base_name: &str) -> Option<&CatalogEntry> {
        self.entries.get(base_name)
    }

    pub fn get_mut(&mut self, base_name: &str) -> Option<&mut CatalogEntry> {
        self.entries.get_mut(base_name)
    }

    pub fn insert(&mut self, base_name: impl Into<String>, entry: CatalogEntry) {
        self.entries.insert(base_name.into(), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// First entry (in key order) whose key is `base_name` followed by a `.`
    /// and anything else, e.g. `photo.edit` for `photo`.
    pub fn find_variant(&self, base_name: &str) -> Option<(&str, &CatalogEntry)> {
        let prefix = format!("{base_name}.");
        self.entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .next()
            .map(|(k, v)| (k.as_str(), v))
    }
}
