//! Configuration types for lookup filters and their map sources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default map refresh interval in seconds.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300; // 5 minutes

/// Default key under which multi-field results are nested.
pub const DEFAULT_RESULT_KEY: &str = "lookup_result";

/// Default destination field for single-field lookups.
pub const DEFAULT_DESTINATION: &str = "mapping";

/// Default timeout for web source requests in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration for one lookup filter instance.
///
/// When deserialized without a `placement`, `override: true` selects
/// [`Placement::OverwriteSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawLookupConfig")]
pub struct LookupConfig {
    /// Event fields whose values are looked up in the map.
    ///
    /// If a field holds an array, only its first element is used.
    pub fields: Vec<String>,

    /// Where lookup results are written.
    #[serde(default)]
    pub placement: Placement,

    /// Whether existing fields may be overwritten. Meaningful for the
    /// destination and overwrite-source placements.
    #[serde(default, rename = "override")]
    pub override_existing: bool,

    /// Where the map is fetched from.
    pub source: SourceConfig,

    /// Declared map format; inferred from the source location when unset.
    #[serde(default)]
    pub format: Option<MapFormat>,

    /// How often the map is reloaded, in seconds.
    #[serde(default = "default_refresh_interval", rename = "refresh_interval")]
    pub refresh_interval_secs: u64,

    /// How a reloaded map is combined with the live one.
    #[serde(default)]
    pub refresh_mode: RefreshMode,

    /// Per-field fallback templates used when a lookup misses.
    #[serde(default)]
    pub default_values: BTreeMap<String, String>,

    /// Fallback template for fields without a per-field default.
    #[serde(default)]
    pub fallback: Option<String>,

    /// Tags added to events on a successful lookup.
    #[serde(default)]
    pub add_tag: Vec<String>,
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

/// On-the-wire form of [`LookupConfig`], before the placement is resolved.
#[derive(Deserialize)]
struct RawLookupConfig {
    fields: Vec<String>,
    #[serde(default)]
    placement: Option<Placement>,
    #[serde(default, rename = "override")]
    override_existing: bool,
    source: SourceConfig,
    #[serde(default)]
    format: Option<MapFormat>,
    #[serde(default = "default_refresh_interval", rename = "refresh_interval")]
    refresh_interval_secs: u64,
    #[serde(default)]
    refresh_mode: RefreshMode,
    #[serde(default)]
    default_values: BTreeMap<String, String>,
    #[serde(default)]
    fallback: Option<String>,
    #[serde(default)]
    add_tag: Vec<String>,
}

impl From<RawLookupConfig> for LookupConfig {
    fn from(raw: RawLookupConfig) -> Self {
        let placement = match raw.placement {
            Some(placement) => placement,
            None if raw.override_existing => Placement::OverwriteSource,
            None => Placement::default(),
        };

        Self {
            fields: raw.fields,
            placement,
            override_existing: raw.override_existing,
            source: raw.source,
            format: raw.format,
            refresh_interval_secs: raw.refresh_interval_secs,
            refresh_mode: raw.refresh_mode,
            default_values: raw.default_values,
            fallback: raw.fallback,
            add_tag: raw.add_tag,
        }
    }
}

impl LookupConfig {
    /// Creates a config with defaults for everything but fields and source.
    pub fn new(fields: Vec<String>, source: SourceConfig) -> Self {
        Self {
            fields,
            placement: Placement::default(),
            override_existing: false,
            source,
            format: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            refresh_mode: RefreshMode::default(),
            default_values: BTreeMap::new(),
            fallback: None,
            add_tag: Vec::new(),
        }
    }

    /// Creates a single-field config writing into `destination`.
    pub fn single(
        field: impl Into<String>,
        destination: impl Into<String>,
        source: SourceConfig,
    ) -> Self {
        Self::new(vec![field.into()], source).with_placement(Placement::Destination {
            destination: destination.into(),
        })
    }

    /// Sets the placement policy.
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Sets the override flag.
    pub fn with_override(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    /// Declares the map format explicitly.
    pub fn with_format(mut self, format: MapFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets the refresh interval in seconds.
    pub fn with_refresh_interval(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }

    /// Sets the refresh mode.
    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    /// Adds a per-field fallback template.
    pub fn with_default_value(
        mut self,
        field: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.default_values.insert(field.into(), template.into());
        self
    }

    /// Sets the global fallback template.
    pub fn with_fallback(mut self, template: impl Into<String>) -> Self {
        self.fallback = Some(template.into());
        self
    }

    /// Adds a tag applied on success.
    pub fn with_add_tag(mut self, tag: impl Into<String>) -> Self {
        self.add_tag.push(tag.into());
        self
    }

    /// Returns the declared format, or the one inferred from the source location.
    pub fn map_format(&self) -> MapFormat {
        self.format
            .unwrap_or_else(|| MapFormat::infer(self.source.location()))
    }

    /// Returns the refresh interval.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Returns the fallback template for a field, per-field first.
    pub fn fallback_for(&self, field: &str) -> Option<&str> {
        self.default_values
            .get(field)
            .or(self.fallback.as_ref())
            .map(String::as_str)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err("fields must contain at least one field".to_string());
        }
        if self.fields.iter().any(|f| f.is_empty()) {
            return Err("field names must not be empty".to_string());
        }
        match &self.placement {
            Placement::Destination { destination } => {
                if self.fields.len() != 1 {
                    return Err(format!(
                        "destination placement takes exactly one field, got {}",
                        self.fields.len()
                    ));
                }
                if destination.is_empty() {
                    return Err("destination must not be empty".to_string());
                }
            }
            Placement::ResultField { result_key } => {
                if result_key.is_empty() {
                    return Err("result_key must not be empty".to_string());
                }
                if self.override_existing {
                    return Err(
                        "override has no effect with result_field placement; \
                         use overwrite_source to write results into the event"
                            .to_string(),
                    );
                }
            }
            Placement::OverwriteSource => {}
        }
        if self.refresh_interval_secs == 0 {
            return Err("refresh_interval must be at least 1 second".to_string());
        }
        self.source.validate()
    }
}

/// Where lookup results are written relative to the source field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Placement {
    /// Multi-field: replace each source field's value in place.
    OverwriteSource,

    /// Multi-field: nest results by field name under a result key.
    ResultField {
        /// Result object key
        #[serde(default = "default_result_key")]
        result_key: String,
    },

    /// Single-field: write the result to one destination field.
    Destination {
        /// Destination field (may equal the source for in-place substitution)
        #[serde(default = "default_destination")]
        destination: String,
    },
}

impl Default for Placement {
    fn default() -> Self {
        Self::ResultField {
            result_key: default_result_key(),
        }
    }
}

fn default_result_key() -> String {
    DEFAULT_RESULT_KEY.to_string()
}

fn default_destination() -> String {
    DEFAULT_DESTINATION.to_string()
}

/// Map source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Local file
    File(FileSourceConfig),

    /// HTTP endpoint
    Webservice(WebSourceConfig),
}

impl SourceConfig {
    /// Creates a file source.
    pub fn file(path: impl Into<String>) -> Self {
        Self::File(FileSourceConfig { path: path.into() })
    }

    /// Creates a web source with a GET request and default settings.
    pub fn webservice(url: impl Into<String>) -> Self {
        Self::Webservice(WebSourceConfig::new(url))
    }

    /// Returns the path or URL of the source.
    pub fn location(&self) -> &str {
        match self {
            Self::File(file) => &file.path,
            Self::Webservice(web) => &web.url,
        }
    }

    /// Validate the source configuration.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::File(file) => {
                if file.path.is_empty() {
                    return Err("file source requires a path".to_string());
                }
            }
            Self::Webservice(web) => {
                if !(web.url.starts_with("http://") || web.url.starts_with("https://")) {
                    return Err(format!("webservice url must be http(s): {}", web.url));
                }
                if web.timeout_secs == 0 {
                    return Err("timeout_secs must be at least 1".to_string());
                }
            }
        }
        Ok(())
    }
}

/// File source settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSourceConfig {
    /// Path of the map file
    pub path: String,
}

/// Web source settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSourceConfig {
    /// URL of the map endpoint
    pub url: String,

    /// HTTP method
    #[serde(default)]
    pub method: HttpMethod,

    /// Request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request parameters (query string for GET, form body for POST)
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// Directory for the on-disk copy of the last good download
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl WebSourceConfig {
    /// Creates a GET web source with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::default(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            cache_dir: None,
        }
    }

    /// Sets the HTTP method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a request parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Enables the on-disk cache in `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }
}

/// HTTP method used by web sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// GET with params in the query string
    #[default]
    Get,

    /// POST with params as a form body
    Post,
}

/// How a reloaded map is combined with the live one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Union into the live table; keys missing from the reload are kept.
    #[default]
    Merge,

    /// Swap the reloaded table in wholesale.
    Replace,
}

/// Encoding of map data.
///
/// Unknown format names fall back to YAML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MapFormat {
    /// YAML mapping document
    #[default]
    Yaml,

    /// JSON object
    Json,

    /// Two-column CSV without a header row
    Csv,
}

impl MapFormat {
    /// Infers the format from a path or URL suffix.
    ///
    /// Query strings and fragments are ignored. `.json` and `.csv` select
    /// their formats, anything else is YAML.
    pub fn infer(location: &str) -> Self {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or(location)
            .to_ascii_lowercase();

        if path.ends_with(".json") {
            Self::Json
        } else if path.ends_with(".csv") {
            Self::Csv
        } else {
            Self::Yaml
        }
    }

    /// File extension used for cached copies.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yml",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Canonical name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl From<&str> for MapFormat {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "csv" => Self::Csv,
            _ => Self::Yaml,
        }
    }
}

impl From<String> for MapFormat {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<MapFormat> for String {
    fn from(format: MapFormat) -> Self {
        format.as_str().to_string()
    }
}

impl std::fmt::Display for MapFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
