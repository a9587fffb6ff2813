use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable carrying the store collection URL
pub const STORE_URL_ENV: &str = "OATRACK_STORE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub store: StoreConfig,
  /// Custom title for header (defaults to the store host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub records: RecordsConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub submit: SubmitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Endpoint returning the whole record collection as a JSON array
  pub collection_url: String,
  /// Endpoint returning one record; when unset the collection is scanned instead
  pub record_url: Option<String>,
  /// Endpoint accepting form-encoded writes (defaults to collection_url)
  pub submit_url: Option<String>,
  /// Query parameter carrying the identifier on record reads
  #[serde(default = "default_record_param")]
  pub record_param: String,
  #[serde(default = "default_timeout_secs")]
  pub fetch_timeout_secs: u64,
  #[serde(default = "default_timeout_secs")]
  pub submit_timeout_secs: u64,
}

fn default_record_param() -> String {
  "oaNumber".to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

impl StoreConfig {
  pub fn submit_url(&self) -> &str {
    self.submit_url.as_deref().unwrap_or(&self.collection_url)
  }

  pub fn fetch_timeout(&self) -> Duration {
    Duration::from_secs(self.fetch_timeout_secs)
  }

  pub fn submit_timeout(&self) -> Duration {
    Duration::from_secs(self.submit_timeout_secs)
  }
}

/// Field layout of the records kept in the sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
  pub identifier_field: String,
  pub display_field: String,
  pub read_only_fields: Vec<String>,
  /// Stage names; each expands to a "<STAGE> PLAN" / "<STAGE> ACTUAL" pair
  pub field_groups: Vec<String>,
  /// Trailing fields of a blank record, after the field groups
  pub extra_fields: Vec<String>,
}

impl Default for RecordsConfig {
  fn default() -> Self {
    let strings = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
    Self {
      identifier_field: "OA NUMBER".to_string(),
      display_field: "CUSTOMER NAME".to_string(),
      read_only_fields: strings(&[
        "CUSTOMER NAME",
        "OA NUMBER",
        "BRANCH",
        "TPH",
        "QTY",
        "PRES",
        "BURNER",
        "BLR NO",
      ]),
      field_groups: strings(&[
        "HYDRO",
        "CASING",
        "WELDING",
        "SHEETING",
        "REFRACTORY",
        "MOUNTING",
        "FINAL PAINTING",
        "READINESS",
      ]),
      extra_fields: strings(&["DISP.DT", "REMARK"]),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Maximum age of a cache entry that may be shown before the network answers
  pub freshness_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      freshness_secs: 300,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
  /// How long the confirmation stays visible before returning to the list
  pub redirect_delay_ms: u64,
}

impl Default for SubmitConfig {
  fn default() -> Self {
    Self {
      redirect_delay_ms: 1500,
    }
  }
}

impl SubmitConfig {
  pub fn redirect_delay(&self) -> Duration {
    Duration::from_millis(self.redirect_delay_ms)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./oatrack.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/oatrack/config.yaml
  ///
  /// The collection URL is taken from `url_override` (`--url`), then
  /// `OATRACK_STORE_URL`, then the file. Either URL alone is enough to run
  /// when no file is found.
  pub fn load(explicit_path: Option<&Path>, url_override: Option<&str>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let env_url = std::env::var(STORE_URL_ENV).ok();
    Self::from_sources(path.as_deref(), url_override, env_url.as_deref())
  }

  /// Merge the config file (if any) with the flag and env store URLs.
  fn from_sources(
    path: Option<&Path>,
    url_override: Option<&str>,
    env_url: Option<&str>,
  ) -> Result<Self> {
    let url = url_override
      .or(env_url)
      .filter(|url| !url.trim().is_empty());

    let mut config = match (path, url) {
      (Some(p), _) => Self::load_from_path(p)?,
      (None, Some(url)) => return Ok(Self::for_store_url(url)),
      (None, None) => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/oatrack/config.yaml,\n\
                 or pass --url / set {}. See config.example.yaml for the format.",
          STORE_URL_ENV
        ))
      }
    };

    if let Some(url) = url {
      config.store.collection_url = url.to_string();
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("oatrack.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("oatrack").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.store.collection_url.trim().is_empty() {
      return Err(eyre!("store.collection_url must not be empty"));
    }
    if freshness_from_secs(config.cache.freshness_secs).is_none() {
      return Err(eyre!(
        "cache.freshness_secs is out of range: {}",
        config.cache.freshness_secs
      ));
    }
    Ok(config)
  }

  /// Defaults everywhere, reading and writing `url`; used when a store URL
  /// is given without a config file
  pub fn for_store_url(url: &str) -> Self {
    Self {
      store: StoreConfig {
        collection_url: url.to_string(),
        record_url: None,
        submit_url: None,
        record_param: default_record_param(),
        fetch_timeout_secs: default_timeout_secs(),
        submit_timeout_secs: default_timeout_secs(),
      },
      title: None,
      records: RecordsConfig::default(),
      cache: CacheConfig::default(),
      submit: SubmitConfig::default(),
    }
  }

  pub fn freshness_window(&self) -> chrono::Duration {
    freshness_from_secs(self.cache.freshness_secs).unwrap_or(chrono::TimeDelta::MAX)
  }
}

fn freshness_from_secs(secs: u64) -> Option<chrono::Duration> {
  i64::try_from(secs)
    .ok()
    .and_then(chrono::Duration::try_seconds)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("store:\n  collection_url: https://example.com/exec\n").unwrap();

    assert_eq!(config.store.record_param, "oaNumber");
    assert_eq!(config.store.submit_url(), "https://example.com/exec");
    assert_eq!(config.store.fetch_timeout(), Duration::from_secs(10));
    assert_eq!(config.records.identifier_field, "OA NUMBER");
    assert_eq!(config.records.display_field, "CUSTOMER NAME");
    assert_eq!(config.records.field_groups.len(), 8);
    assert_eq!(config.cache.freshness_secs, 300);
    assert_eq!(config.submit.redirect_delay(), Duration::from_millis(1500));
  }

  #[test]
  fn test_overrides() {
    let yaml = r#"
title: Plant 2
store:
  collection_url: https://example.com/read
  record_url: https://example.com/one
  submit_url: https://example.com/write
  record_param: name
  fetch_timeout_secs: 8
records:
  identifier_field: CUSTOMER NAME
  field_groups: [HYDRO]
cache:
  freshness_secs: 600
submit:
  redirect_delay_ms: 2000
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.title.as_deref(), Some("Plant 2"));
    assert_eq!(config.store.submit_url(), "https://example.com/write");
    assert_eq!(config.store.record_param, "name");
    assert_eq!(config.store.fetch_timeout(), Duration::from_secs(8));
    assert_eq!(config.store.submit_timeout(), Duration::from_secs(10));
    assert_eq!(config.records.identifier_field, "CUSTOMER NAME");
    // Unset fields inside a present section still default
    assert_eq!(config.records.display_field, "CUSTOMER NAME");
    assert_eq!(config.records.field_groups, vec!["HYDRO".to_string()]);
    assert_eq!(config.freshness_window(), chrono::Duration::minutes(10));
    assert_eq!(config.submit.redirect_delay_ms, 2000);
  }

  #[test]
  fn test_for_store_url_matches_minimal_file() {
    let from_url = Config::for_store_url("https://example.com/exec");
    let from_file = Config::from_yaml("store:\n  collection_url: https://example.com/exec\n").unwrap();

    assert_eq!(from_url.store.submit_url(), from_file.store.submit_url());
    assert_eq!(from_url.store.record_param, from_file.store.record_param);
    assert_eq!(from_url.records.field_groups, from_file.records.field_groups);
    assert_eq!(from_url.freshness_window(), from_file.freshness_window());
  }

  #[test]
  fn test_empty_collection_url_rejected() {
    assert!(Config::from_yaml("store:\n  collection_url: \"  \"\n").is_err());
  }

  #[test]
  fn test_missing_store_rejected() {
    assert!(Config::from_yaml("title: x\n").is_err());
  }

  #[test]
  fn test_freshness_out_of_range_rejected() {
    for secs in ["10000000000000000", "18446744073709551615"] {
      let yaml = format!(
        "store:\n  collection_url: https://example.com/exec\ncache:\n  freshness_secs: {}\n",
        secs
      );
      let err = Config::from_yaml(&yaml).unwrap_err();
      assert!(err.to_string().contains("freshness_secs"));
    }
  }

  #[test]
  fn test_load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oatrack.yaml");
    std::fs::write(&path, "store:\n  collection_url: https://example.com/exec\n").unwrap();

    let config = Config::load(Some(&path), None).unwrap();
    assert!(config.store.collection_url.starts_with("https://"));

    // A store URL does not stand in for an explicit file that is missing
    let missing = dir.path().join("missing.yaml");
    assert!(Config::load(Some(&missing), None).is_err());
    assert!(Config::load(Some(&missing), Some("https://flag.example/exec")).is_err());
  }

  #[test]
  fn test_store_url_without_file() {
    let from_env = Config::from_sources(None, None, Some("https://env.example/exec")).unwrap();
    assert_eq!(from_env.store.collection_url, "https://env.example/exec");
    assert_eq!(from_env.store.record_param, "oaNumber");

    let from_flag = Config::from_sources(
      None,
      Some("https://flag.example/exec"),
      Some("https://env.example/exec"),
    )
    .unwrap();
    assert_eq!(from_flag.store.collection_url, "https://flag.example/exec");

    assert!(Config::from_sources(None, None, None).is_err());
    assert!(Config::from_sources(None, None, Some("  ")).is_err());
  }

  #[test]
  fn test_store_url_precedence_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oatrack.yaml");
    std::fs::write(
      &path,
      "title: Plant 2\nstore:\n  collection_url: https://file.example/exec\n",
    )
    .unwrap();

    let from_file = Config::from_sources(Some(&path), None, None).unwrap();
    assert_eq!(from_file.store.collection_url, "https://file.example/exec");

    let from_env = Config::from_sources(Some(&path), None, Some("https://env.example/exec")).unwrap();
    assert_eq!(from_env.store.collection_url, "https://env.example/exec");
    assert_eq!(from_env.title.as_deref(), Some("Plant 2"));

    let from_flag = Config::from_sources(
      Some(&path),
      Some("https://flag.example/exec"),
      Some("https://env.example/exec"),
    )
    .unwrap();
    assert_eq!(from_flag.store.collection_url, "https://flag.example/exec");
  }
}
