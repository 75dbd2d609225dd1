//! Version-aware download and local file cache for catalog data.
//!
//! Downloads the card/booster catalog from the catalog service and keeps it on
//! disk. A small `meta.json` carries the catalog version; when the remote
//! version changes the cached files are considered stale and re-downloaded.

use crate::config;
use crate::error::{BoosterError, Result};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Downloads and caches catalog files from the catalog service.
pub struct CacheManager {
    /// Directory where cached files are stored.
    pub cache_dir: PathBuf,
    /// If true, never download (use cached files only).
    pub offline: bool,
    api_base: String,
    timeout: Duration,
    client: Option<Client>,
    remote_ver: Option<String>,
}

impl CacheManager {
    /// Create a new cache manager.
    ///
    /// If `cache_dir` is `None`, uses the platform-appropriate default cache directory.
    /// Creates the cache directory if it does not exist.
    pub fn new(
        cache_dir: Option<PathBuf>,
        api_base: impl Into<String>,
        offline: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let dir = cache_dir.unwrap_or_else(config::default_cache_dir);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            cache_dir: dir,
            offline,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
            client: None,
            remote_ver: None,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Lazy HTTP client, created on first use.
    pub fn client(&mut self) -> Result<Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        self.client = Some(client.clone());
        Ok(client)
    }

    fn local_version(&self) -> Option<String> {
        let version_file = self.cache_dir.join("version.txt");
        fs::read_to_string(version_file)
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn save_version(&self, version: &str) {
        let version_file = self.cache_dir.join("version.txt");
        if let Err(e) = fs::write(&version_file, version) {
            tracing::warn!(path = %version_file.display(), error = %e, "failed to record catalog version");
        }
    }

    /// Fetch the current catalog version from the service's `meta.json`.
    ///
    /// Returns `None` when offline or when the service is unreachable.
    /// The result is memoized until [`invalidate_remote_version`](Self::invalidate_remote_version).
    pub fn remote_version(&mut self) -> Result<Option<String>> {
        if self.remote_ver.is_some() {
            return Ok(self.remote_ver.clone());
        }
        if self.offline {
            return Ok(None);
        }
        let filename = config::json_files()
            .get("meta")
            .copied()
            .ok_or_else(|| BoosterError::NotFound("Unknown JSON file: meta".to_string()))?;
        let client = self.client()?;
        let url = format!("{}/{}", self.api_base, filename);
        match client.get(&url).send() {
            Ok(resp) => {
                let resp = resp.error_for_status()?;
                let data: serde_json::Value = resp.json()?;
                let version = data
                    .get("version")
                    .or_else(|| data.get("data").and_then(|d| d.get("version")))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());
                self.remote_ver = version.clone();
                Ok(version)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "failed to fetch catalog version");
                Ok(None)
            }
        }
    }

    /// Forget the memoized remote version so the next check asks the service again.
    pub fn invalidate_remote_version(&mut self) {
        self.remote_ver = None;
    }

    /// True when nothing is cached yet or the service reports a newer version.
    /// An unreachable service counts as fresh.
    pub fn is_stale(&mut self) -> Result<bool> {
        match self.local_version() {
            None => Ok(true),
            Some(local_ver) => match self.remote_version()? {
                None => Ok(false),
                Some(remote_ver) => Ok(local_ver != remote_ver),
            },
        }
    }

    /// Download a single file into `dest` through a temp file, so an
    /// interrupted download never leaves a partial file behind.
    fn download_file(&mut self, filename: &str, dest: &Path) -> Result<()> {
        let url = format!("{}/{}", self.api_base, filename);
        tracing::info!(url = %url, "downloading catalog file");

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_dest = dest.with_extension(format!(
            "{}.tmp",
            dest.extension().and_then(|e| e.to_str()).unwrap_or("")
        ));

        let client = self.client()?;
        let result = (|| -> Result<()> {
            let resp = client.get(&url).send()?.error_for_status()?;
            let bytes = resp.bytes()?;
            fs::write(&tmp_dest, &bytes)?;
            fs::rename(&tmp_dest, dest)?;
            Ok(())
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_dest);
        }

        result
    }

    /// Ensure a JSON file is cached locally, downloading if needed.
    ///
    /// A gzipped copy (`<file>.gz`) already in the cache is accepted as well.
    ///
    /// # Arguments
    ///
    /// * `name` - Logical file name (e.g. `"catalog"`, `"meta"`).
    ///
    /// # Returns
    ///
    /// Local filesystem path to the cached file.
    pub fn ensure_json(&mut self, name: &str) -> Result<PathBuf> {
        let json_files = config::json_files();
        let filename = *json_files
            .get(name)
            .ok_or_else(|| BoosterError::NotFound(format!("Unknown JSON file: {}", name)))?;

        let local_path = self.cache_dir.join(filename);
        let gz_path = self.cache_dir.join(format!("{}.gz", filename));
        let cached = if local_path.exists() {
            Some(local_path.clone())
        } else if gz_path.exists() {
            Some(gz_path)
        } else {
            None
        };

        if self.offline {
            return cached.ok_or_else(|| {
                BoosterError::NotFound(format!(
                    "JSON file {} not cached and offline mode is enabled",
                    filename
                ))
            });
        }

        match cached {
            Some(path) if !self.is_stale()? => Ok(path),
            _ => {
                self.download_file(filename, &local_path)?;
                if let Ok(Some(version)) = self.remote_version() {
                    self.save_version(&version);
                }
                Ok(local_path)
            }
        }
    }

    /// Load and parse a JSON file (handles `.gz` transparently).
    ///
    /// A corrupt cached file is deleted so the next call downloads a fresh copy.
    pub fn load_json(&mut self, name: &str) -> Result<serde_json::Value> {
        let path = self.ensure_json(name)?;

        let parse_result = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
            let file = fs::File::open(&path)?;
            let decoder = GzDecoder::new(BufReader::new(file));
            let mut contents = String::new();
            BufReader::new(decoder).read_to_string(&mut contents)?;
            serde_json::from_str(&contents).map_err(BoosterError::from)
        } else {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents).map_err(BoosterError::from)
        };

        match parse_result {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt cache file, removing");
                let _ = fs::remove_file(&path);
                Err(BoosterError::NotFound(format!(
                    "Cache file '{}' was corrupt and has been removed. \
                     Retry to re-download. Original error: {}",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                    e
                )))
            }
        }
    }

    /// Remove all cached files and recreate the cache directory.
    pub fn clear(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Drop the HTTP client, if open.
    pub fn close(&mut self) {
        self.client = None;
    }
}
