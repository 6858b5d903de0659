// Video source descriptors and their resolution into backend load requests

use crate::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Where a video comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Bundled with the host application, looked up by the backend
    Asset,
    /// Local filesystem path
    File,
    /// Remote URL fetched over HTTP(S)
    Network,
}

/// Caller-supplied source descriptor.
///
/// Immutable once built; a new load supersedes it instead of mutating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSource {
    #[serde(rename = "type")]
    source_type: SourceType,
    path: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

impl VideoSource {
    pub fn new(source_type: SourceType, path: impl Into<String>) -> Self {
        Self {
            source_type,
            path: path.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn asset(path: impl Into<String>) -> Self {
        Self::new(SourceType::Asset, path)
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(SourceType::File, path)
    }

    pub fn network(url: impl Into<String>) -> Self {
        Self::new(SourceType::Network, url)
    }

    /// Adds a request header. Only meaningful for network sources.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

/// Backend-ready load instructions produced by [`resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    /// Fetch `url`, sending `headers` with every request
    Network {
        url: Url,
        headers: BTreeMap<String, String>,
    },
    /// Open a local file
    File { path: PathBuf },
    /// Open a bundled asset by key
    Asset { key: String },
}

impl LoadRequest {
    /// Human-readable location, used for logging and catalog lookups.
    pub fn location(&self) -> String {
        match self {
            LoadRequest::Network { url, .. } => url.to_string(),
            LoadRequest::File { path } => path.display().to_string(),
            LoadRequest::Asset { key } => key.clone(),
        }
    }
}

/// Validate a descriptor and normalize it for the backend.
pub fn resolve(source: &VideoSource) -> Result<LoadRequest> {
    let path = source.path.trim();
    if path.is_empty() {
        return Err(PlayerError::invalid_argument("Video source path is empty"));
    }
    if path.contains('\0') {
        return Err(PlayerError::invalid_argument("Video source path contains NUL"));
    }
    if source.source_type != SourceType::Network && !source.headers.is_empty() {
        return Err(PlayerError::invalid_argument(format!(
            "Headers are only supported for network sources, got {:?}",
            source.source_type
        )));
    }

    match source.source_type {
        SourceType::Network => resolve_network(path, &source.headers),
        SourceType::File => resolve_file(path),
        SourceType::Asset => resolve_asset(path),
    }
}

fn resolve_network(path: &str, headers: &BTreeMap<String, String>) -> Result<LoadRequest> {
    let url = Url::parse(path)
        .map_err(|e| PlayerError::invalid_argument(format!("Invalid URL {:?}: {}", path, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(PlayerError::invalid_argument(format!(
                "Unsupported URL scheme for network source: {}",
                other
            )))
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(PlayerError::invalid_argument(format!("URL has no host: {}", path)));
    }

    for (name, value) in headers {
        if !is_valid_header_name(name) {
            return Err(PlayerError::invalid_argument(format!("Invalid header name {:?}", name)));
        }
        if value.contains(['\r', '\n', '\0']) {
            return Err(PlayerError::invalid_argument(format!(
                "Invalid value for header {:?}",
                name
            )));
        }
    }

    Ok(LoadRequest::Network {
        url,
        headers: headers.clone(),
    })
}

fn resolve_file(path: &str) -> Result<LoadRequest> {
    if path.starts_with("file:") {
        let url = Url::parse(path)
            .map_err(|e| PlayerError::invalid_argument(format!("Invalid file URL {:?}: {}", path, e)))?;
        let file_path = url
            .to_file_path()
            .map_err(|_| PlayerError::invalid_argument(format!("Not a local file URL: {}", path)))?;
        return Ok(LoadRequest::File { path: file_path });
    }

    let file_path = Path::new(path);
    if !file_path.is_absolute() {
        return Err(PlayerError::invalid_argument(format!(
            "File source must be an absolute path or file URL: {}",
            path
        )));
    }
    Ok(LoadRequest::File {
        path: file_path.to_path_buf(),
    })
}

fn resolve_asset(path: &str) -> Result<LoadRequest> {
    if path.contains("://") {
        return Err(PlayerError::invalid_argument(format!(
            "Asset source must be a relative key, got URL {}",
            path
        )));
    }
    let key = Path::new(path);
    if key.is_absolute() || path.starts_with('/') {
        return Err(PlayerError::invalid_argument(format!(
            "Asset source must be a relative key: {}",
            path
        )));
    }
    if key.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(PlayerError::invalid_argument(format!(
            "Asset key may not leave the asset root: {}",
            path
        )));
    }
    Ok(LoadRequest::Asset {
        key: path.to_string(),
    })
}

// RFC 7230 token characters
fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}
