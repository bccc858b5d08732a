//! Source derivation: which stream (or file) feeds a camera's branches, and
//! what its source element is called.

use crate::diagnostics;
use crate::resolve::artifacts::{ArtifactResolver, bench_stem};
use crate::spec::CameraSpec;
use crate::spec::camera::LEGACY_URI_KEYS;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

const FALLBACK_HOST: &str = "rtsp-streamer";
const FALLBACK_PORT: &str = "8554";
const FALLBACK_NAME: &str = "stream";

static UNSAFE_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("static regex"));

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stream { uri: String, name: String },
    File { path: PathBuf, name: String },
}

impl Source {
    pub fn name(&self) -> &str {
        match self {
            Source::Stream { name, .. } | Source::File { name, .. } => name,
        }
    }
}

/// Default streamer endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    pub host: String,
    pub port: String,
}

/// Make `raw` usable as an element name: anything outside `[A-Za-z0-9_-]`
/// becomes `_`, empty input becomes `stream`, a leading digit gets `cam_`.
pub fn sanitize_name(raw: &str) -> String {
    if raw.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    let cleaned = UNSAFE_NAME_CHARS.replace_all(raw, "_");
    match cleaned.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("cam_{}", cleaned),
        _ => cleaned.into_owned(),
    }
}

/// Stream URI for a camera, or `None` when nothing points at a stream.
///
/// Preference: the streamer path derived from `fileSrc`, then the legacy URI
/// keys, then the camera id as a path.
pub fn derive_stream_uri(camera: &CameraSpec, endpoint: &StreamEndpoint) -> Option<String> {
    if let Some(file_ref) = camera.file_ref() {
        return Some(format!(
            "rtsp://{}:{}/{}",
            endpoint.host,
            endpoint.port,
            bench_stem(file_ref, camera.width(), camera.fps())
        ));
    }

    for (key, value) in LEGACY_URI_KEYS.iter().zip(camera.legacy_uris()) {
        let cleaned = value
            .map(|v| v.trim().trim_matches('"').trim_matches('\''))
            .unwrap_or("");
        if cleaned.is_empty() {
            continue;
        }
        tracing::debug!("using legacy {} for stream uri: {}", key, cleaned);
        if cleaned.contains("://") {
            return Some(rehost_uri(cleaned, endpoint));
        }
        let path = if cleaned.starts_with('/') {
            cleaned.to_string()
        } else {
            format!("/{}", cleaned)
        };
        return Some(format!("rtsp://{}:{}{}", endpoint.host, endpoint.port, path));
    }

    camera
        .id()
        .map(|id| format!("rtsp://{}:{}/{}", endpoint.host, endpoint.port, id))
}

/// The pieces of an explicit URI that survive re-hosting.
#[derive(Debug, PartialEq, Eq)]
struct UriParts {
    scheme: String,
    host: Option<String>,
    port: Option<String>,
    path: String,
    query: Option<String>,
}

impl UriParts {
    fn from_url(parsed: &Url) -> Self {
        Self {
            scheme: parsed.scheme().to_string(),
            host: parsed.host_str().map(str::to_string),
            port: parsed.port().map(|p| p.to_string()),
            path: parsed.path().to_string(),
            query: parsed.query().map(str::to_string),
        }
    }

    /// Positional split for URIs `Url` rejects (bad port, stray characters).
    /// The port is never trusted here.
    fn split(raw: &str) -> Self {
        let (scheme, rest) = raw.split_once("://").unwrap_or(("", raw));
        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (rest, query) = match rest.split_once('?') {
            Some((before, q)) => (before, Some(q.to_string())),
            None => (rest, None),
        };
        let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
        let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
        let host = host.split_once(':').map_or(host, |(h, _)| h);
        Self {
            scheme: scheme.to_string(),
            host: Some(host.to_string()),
            port: None,
            path: path.to_string(),
            query,
        }
    }
}

/// Point an explicit URI at the configured streamer, keeping path and query.
fn rehost_uri(raw: &str, endpoint: &StreamEndpoint) -> String {
    let parts = match Url::parse(raw) {
        Ok(parsed) => UriParts::from_url(&parsed),
        Err(e) => {
            diagnostics::warn(format!(
                "stream uri '{}' does not parse ({}), re-hosting its path as written",
                raw, e
            ));
            UriParts::split(raw)
        }
    };

    let scheme = if parts.scheme.is_empty() {
        "rtsp"
    } else {
        parts.scheme.as_str()
    };
    let host = if endpoint.host.is_empty() {
        parts
            .host
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| FALLBACK_HOST.to_string())
    } else {
        endpoint.host.clone()
    };
    let port = if endpoint.port.is_empty() {
        parts.port.unwrap_or_else(|| FALLBACK_PORT.to_string())
    } else {
        endpoint.port.clone()
    };
    let query = parts
        .query
        .filter(|q| !q.is_empty())
        .map(|q| format!("?{}", q))
        .unwrap_or_default();

    format!("{}://{}:{}{}{}", scheme, host, port, parts.path, query)
}

/// Element name for a camera's source: camera id, then the URI's last path
/// segment, then its host, then the file stem, then `stream`.
pub fn derive_stream_name(camera: &CameraSpec, stream_uri: Option<&str>) -> String {
    if let Some(id) = camera.id() {
        return sanitize_name(id);
    }

    if let Some(parsed) = stream_uri.and_then(|u| Url::parse(u).ok()) {
        let basename = Path::new(parsed.path())
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty());
        if let Some(candidate) = basename {
            return sanitize_name(candidate);
        }
        if let Some(host) = parsed.host_str().filter(|h| !h.is_empty()) {
            return sanitize_name(host);
        }
    }

    if let Some(stem) = camera
        .file_ref()
        .and_then(|f| Path::new(f).file_stem())
        .and_then(|s| s.to_str())
    {
        return sanitize_name(stem);
    }

    FALLBACK_NAME.to_string()
}

/// Resolve the source feeding every branch of `camera`.
pub fn resolve_source(
    camera: &CameraSpec,
    endpoint: &StreamEndpoint,
    artifacts: &dyn ArtifactResolver,
) -> Source {
    let uri = derive_stream_uri(camera, endpoint);
    let name = derive_stream_name(camera, uri.as_deref());
    match uri {
        Some(uri) => Source::Stream { uri, name },
        None => Source::File {
            path: artifacts.video_path(
                camera.file_ref().unwrap_or(""),
                camera.width(),
                camera.fps(),
            ),
            name,
        },
    }
}
