//! Environment-scoped settings.
//!
//! Every knob has a default; nothing here can fail. Values that need parsing
//! (batch sizes) are kept raw and parsed where they are used so a bad value
//! degrades into a warning for the affected stage only.

use std::path::PathBuf;

pub const DEFAULT_SERVER_DIR: &str = "/home/pipeline-server";
pub const DEFAULT_DEVICE_PROFILE_DIR: &str = "/res";
pub const DEFAULT_GST_DEBUG: &str = "GST_TRACER:7,gvafpscounter:4";
pub const DEFAULT_GST_TRACERS: &str = "latency_tracer(flags=pipeline)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_dir: PathBuf,
    pub config_dir: PathBuf,
    pub workload_document: String,
    pub camera_document: String,
    pub device_profile_dir: PathBuf,

    pub rtsp_host: String,
    pub rtsp_port: String,
    pub rtsp_latency: String,

    /// Raw overrides; they win over the device profile's values.
    pub batch_size_detect: Option<String>,
    pub batch_size_classify: Option<String>,

    pub render: bool,
    pub timestamp: String,
    pub gst_debug: String,
    pub gst_tracers: String,
    pub exclude_workload: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let server_dir = PathBuf::from(get("PIPELINE_SERVER_DIR", DEFAULT_SERVER_DIR));
        let config_dir = lookup("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| server_dir.join("configs"));

        Self {
            config_dir,
            workload_document: get("WORKLOAD_DIST", "workload_to_pipeline.json"),
            camera_document: get("CAMERA_STREAM", "camera_to_workload.json"),
            device_profile_dir: PathBuf::from(get(
                "DEVICE_PROFILE_DIR",
                DEFAULT_DEVICE_PROFILE_DIR,
            )),
            rtsp_host: get("RTSP_STREAM_HOST", "rtsp-streamer"),
            rtsp_port: get("RTSP_STREAM_PORT", "8554"),
            rtsp_latency: get("RTSP_LATENCY", "200"),
            batch_size_detect: lookup("BATCH_SIZE_DETECT"),
            batch_size_classify: lookup("BATCH_SIZE_CLASSIFY"),
            render: lookup("RENDER_MODE").is_some_and(|v| v.trim() == "1"),
            timestamp: lookup("TIMESTAMP")
                .unwrap_or_else(|| chrono::Utc::now().format("%Y%m%d%H%M%S").to_string()),
            gst_debug: get("GST_DEBUG", DEFAULT_GST_DEBUG),
            gst_tracers: get("GST_TRACERS", DEFAULT_GST_TRACERS),
            exclude_workload: get("EXCLUDE_WORKLOAD", "lp_vlm"),
            server_dir,
        }
    }

    pub fn camera_document_path(&self) -> PathBuf {
        self.config_dir.join(&self.camera_document)
    }

    pub fn workload_document_path(&self) -> PathBuf {
        self.config_dir.join(&self.workload_document)
    }

    pub fn models_dir(&self) -> PathBuf {
        self.server_dir.join("models")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.server_dir.join("sample-media")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.server_dir.join("results")
    }

    /// Where `gvapython` modules live.
    pub fn scripts_dir(&self) -> PathBuf {
        self.server_dir.join("src")
    }
}
