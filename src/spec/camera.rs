//! Camera document (camera_to_workload.json).
//!
//! JSON shape:
//! {
//!   "lane_config": {
//!     "cameras": [
//!       {
//!         "camera_id": "cam1",
//!         "workloads": ["object_detection", "age_classification"],  // or a single string
//!         "fileSrc": "people.mp4|extra",                           // only the part before '|'
//!         "width": 1920, "fps": 15,                                 // numbers or strings
//!         "region_of_interest": { "x": 0, "y": 0, "x2": 960, "y2": 540 }
//!       }
//!     ]
//!   }
//! }

use serde::Deserialize;
use serde::de::Deserializer;
use serde_json::{Number, Value};

pub const DEFAULT_WIDTH: &str = "1920";
pub const DEFAULT_FPS: &str = "15";

/// Legacy keys checked, in order, for an explicit stream URI.
pub const LEGACY_URI_KEYS: [&str; 4] = ["streamUri", "stream_uri", "rtspUri", "rtsp_url"];

#[derive(Debug, Clone, Deserialize)]
pub struct CameraDocument {
    pub lane_config: LaneConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LaneConfig {
    pub cameras: Vec<CameraSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraSpec {
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub camera_id: Option<String>,

    #[serde(default)]
    pub workloads: WorkloadRefs,

    #[serde(default, deserialize_with = "deserialize_region")]
    pub region_of_interest: Option<RegionOfInterest>,

    #[serde(default, rename = "fileSrc", deserialize_with = "deserialize_scalar")]
    pub file_src: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub width: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub fps: Option<String>,

    #[serde(default, rename = "streamUri", deserialize_with = "deserialize_scalar")]
    pub stream_uri_camel: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub stream_uri: Option<String>,

    #[serde(default, rename = "rtspUri", deserialize_with = "deserialize_scalar")]
    pub rtsp_uri: Option<String>,

    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub rtsp_url: Option<String>,
}

/// Workloads may be given as one string or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WorkloadRefs {
    One(String),
    Many(Vec<String>),
}

impl Default for WorkloadRefs {
    fn default() -> Self {
        WorkloadRefs::Many(Vec::new())
    }
}

impl WorkloadRefs {
    pub fn as_slice(&self) -> &[String] {
        match self {
            WorkloadRefs::One(w) => std::slice::from_ref(w),
            WorkloadRefs::Many(ws) => ws,
        }
    }

    /// Trimmed, lower-cased names in document order.
    pub fn normalized(&self) -> Vec<String> {
        self.as_slice()
            .iter()
            .map(|w| w.trim().to_lowercase())
            .collect()
    }
}

/// A rectangle restricting inference to part of the frame.
///
/// Coordinates keep their JSON spelling (`0` vs `0.0`) so they are echoed
/// verbatim and compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegionOfInterest {
    #[serde(default = "zero")]
    pub x: Number,
    #[serde(default = "zero")]
    pub y: Number,
    #[serde(default = "one")]
    pub x2: Number,
    #[serde(default = "one")]
    pub y2: Number,
}

impl RegionOfInterest {
    /// `x,y,x2,y2` as understood by `gvaattachroi roi=`.
    pub fn to_roi_arg(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.x2, self.y2)
    }
}

fn zero() -> Number {
    Number::from(0)
}

fn one() -> Number {
    Number::from(1)
}

impl CameraSpec {
    pub fn id(&self) -> Option<&str> {
        self.camera_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The raw file reference: text before the first `|`, trimmed.
    pub fn file_ref(&self) -> Option<&str> {
        self.file_src
            .as_deref()
            .and_then(|s| s.split('|').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn width(&self) -> &str {
        self.width.as_deref().unwrap_or(DEFAULT_WIDTH)
    }

    pub fn fps(&self) -> &str {
        self.fps.as_deref().unwrap_or(DEFAULT_FPS)
    }

    /// Legacy URI values in lookup order, as written.
    pub fn legacy_uris(&self) -> [Option<&str>; 4] {
        [
            self.stream_uri_camel.as_deref(),
            self.stream_uri.as_deref(),
            self.rtsp_uri.as_deref(),
            self.rtsp_url.as_deref(),
        ]
    }
}

/// Accept strings, numbers and booleans for free-form scalar fields.
fn deserialize_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a string or number, found {}",
                other
            )));
        }
    })
}

/// An empty object (or `null`) means no rectangle at all.
pub(crate) fn deserialize_region<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<RegionOfInterest>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => RegionOfInterest::deserialize(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
