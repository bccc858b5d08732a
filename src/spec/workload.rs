//! Workload document (workload_to_pipeline.json).
//!
//! JSON shape:
//! {
//!   "workload_pipeline_map": {
//!     "object_detection": [
//!       { "type": "gvadetect", "model": "yolov8s", "device": "GPU", "precision": "FP16" }
//!     ],
//!     "custom_transform": [
//!       { "type": "gvapython", "module": "post.py", "function": "process" }
//!     ]
//!   }
//! }

use crate::spec::RegionOfInterest;
use crate::spec::camera::deserialize_region;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadDocument {
    pub workload_pipeline_map: BTreeMap<String, Vec<StepSpec>>,
}

impl WorkloadDocument {
    /// Workload map keyed by lower-cased name.
    pub fn into_map(self) -> WorkloadMap {
        self.workload_pipeline_map
            .into_iter()
            .map(|(name, steps)| (name.to_lowercase(), steps))
            .collect()
    }
}

pub type WorkloadMap = BTreeMap<String, Vec<StepSpec>>;

/// One processing stage as written in the workload document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StepSpec {
    #[serde(rename = "type")]
    pub kind: StepKind,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub device: Option<String>,

    #[serde(default)]
    pub precision: Option<String>,

    #[serde(default)]
    pub module: Option<String>,

    #[serde(default)]
    pub function: Option<String>,

    #[serde(default, deserialize_with = "deserialize_region")]
    pub region_of_interest: Option<RegionOfInterest>,
}

impl StepSpec {
    pub fn new(kind: StepKind) -> Self {
        Self {
            kind,
            model: None,
            device: None,
            precision: None,
            module: None,
            function: None,
            region_of_interest: None,
        }
    }
}

/// Stage kinds. Anything not recognised is kept verbatim in `Unknown` so
/// newer documents still compile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum StepKind {
    Detect,
    Classify,
    Inference,
    Transform,
    Utility(UtilityKind),
    Unknown(String),
}

/// Elements placed as-is, without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtilityKind {
    Track,
    AttachRoi,
    MetaConvert,
    MetaPublish,
    Watermark,
    FpsCounter,
    FpsDisplaySink,
    Queue,
    VideoConvert,
    DecodeBin,
    FileSrc,
    FakeSink,
}

impl UtilityKind {
    const ALL: [UtilityKind; 12] = [
        UtilityKind::Track,
        UtilityKind::AttachRoi,
        UtilityKind::MetaConvert,
        UtilityKind::MetaPublish,
        UtilityKind::Watermark,
        UtilityKind::FpsCounter,
        UtilityKind::FpsDisplaySink,
        UtilityKind::Queue,
        UtilityKind::VideoConvert,
        UtilityKind::DecodeBin,
        UtilityKind::FileSrc,
        UtilityKind::FakeSink,
    ];

    pub fn factory(self) -> &'static str {
        match self {
            UtilityKind::Track => "gvatrack",
            UtilityKind::AttachRoi => "gvaattachroi",
            UtilityKind::MetaConvert => "gvametaconvert",
            UtilityKind::MetaPublish => "gvametapublish",
            UtilityKind::Watermark => "gvawatermark",
            UtilityKind::FpsCounter => "gvafpscounter",
            UtilityKind::FpsDisplaySink => "fpsdisplaysink",
            UtilityKind::Queue => "queue",
            UtilityKind::VideoConvert => "videoconvert",
            UtilityKind::DecodeBin => "decodebin",
            UtilityKind::FileSrc => "filesrc",
            UtilityKind::FakeSink => "fakesink",
        }
    }

    fn from_factory(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.factory() == name)
    }
}

impl StepKind {
    /// The GStreamer factory name this kind is written as.
    pub fn as_str(&self) -> &str {
        match self {
            StepKind::Detect => "gvadetect",
            StepKind::Classify => "gvaclassify",
            StepKind::Inference => "gvainference",
            StepKind::Transform => "gvapython",
            StepKind::Utility(u) => u.factory(),
            StepKind::Unknown(name) => name,
        }
    }

    /// Kinds that run a model and need model/device/precision.
    pub fn is_inference(&self) -> bool {
        matches!(
            self,
            StepKind::Detect | StepKind::Classify | StepKind::Inference
        )
    }
}

impl From<String> for StepKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "gvadetect" => StepKind::Detect,
            "gvaclassify" => StepKind::Classify,
            "gvainference" => StepKind::Inference,
            "gvapython" => StepKind::Transform,
            other => match UtilityKind::from_factory(other) {
                Some(u) => StepKind::Utility(u),
                None => StepKind::Unknown(name),
            },
        }
    }
}

impl From<StepKind> for String {
    fn from(kind: StepKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
