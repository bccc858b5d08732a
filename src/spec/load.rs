use crate::Result;
use crate::diagnostics;
use crate::spec::{CameraDocument, CameraSpec, WorkloadDocument, WorkloadMap};

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Both input documents, fully loaded.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub cameras: Vec<CameraSpec>,
    pub workloads: WorkloadMap,
}

/// Load the camera and workload documents. Any read or shape problem is a
/// structural error: nothing can be compiled from a partial document.
pub fn load_inputs(camera_path: &Path, workload_path: &Path) -> Result<Inputs> {
    let camera_doc: CameraDocument = load_json(camera_path, "camera")?;
    let workload_doc: WorkloadDocument = load_json(workload_path, "workload")?;

    Ok(Inputs {
        cameras: camera_doc.lane_config.cameras,
        workloads: workload_doc.into_map(),
    })
}

fn load_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| {
        diagnostics::error_message(format!("read {} document {}", what, path.display()))
    })?;
    let parsed = serde_json::from_str(&text).with_context(|| {
        diagnostics::error_message(format!("parse {} document {}", what, path.display()))
    })?;
    Ok(parsed)
}
