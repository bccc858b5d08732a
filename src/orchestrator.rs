//! One compilation run: load both documents, drop excluded cameras, build and
//! compile every camera's branches `count` times over, render the command.

use crate::Result;
use crate::compile::{BranchBuilder, NameAllocator};
use crate::diagnostics;
use crate::render::{GraphDescriptor, Layout, render_launch_command};
use crate::resolve::{ArtifactResolver, DeviceProfile, EnvFileProfiles, ModelServerLayout};
use crate::settings::Settings;
use crate::spec::{CameraSpec, Inputs, load_inputs};

/// Load inputs according to `settings` and produce the launch command.
pub fn run(settings: &Settings, count: usize, layout: Layout) -> Result<String> {
    let inputs = load_inputs(
        &settings.camera_document_path(),
        &settings.workload_document_path(),
    )?;
    let artifacts = ModelServerLayout::new(settings.models_dir(), settings.videos_dir());
    let devices = EnvFileProfiles::load(&settings.device_profile_dir);

    let graph = compile_graph(&inputs, settings, &artifacts, &devices, count);
    Ok(render_launch_command(&graph, layout))
}

/// Cameras whose workloads do not include the exclusion marker
/// (compared trimmed and case-insensitively).
pub fn eligible_cameras<'c>(cameras: &'c [CameraSpec], marker: &str) -> Vec<&'c CameraSpec> {
    let marker = marker.trim().to_lowercase();
    cameras
        .iter()
        .filter(|cam| {
            let excluded = cam.workloads.normalized().contains(&marker);
            if excluded {
                diagnostics::info(format!(
                    "skipping camera {} with {} workload",
                    cam.id().unwrap_or("unknown"),
                    marker
                ));
            }
            !excluded
        })
        .collect()
}

pub fn compile_graph(
    inputs: &Inputs,
    settings: &Settings,
    artifacts: &dyn ArtifactResolver,
    devices: &dyn DeviceProfile,
    count: usize,
) -> GraphDescriptor {
    let cameras = eligible_cameras(&inputs.cameras, &settings.exclude_workload);
    let builder = BranchBuilder::new(settings, artifacts, devices);
    let mut names = NameAllocator::new();
    let mut compiled = Vec::new();

    for round in 0..count {
        for (idx, cam) in cameras.iter().enumerate() {
            let workloads = cam.workloads.normalized();
            let branches = builder.build(idx, cam, &workloads, &inputs.workloads);
            tracing::debug!(
                "round {}: camera {} -> {} branch(es) from {} workload(s)",
                round + 1,
                cam.id().unwrap_or("unknown"),
                branches.len(),
                workloads.len()
            );
            for branch in &branches {
                compiled.push(builder.compile(branch, &mut names));
            }
        }
    }

    GraphDescriptor {
        gst_debug: settings.gst_debug.clone(),
        gst_tracers: settings.gst_tracers.clone(),
        branches: compiled,
    }
}
