//! Branch construction.
//!
//! A camera's workloads are bound to the camera (region of interest, names),
//! grouped by signature, and every distinct signature becomes one branch:
//!
//! ```text
//! source ! decode [! gvaattachroi ! queue] ! stage ! ... ! [gvametaconvert !] tee
//!     tee. ! queue ! [gvametapublish !] gvafpscounter ! fakesink
//!     tee. ! queue ! fpsdisplaysink video-sink=fakesink
//!     tee. ! queue ! gvawatermark ! [vapostproc !] fpsdisplaysink   (render only)
//! ```

use crate::compile::element::Element;
use crate::compile::names::NameAllocator;
use crate::compile::signature::{Signature, signature};
use crate::diagnostics;
use crate::resolve::device::DEFAULT_DECODE;
use crate::resolve::{
    ArtifactResolver, DeviceProfile, DeviceTuning, Source, StreamEndpoint, resolve_source,
    sanitize_name,
};
use crate::settings::Settings;
use crate::spec::{CameraSpec, RegionOfInterest, StepKind, StepSpec, WorkloadMap};

use std::collections::HashMap;

/// A workload step specialised for one camera.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStep {
    pub step: StepSpec,
    pub workload: String,
    pub camera_id: String,
}

/// One processing chain shared by every workload of a camera with the same
/// signature.
#[derive(Debug, Clone)]
pub struct Branch {
    pub camera_index: usize,
    pub signature_index: usize,
    pub signature: Signature,
    pub source: Source,
    /// Steps of the first workload seen with this signature.
    pub steps: Vec<BoundStep>,
    /// Workloads served, in assignment order.
    pub workloads: Vec<String>,
}

/// A fan-out point and its parallel legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Junction {
    pub name: String,
    pub legs: Vec<Vec<Element>>,
}

/// A branch turned into elements, ready for emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBranch {
    /// Source through the junction's `tee`.
    pub chain: Vec<Element>,
    pub junction: Junction,
}

pub struct BranchBuilder<'a> {
    settings: &'a Settings,
    artifacts: &'a dyn ArtifactResolver,
    devices: &'a dyn DeviceProfile,
}

impl<'a> BranchBuilder<'a> {
    pub fn new(
        settings: &'a Settings,
        artifacts: &'a dyn ArtifactResolver,
        devices: &'a dyn DeviceProfile,
    ) -> Self {
        Self {
            settings,
            artifacts,
            devices,
        }
    }

    /// Group a camera's workloads into branches, one per distinct signature,
    /// in first-seen order. Workloads missing from `workload_map` are skipped.
    pub fn build(
        &self,
        camera_index: usize,
        camera: &CameraSpec,
        workload_names: &[String],
        workload_map: &WorkloadMap,
    ) -> Vec<Branch> {
        let camera_id = camera
            .id()
            .map(str::to_string)
            .unwrap_or_else(|| format!("cam{}", camera_index + 1));
        let endpoint = StreamEndpoint {
            host: self.settings.rtsp_host.clone(),
            port: self.settings.rtsp_port.clone(),
        };
        let source = resolve_source(camera, &endpoint, self.artifacts);
        tracing::debug!("camera {}: source element {}", camera_id, source.name());

        let mut branches: Vec<Branch> = Vec::new();
        let mut by_signature: HashMap<Signature, usize> = HashMap::new();

        for workload in workload_names {
            let steps = match workload_map.get(workload) {
                Some(steps) if !steps.is_empty() => steps,
                Some(_) => {
                    diagnostics::warn(format!(
                        "workload '{}' on camera {} has no steps, skipping",
                        workload, camera_id
                    ));
                    continue;
                }
                None => {
                    diagnostics::warn(format!(
                        "camera {} requests unknown workload '{}', skipping",
                        camera_id, workload
                    ));
                    continue;
                }
            };

            let bound: Vec<BoundStep> = steps
                .iter()
                .map(|s| {
                    let mut step = s.clone();
                    if let Some(roi) = &camera.region_of_interest {
                        step.region_of_interest = Some(roi.clone());
                    }
                    BoundStep {
                        step,
                        workload: workload.clone(),
                        camera_id: camera_id.clone(),
                    }
                })
                .collect();
            let sig = signature(bound.iter().map(|b| &b.step));

            if let Some(&idx) = by_signature.get(&sig) {
                tracing::debug!(
                    "camera {}: workload '{}' shares branch {} ({}) with {:?}",
                    camera_id,
                    workload,
                    idx + 1,
                    branches[idx].signature,
                    branches[idx].workloads
                );
                branches[idx].workloads.push(workload.clone());
                continue;
            }

            by_signature.insert(sig.clone(), branches.len());
            branches.push(Branch {
                camera_index,
                signature_index: branches.len(),
                signature: sig,
                source: source.clone(),
                steps: bound,
                workloads: vec![workload.clone()],
            });
        }

        branches
    }

    /// Turn a branch into elements. Names come from `names` in a fixed order:
    /// source, each detect stage, the junction.
    pub fn compile(&self, branch: &Branch, names: &mut NameAllocator) -> CompiledBranch {
        let c = branch.camera_index + 1;
        let s = branch.signature_index + 1;
        let empty = DeviceTuning::default();

        let first_device = branch
            .steps
            .first()
            .and_then(|b| b.step.device.as_deref());
        let decode = first_device
            .map(|d| self.devices.tuning(d).decode())
            .unwrap_or(DEFAULT_DECODE);

        let mut chain = self.source_elements(&branch.source, names);
        chain.push(Element::new(decode));

        let rois = distinct_rois(&branch.steps);
        if !rois.is_empty() {
            let attach = rois
                .iter()
                .fold(Element::new("gvaattachroi"), |e, r| e.prop("roi", r.to_roi_arg()));
            chain.push(attach);
            chain.push(Element::queue());
        }

        for (i, bound) in branch.steps.iter().enumerate() {
            if i > 0 && !chain.last().is_some_and(Element::is_queue) {
                chain.push(Element::queue());
            }
            let tuning = bound
                .step
                .device
                .as_deref()
                .map(|d| self.devices.tuning(d))
                .unwrap_or(&empty);
            chain.extend(self.stage_elements(bound, tuning, c, s, names));
        }

        let n = names.allocate();
        let tee_name = format!("t{}_{}_{}", c, s, n);
        let stream_id = format!("stream{}_{}_{}", c, s, n);
        let has_transform = branch
            .steps
            .iter()
            .any(|b| b.step.kind == StepKind::Transform);

        let mut legs = Vec::new();
        if has_transform {
            chain.push(Element::new("tee").prop("name", &tee_name));
            legs.push(vec![
                Element::queue(),
                Element::new("gvafpscounter").prop("name", &stream_id),
                fakesink(),
            ]);
        } else {
            chain.push(Element::new("gvametaconvert"));
            chain.push(Element::new("tee").prop("name", &tee_name));
            let out_file = self.settings.results_dir().join(format!(
                "rs-{}_{}__{}_{}.jsonl",
                c, s, n, self.settings.timestamp
            ));
            legs.push(vec![
                Element::queue(),
                Element::new("gvametapublish")
                    .prop("file-format", "json-lines")
                    .prop("file-path", out_file.display()),
                Element::new("gvafpscounter").prop("name", &stream_id),
                fakesink(),
            ]);
        }

        legs.push(vec![
            Element::queue(),
            Element::new("fpsdisplaysink")
                .prop("video-sink", "fakesink")
                .prop("signal-fps-measurements", "true"),
        ]);

        if self.settings.render {
            let mut render = vec![Element::queue(), Element::new("gvawatermark")];
            if first_device.is_some_and(|d| matches!(d.to_uppercase().as_str(), "GPU" | "NPU")) {
                render.push(Element::new("vapostproc"));
            }
            render.push(
                Element::new("fpsdisplaysink")
                    .prop("video-sink", "autovideosink")
                    .prop("text-overlay", "true")
                    .prop("signal-fps-measurements", "true"),
            );
            legs.push(render);
        }

        CompiledBranch {
            chain,
            junction: Junction {
                name: tee_name,
                legs,
            },
        }
    }

    fn source_elements(&self, source: &Source, names: &mut NameAllocator) -> Vec<Element> {
        let n = names.allocate();
        match source {
            Source::Stream { uri, name } => vec![
                Element::new("rtspsrc")
                    .prop("name", format!("{}_{}", name, n))
                    .quoted_prop("location", uri)
                    .prop("protocols", "tcp")
                    .prop("latency", &self.settings.rtsp_latency)
                    .prop("timeout", 5_000_000)
                    .prop("retry", 3)
                    .prop("drop-on-latency", "true"),
                Element::new("rtph264depay"),
                Element::new("h264parse").prop("config-interval", -1),
                Element::queue(),
            ],
            Source::File { path, name } => vec![
                Element::new("filesrc")
                    .prop("name", format!("{}_{}", name, n))
                    .prop("location", path.display()),
            ],
        }
    }

    fn stage_elements(
        &self,
        bound: &BoundStep,
        tuning: &DeviceTuning,
        c: usize,
        s: usize,
        names: &mut NameAllocator,
    ) -> Vec<Element> {
        let step = &bound.step;
        if step.kind.is_inference() {
            check_inference_fields(bound);
        }

        match &step.kind {
            StepKind::Detect => {
                let n = names.allocate();
                let batch = batch_size(
                    "BATCH_SIZE_DETECT",
                    self.settings.batch_size_detect.as_deref(),
                    tuning,
                );
                let mut e = Element::new("gvadetect")
                    .prop("model-instance-id", format!("detect{}_{}", c, s))
                    .prop("threshold", 0.5)
                    .prop(
                        "name",
                        sanitize_name(&format!("{}_{}_{}", bound.camera_id, bound.workload, n)),
                    )
                    .prop("batch-size", batch)
                    .prop("inference-interval", 3)
                    .prop("scale-method", "fast");
                if step.region_of_interest.is_some() {
                    e = e.prop("inference-region", 1);
                }
                let e = self
                    .with_model(e, step)
                    .fragment(tuning.fragment("PRE_PROCESS"))
                    .fragment(tuning.fragment("DETECTION_OPTIONS"))
                    .fragment(tuning.fragment("PRE_PROCESS_CONFIG"));
                vec![
                    e,
                    Element::new("gvatrack").prop("tracking-type", "zero-term-imageless"),
                    Element::queue(),
                ]
            }
            StepKind::Classify => {
                let batch = batch_size(
                    "BATCH_SIZE_CLASSIFY",
                    self.settings.batch_size_classify.as_deref(),
                    tuning,
                );
                let e = Element::new("gvaclassify")
                    .prop("model-instance-id", format!("classify{}_{}", c, s))
                    .prop("batch-size", batch)
                    .prop("inference-region", 1)
                    .prop("scale-method", "fast");
                let e = self
                    .with_model(e, step)
                    .fragment(tuning.fragment("CLASSIFICATION_PRE_PROCESS"));
                vec![e, Element::queue()]
            }
            StepKind::Inference => {
                let e = Element::new("gvainference")
                    .prop("model-instance-id", format!("inference{}_{}", c, s));
                vec![self.with_model(e, step)]
            }
            StepKind::Transform => {
                let module = step.module.as_deref().unwrap_or_default();
                let function = step.function.as_deref().unwrap_or_default();
                if module.is_empty() || function.is_empty() {
                    diagnostics::warn(format!(
                        "gvapython step of workload '{}' on camera {} is missing module or function",
                        bound.workload, bound.camera_id
                    ));
                }
                vec![
                    Element::new("gvapython")
                        .prop("module", self.settings.scripts_dir().join(module).display())
                        .prop("function", function),
                    Element::queue(),
                ]
            }
            StepKind::Utility(u) => vec![Element::new(u.factory())],
            StepKind::Unknown(name) => {
                diagnostics::warn(format!(
                    "unknown or unsupported element type '{}' in workload '{}', passing through",
                    name, bound.workload
                ));
                vec![Element::new(name.as_str())]
            }
        }
    }

    /// Add `model=`, `device=` and, when there is one, `model-proc=`.
    fn with_model(&self, element: Element, step: &StepSpec) -> Element {
        let artifacts = self.artifacts.model_artifacts(
            &step.kind,
            step.model.as_deref().unwrap_or_default(),
            step.precision.as_deref().unwrap_or_default(),
        );
        if let Some(labels) = &artifacts.labels {
            tracing::debug!("labels for {}: {}", step.kind, labels.display());
        }
        let mut e = element.prop("model", artifacts.model.display());
        if let Some(device) = &step.device {
            e = e.prop("device", device);
        }
        if let Some(proc) = &artifacts.proc {
            e = e.prop("model-proc", proc.display());
        }
        e
    }
}

fn fakesink() -> Element {
    Element::new("fakesink")
        .prop("sync", "false")
        .prop("async", "false")
}

/// Rectangles carried by the steps, first-seen order, exact duplicates removed.
fn distinct_rois(steps: &[BoundStep]) -> Vec<&RegionOfInterest> {
    let mut out: Vec<&RegionOfInterest> = Vec::new();
    for roi in steps.iter().filter_map(|b| b.step.region_of_interest.as_ref()) {
        if !out.contains(&roi) {
            out.push(roi);
        }
    }
    out
}

/// Environment override first, then the device profile, then 1.
fn batch_size(key: &str, env_override: Option<&str>, tuning: &DeviceTuning) -> u32 {
    let Some(raw) = env_override.or_else(|| tuning.get(key)) else {
        return 1;
    };
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
            diagnostics::warn(format!("invalid {} value '{}', using default 1", key, raw));
            1
        }
    }
}

fn check_inference_fields(bound: &BoundStep) {
    let step = &bound.step;
    let missing: Vec<&str> = [
        ("model", step.model.is_none()),
        ("device", step.device.is_none()),
        ("precision", step.precision.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();
    if !missing.is_empty() {
        diagnostics::warn(format!(
            "{} step of workload '{}' on camera {} is missing {}",
            step.kind,
            bound.workload,
            bound.camera_id,
            missing.join(", ")
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::capture;
    use crate::resolve::{EnvFileProfiles, ModelServerLayout};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn settings(render: bool) -> Settings {
        let mut vars: BTreeMap<&str, &str> = BTreeMap::new();
        vars.insert("PIPELINE_SERVER_DIR", "/ps");
        vars.insert("TIMESTAMP", "20250101");
        if render {
            vars.insert("RENDER_MODE", "1");
        }
        Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
    }

    fn layout() -> ModelServerLayout {
        ModelServerLayout::new("/ps/models", "/ps/sample-media")
    }

    fn step(kind: &str, model: &str, device: &str) -> StepSpec {
        serde_json::from_value(serde_json::json!({
            "type": kind, "model": model, "device": device, "precision": "FP16"
        }))
        .unwrap()
    }

    fn camera(json: serde_json::Value) -> CameraSpec {
        serde_json::from_value(json).unwrap()
    }

    fn names(ws: &[&str]) -> Vec<String> {
        ws.iter().map(|w| w.to_string()).collect()
    }

    fn rendered(elements: &[Element]) -> Vec<String> {
        elements.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn identical_workloads_share_one_branch() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert("detect_a".into(), vec![step("gvadetect", "yolo", "CPU")]);
        map.insert("detect_a_dup".into(), vec![step("gvadetect", "yolo", "CPU")]);
        let cam = camera(serde_json::json!({"camera_id": "cam1", "fileSrc": "people.mp4"}));

        let branches = builder.build(0, &cam, &names(&["detect_a", "detect_a_dup"]), &map);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].workloads, names(&["detect_a", "detect_a_dup"]));

        let compiled = builder.compile(&branches[0], &mut NameAllocator::new());
        let text = rendered(&compiled.chain);
        assert_eq!(text.iter().filter(|e| e.starts_with("rtspsrc")).count(), 1);
        assert_eq!(text.iter().filter(|e| e.starts_with("gvadetect")).count(), 1);
        assert_eq!(text.iter().filter(|e| e.starts_with("gvatrack")).count(), 1);
        assert_eq!(compiled.junction.legs.len(), 2);
    }

    #[test]
    fn distinct_signatures_get_their_own_branches() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert("a".into(), vec![step("gvadetect", "yolo", "CPU")]);
        map.insert("b".into(), vec![step("gvadetect", "ssd", "CPU")]);
        map.insert("c".into(), vec![step("gvadetect", "yolo", "CPU")]);
        let cam = camera(serde_json::json!({"camera_id": "cam1"}));

        let branches = builder.build(2, &cam, &names(&["a", "b", "c"]), &map);
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].workloads, names(&["a", "c"]));
        assert_eq!(branches[1].workloads, names(&["b"]));
        assert_eq!(branches[1].signature_index, 1);
        assert_eq!(branches[1].camera_index, 2);
    }

    #[test]
    fn unknown_workload_yields_no_branch() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let cam = camera(serde_json::json!({"camera_id": "cam3"}));
        let (branches, logs) = capture::logs(|| {
            builder.build(0, &cam, &names(&["ghost"]), &WorkloadMap::new())
        });
        assert!(branches.is_empty());
        assert!(logs.contains("WARN"));
        assert!(logs.contains("camera cam3 requests unknown workload 'ghost'"));
    }

    #[test]
    fn camera_roi_is_attached_once() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert(
            "det_cls".into(),
            vec![step("gvadetect", "yolo", "CPU"), step("gvaclassify", "age", "CPU")],
        );
        let cam = camera(serde_json::json!({
            "camera_id": "cam2",
            "region_of_interest": {"x": 0, "y": 0, "x2": 1, "y2": 1}
        }));

        let branches = builder.build(0, &cam, &names(&["det_cls"]), &map);
        let compiled = builder.compile(&branches[0], &mut NameAllocator::new());
        let attach: Vec<String> = rendered(&compiled.chain)
            .into_iter()
            .filter(|e| e.starts_with("gvaattachroi"))
            .collect();
        assert_eq!(attach, vec!["gvaattachroi roi=0,0,1,1".to_string()]);

        let detect = compiled
            .chain
            .iter()
            .find(|e| e.factory() == "gvadetect")
            .unwrap();
        assert_eq!(detect.get("inference-region"), Some("1"));
    }

    #[test]
    fn empty_camera_roi_attaches_nothing() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert("det".into(), vec![step("gvadetect", "yolo", "CPU")]);
        let cam = camera(serde_json::json!({"camera_id": "c", "region_of_interest": {}}));

        let branches = builder.build(0, &cam, &names(&["det"]), &map);
        assert!(branches[0].steps[0].step.region_of_interest.is_none());
        let compiled = builder.compile(&branches[0], &mut NameAllocator::new());
        assert!(compiled.chain.iter().all(|e| e.factory() != "gvaattachroi"));
        let detect = compiled
            .chain
            .iter()
            .find(|e| e.factory() == "gvadetect")
            .unwrap();
        assert_eq!(detect.get("inference-region"), None);
    }

    #[test]
    fn step_level_rois_are_deduplicated_by_coordinates() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let with_roi = |kind: &str, x: u64| -> StepSpec {
            serde_json::from_value(serde_json::json!({
                "type": kind, "model": "m", "device": "CPU", "precision": "FP32",
                "region_of_interest": {"x": x, "y": 0, "x2": 100, "y2": 100}
            }))
            .unwrap()
        };
        let mut map = WorkloadMap::new();
        map.insert(
            "w".into(),
            vec![
                with_roi("gvadetect", 0),
                with_roi("gvaclassify", 10),
                with_roi("gvaclassify", 0),
            ],
        );
        let cam = camera(serde_json::json!({"camera_id": "c"}));
        let branches = builder.build(0, &cam, &names(&["w"]), &map);
        let compiled = builder.compile(&branches[0], &mut NameAllocator::new());
        let attach = compiled
            .chain
            .iter()
            .find(|e| e.factory() == "gvaattachroi")
            .unwrap();
        assert_eq!(
            attach.to_string(),
            "gvaattachroi roi=0,0,100,100 roi=10,0,100,100"
        );
    }

    #[test]
    fn full_chain_for_detect_then_classify() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert(
            "w".into(),
            vec![step("gvadetect", "yolo", "CPU"), step("gvaclassify", "age", "CPU")],
        );
        let cam = camera(serde_json::json!({"camera_id": "cam1", "fileSrc": "people.mp4"}));
        let branches = builder.build(0, &cam, &names(&["w"]), &map);
        let compiled = builder.compile(&branches[0], &mut NameAllocator::new());

        let q = "queue max-size-buffers=3 max-size-time=100000000 leaky=downstream";
        assert_eq!(
            rendered(&compiled.chain),
            vec![
                "rtspsrc name=cam1_1 location=\"rtsp://rtsp-streamer:8554/people-1920-15-bench\" protocols=tcp latency=200 timeout=5000000 retry=3 drop-on-latency=true".to_string(),
                "rtph264depay".to_string(),
                "h264parse config-interval=-1".to_string(),
                q.to_string(),
                "decodebin".to_string(),
                "gvadetect model-instance-id=detect1_1 threshold=0.5 name=cam1_w_2 batch-size=1 inference-interval=3 scale-method=fast model=/ps/models/object_detection/yolo/FP16/yolo.xml device=CPU".to_string(),
                "gvatrack tracking-type=zero-term-imageless".to_string(),
                q.to_string(),
                "gvaclassify model-instance-id=classify1_1 batch-size=1 inference-region=1 scale-method=fast model=/ps/models/object_classification/age/FP16/age.xml device=CPU model-proc=/ps/models/object_classification/age/age.json".to_string(),
                q.to_string(),
                "gvametaconvert".to_string(),
                "tee name=t1_1_3".to_string(),
            ]
        );
        assert_eq!(compiled.junction.name, "t1_1_3");
        assert_eq!(
            rendered(&compiled.junction.legs[0]),
            vec![
                q.to_string(),
                "gvametapublish file-format=json-lines file-path=/ps/results/rs-1_1__3_20250101.jsonl".to_string(),
                "gvafpscounter name=stream1_1_3".to_string(),
                "fakesink sync=false async=false".to_string(),
            ]
        );
        assert_eq!(
            rendered(&compiled.junction.legs[1]),
            vec![
                q.to_string(),
                "fpsdisplaysink video-sink=fakesink signal-fps-measurements=true".to_string(),
            ]
        );
    }

    #[test]
    fn inference_stage_gets_a_queue_before_next_stage() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert(
            "w".into(),
            vec![step("gvainference", "x", "CPU"), step("gvaclassify", "age", "CPU")],
        );
        let cam = camera(serde_json::json!({"camera_id": "c"}));
        let branches = builder.build(0, &cam, &names(&["w"]), &map);
        let compiled = builder.compile(&branches[0], &mut NameAllocator::new());
        let factories: Vec<&str> = compiled.chain.iter().map(Element::factory).collect();
        assert_eq!(
            factories,
            vec![
                "rtspsrc",
                "rtph264depay",
                "h264parse",
                "queue",
                "decodebin",
                "gvainference",
                "queue",
                "gvaclassify",
                "queue",
                "gvametaconvert",
                "tee",
            ]
        );
        // No doubled queues anywhere in the chain.
        for pair in compiled.chain.windows(2) {
            assert!(!(pair[0].is_queue() && pair[1].is_queue()));
        }
    }

    #[test]
    fn transform_branch_skips_metadata_conversion() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let py: StepSpec = serde_json::from_value(serde_json::json!({
            "type": "gvapython", "module": "count.py", "function": "process"
        }))
        .unwrap();
        let mut map = WorkloadMap::new();
        map.insert("w".into(), vec![step("gvadetect", "yolo", "CPU"), py]);
        let cam = camera(serde_json::json!({"camera_id": "c"}));
        let branches = builder.build(0, &cam, &names(&["w"]), &map);
        let compiled = builder.compile(&branches[0], &mut NameAllocator::new());

        let text = rendered(&compiled.chain);
        assert!(!text.iter().any(|e| e == "gvametaconvert"));
        assert!(text.contains(&"gvapython module=/ps/src/count.py function=process".to_string()));
        assert_eq!(text[text.len() - 2], Element::queue().to_string());
        assert!(text[text.len() - 1].starts_with("tee name="));
        assert_eq!(
            rendered(&compiled.junction.legs[0])[1..].to_vec(),
            vec![
                "gvafpscounter name=stream1_1_3".to_string(),
                "fakesink sync=false async=false".to_string()
            ]
        );
        assert_eq!(compiled.junction.legs.len(), 2);
    }

    #[test]
    fn render_flag_adds_exactly_one_leg() {
        let settings = settings(true);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert("w".into(), vec![step("gvadetect", "yolo", "GPU")]);
        let cam = camera(serde_json::json!({"camera_id": "c"}));
        let branches = builder.build(0, &cam, &names(&["w"]), &map);
        let compiled = builder.compile(&branches[0], &mut NameAllocator::new());

        assert_eq!(compiled.junction.legs.len(), 3);
        assert_eq!(
            rendered(&compiled.junction.legs[2])[1..].to_vec(),
            vec![
                "gvawatermark".to_string(),
                "vapostproc".to_string(),
                "fpsdisplaysink video-sink=autovideosink text-overlay=true signal-fps-measurements=true".to_string(),
            ]
        );
    }

    #[test]
    fn device_profile_drives_decode_and_fragments() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default().with_profile(
            "GPU",
            DeviceTuning::from_pairs([
                ("DECODE", "decodebin3 ! vapostproc"),
                ("PRE_PROCESS", "pre-process-backend=va-surface-sharing"),
                ("BATCH_SIZE_DETECT", "8"),
            ]),
        );
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert("w".into(), vec![step("gvadetect", "yolo", "gpu")]);
        let cam = camera(serde_json::json!({"camera_id": "c"}));
        let branches = builder.build(0, &cam, &names(&["w"]), &map);
        let compiled = builder.compile(&branches[0], &mut NameAllocator::new());

        let text = rendered(&compiled.chain);
        assert!(text.contains(&"decodebin3 ! vapostproc".to_string()));
        let detect = text.iter().find(|e| e.starts_with("gvadetect")).unwrap();
        assert!(detect.contains("batch-size=8"));
        assert!(detect.ends_with("device=gpu pre-process-backend=va-surface-sharing"));
    }

    #[test]
    fn batch_size_precedence_and_fallback() {
        let tuning = DeviceTuning::from_pairs([("BATCH_SIZE_DETECT", "4")]);
        assert_eq!(batch_size("BATCH_SIZE_DETECT", None, &tuning), 4);
        assert_eq!(batch_size("BATCH_SIZE_DETECT", Some("16"), &tuning), 16);
        assert_eq!(batch_size("BATCH_SIZE_DETECT", Some("lots"), &tuning), 1);
        assert_eq!(batch_size("BATCH_SIZE_DETECT", Some("0"), &tuning), 1);
        assert_eq!(batch_size("BATCH_SIZE_CLASSIFY", None, &tuning), 1);
    }

    #[test]
    fn unknown_kinds_pass_through_literally() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert(
            "w".into(),
            vec![
                step("gvadetect", "yolo", "CPU"),
                StepSpec::new(StepKind::from("gvafuture".to_string())),
                StepSpec::new(StepKind::from("gvawatermark".to_string())),
            ],
        );
        let cam = camera(serde_json::json!({"camera_id": "c"}));
        let branches = builder.build(0, &cam, &names(&["w"]), &map);
        let (compiled, logs) =
            capture::logs(|| builder.compile(&branches[0], &mut NameAllocator::new()));
        let factories: Vec<&str> = compiled.chain.iter().map(Element::factory).collect();
        assert!(factories.contains(&"gvafuture"));
        assert!(factories.contains(&"gvawatermark"));
        assert!(logs.contains("unknown or unsupported element type 'gvafuture'"));
        assert!(!logs.contains("'gvawatermark'"));
    }

    #[test]
    fn missing_camera_id_uses_index_for_stage_names() {
        let settings = settings(false);
        let layout = layout();
        let devices = EnvFileProfiles::default();
        let builder = BranchBuilder::new(&settings, &layout, &devices);

        let mut map = WorkloadMap::new();
        map.insert("w".into(), vec![step("gvadetect", "yolo", "CPU")]);
        let cam = camera(serde_json::json!({"fileSrc": "shop.mp4"}));
        let branches = builder.build(4, &cam, &names(&["w"]), &map);
        assert_eq!(branches[0].steps[0].camera_id, "cam5");
        assert_eq!(branches[0].source.name(), "shop-1920-15-bench");
    }
}
