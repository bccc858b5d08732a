//! Model and video artifact locations.

use crate::spec::StepKind;
use std::path::{Path, PathBuf};

/// Files backing one inference stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    pub model: PathBuf,
    pub labels: Option<PathBuf>,
    pub proc: Option<PathBuf>,
}

/// Resolves models and videos to concrete paths.
pub trait ArtifactResolver {
    fn model_artifacts(&self, kind: &StepKind, model: &str, precision: &str) -> ModelArtifacts;

    fn video_path(&self, file_ref: &str, width: &str, fps: &str) -> PathBuf;
}

/// `<base>-<width>-<fps>-bench`, with a trailing `.mp4` dropped from `base`.
///
/// Shared by the file layout and the streamer's path naming.
pub fn bench_stem(file_ref: &str, width: &str, fps: &str) -> String {
    let base = file_ref.strip_suffix(".mp4").unwrap_or(file_ref);
    format!("{}-{}-{}-bench", base, width, fps)
}

/// The model server's on-disk layout:
///
/// ```text
/// models/object_detection/<model>/<precision>/<model>.xml
/// models/object_classification/<model>/<precision>/<model>.xml
/// models/object_classification/<model>/<model>.txt    (labels)
/// models/object_classification/<model>/<model>.json   (model-proc)
/// sample-media/<base>-<width>-<fps>-bench.mp4
/// ```
#[derive(Debug, Clone)]
pub struct ModelServerLayout {
    models_dir: PathBuf,
    videos_dir: PathBuf,
}

impl ModelServerLayout {
    pub fn new(models_dir: impl Into<PathBuf>, videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            videos_dir: videos_dir.into(),
        }
    }

    fn ir_path(base: &Path, model: &str, precision: &str) -> PathBuf {
        base.join(precision).join(format!("{}.xml", model))
    }
}

impl ArtifactResolver for ModelServerLayout {
    fn model_artifacts(&self, kind: &StepKind, model: &str, precision: &str) -> ModelArtifacts {
        match kind {
            StepKind::Detect => {
                let base = self.models_dir.join("object_detection").join(model);
                ModelArtifacts {
                    model: Self::ir_path(&base, model, precision),
                    labels: None,
                    proc: None,
                }
            }
            StepKind::Inference => {
                let base = self.models_dir.join("object_classification").join(model);
                ModelArtifacts {
                    model: Self::ir_path(&base, model, precision),
                    labels: None,
                    proc: None,
                }
            }
            StepKind::Classify => {
                let base = self.models_dir.join("object_classification").join(model);
                ModelArtifacts {
                    model: Self::ir_path(&base, model, precision),
                    labels: Some(base.join(format!("{}.txt", model))),
                    proc: Some(base.join(format!("{}.json", model))),
                }
            }
            _ => ModelArtifacts {
                model: self.models_dir.join(model),
                labels: None,
                proc: None,
            },
        }
    }

    fn video_path(&self, file_ref: &str, width: &str, fps: &str) -> PathBuf {
        self.videos_dir
            .join(format!("{}.mp4", bench_stem(file_ref, width, fps)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ModelServerLayout {
        ModelServerLayout::new("/ps/models", "/ps/sample-media")
    }

    #[test]
    fn detect_models_live_under_object_detection() {
        let a = layout().model_artifacts(&StepKind::Detect, "yolov8s", "FP16");
        assert_eq!(
            a.model,
            PathBuf::from("/ps/models/object_detection/yolov8s/FP16/yolov8s.xml")
        );
        assert_eq!(a.proc, None);
    }

    #[test]
    fn classify_models_carry_labels_and_proc() {
        let a = layout().model_artifacts(&StepKind::Classify, "age", "INT8");
        assert_eq!(
            a.model,
            PathBuf::from("/ps/models/object_classification/age/INT8/age.xml")
        );
        assert_eq!(
            a.labels,
            Some(PathBuf::from("/ps/models/object_classification/age/age.txt"))
        );
        assert_eq!(
            a.proc,
            Some(PathBuf::from("/ps/models/object_classification/age/age.json"))
        );
    }

    #[test]
    fn other_kinds_fall_back_to_models_root() {
        let a = layout().model_artifacts(&StepKind::Transform, "thing", "FP32");
        assert_eq!(a.model, PathBuf::from("/ps/models/thing"));
    }

    #[test]
    fn video_paths_use_bench_naming() {
        assert_eq!(
            layout().video_path("people.mp4", "1920", "15"),
            PathBuf::from("/ps/sample-media/people-1920-15-bench.mp4")
        );
        assert_eq!(bench_stem("clip", "640", "30"), "clip-640-30-bench");
    }
}
