//! Input documents: JSON schemas and the loader.
//!
//! Nothing here knows about elements or launch text. It owns:
//! - the camera document (sources, workload assignment, region of interest)
//! - the workload document (ordered processing steps per workload)

pub mod camera;
pub mod load;
pub mod workload;

pub use camera::{CameraDocument, CameraSpec, RegionOfInterest};
pub use load::{Inputs, load_inputs};
pub use workload::{StepKind, StepSpec, WorkloadDocument, WorkloadMap};
