//! Collaborators the compiler asks for concrete values: artifact paths,
//! device tuning, and stream sources.

pub mod artifacts;
pub mod device;
pub mod source;

pub use artifacts::{ArtifactResolver, ModelServerLayout};
pub use device::{DeviceProfile, DeviceTuning, EnvFileProfiles};
pub use source::{Source, StreamEndpoint, resolve_source, sanitize_name};
