//! Topology compiler: signatures, branches, element specs and names.

pub mod branch;
pub mod element;
pub mod names;
pub mod signature;

pub use branch::{BranchBuilder, CompiledBranch};
pub use element::Element;
pub use names::NameAllocator;
