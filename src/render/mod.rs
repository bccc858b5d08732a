pub mod launch;

pub use launch::{GraphDescriptor, Layout, render_launch_command};
