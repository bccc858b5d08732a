//! Step-list fingerprints.
//!
//! Two step lists with equal signatures compile to the same branch shape, so
//! one branch serves both. Only kind, model, precision and device take part;
//! regions of interest, script module/function and per-device tuning values
//! change element parameters, never the shape.

use crate::spec::StepSpec;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Projection of one step. Fields are declared in key order so the encoding
/// does not depend on how the source document ordered them.
#[derive(Serialize)]
struct SignatureEntry<'a> {
    device: Option<&'a str>,
    model: Option<&'a str>,
    precision: Option<&'a str>,
    #[serde(rename = "type")]
    kind: &'a str,
}

pub fn signature<'a, I>(steps: I) -> Signature
where
    I: IntoIterator<Item = &'a StepSpec>,
{
    let entries: Vec<SignatureEntry<'_>> = steps
        .into_iter()
        .map(|s| SignatureEntry {
            device: s.device.as_deref(),
            model: s.model.as_deref(),
            precision: s.precision.as_deref(),
            kind: s.kind.as_str(),
        })
        .collect();
    // Serializing borrowed strings and options cannot fail.
    Signature(serde_json::to_string(&entries).unwrap_or_default())
}
