//! Per-device tuning profiles (`all-cpu.env`, `all-gpu.env`, `all-npu.env`).
//!
//! A profile is a dotenv file of element choices and property fragments:
//!
//! ```text
//! DECODE="decodebin3 ! vapostproc ! video/x-raw(memory:VAMemory)"
//! PRE_PROCESS=pre-process-backend=va-surface-sharing
//! BATCH_SIZE_DETECT=8
//! ```

use crate::diagnostics;
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_DECODE: &str = "decodebin";

/// Profile file per known device.
const PROFILE_FILES: [(&str, &str); 3] = [
    ("CPU", "all-cpu.env"),
    ("NPU", "all-npu.env"),
    ("GPU", "all-gpu.env"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTuning {
    values: BTreeMap<String, String>,
}

impl DeviceTuning {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Decode element, `decodebin` when unset or blank.
    pub fn decode(&self) -> &str {
        self.get("DECODE")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_DECODE)
    }

    /// A property fragment appended verbatim to an element; empty when unset.
    pub fn fragment(&self, key: &str) -> &str {
        self.get(key).map(str::trim).unwrap_or("")
    }
}

/// Looks up tuning values for an execution device.
pub trait DeviceProfile {
    /// Unknown devices get an empty profile.
    fn tuning(&self, device: &str) -> &DeviceTuning;
}

/// Profiles read from dotenv files in one directory.
#[derive(Debug, Clone, Default)]
pub struct EnvFileProfiles {
    profiles: BTreeMap<String, DeviceTuning>,
    empty: DeviceTuning,
}

impl EnvFileProfiles {
    /// Read every known profile file present in `dir`. A missing file means
    /// the device has no tuning; an unreadable one is reported and ignored.
    pub fn load(dir: &Path) -> Self {
        let mut out = Self::default();
        for (device, file) in PROFILE_FILES {
            let path = dir.join(file);
            if !path.exists() {
                tracing::debug!("no device profile for {} at {}", device, path.display());
                continue;
            }
            match read_env_file(&path) {
                Ok(tuning) => {
                    out.profiles.insert(device.to_string(), tuning);
                }
                Err(e) => diagnostics::warn(format!(
                    "ignoring device profile {}: {}",
                    path.display(),
                    e
                )),
            }
        }
        out
    }

    pub fn with_profile(mut self, device: &str, tuning: DeviceTuning) -> Self {
        self.profiles.insert(device.to_uppercase(), tuning);
        self
    }
}

impl DeviceProfile for EnvFileProfiles {
    fn tuning(&self, device: &str) -> &DeviceTuning {
        self.profiles
            .get(&device.to_uppercase())
            .unwrap_or(&self.empty)
    }
}

fn read_env_file(path: &Path) -> Result<DeviceTuning, dotenvy::Error> {
    let mut values = BTreeMap::new();
    for item in dotenvy::from_path_iter(path)? {
        let (key, value) = item?;
        values.insert(key, value);
    }
    Ok(DeviceTuning { values })
}
