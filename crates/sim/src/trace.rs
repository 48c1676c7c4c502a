//! Recorded-position traces, for comparing a simulated run against a
//! previously captured golden trace in CI.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionSample {
    pub tick: u64,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MotionTrace {
    pub samples: Vec<MotionSample>,
}

impl MotionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: MotionSample) {
        self.samples.push(sample);
    }

    pub fn dump_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut trace = MotionTrace::new();
        trace.push(MotionSample { tick: 0, x: 0, y: 0, z: 0 });
        trace.push(MotionSample { tick: 1, x: 1, y: 0, z: 0 });
        let dir = std::env::temp_dir().join("gantry-core-sim-trace-test.json");
        trace.dump_json(&dir).unwrap();
        let loaded = MotionTrace::load_json(&dir).unwrap();
        assert_eq!(loaded.samples, trace.samples);
        let _ = std::fs::remove_file(&dir);
    }
}
