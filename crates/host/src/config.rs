//! Machine configuration loader.
//!
//! Pin assignment is not part of this file: `GpioPort` is injected by
//! whatever owns the `Stepper`s (the CLI wires up `sim::RecordingPort`,
//! firmware wires up real pins). What lives in the machine config is the
//! tuning that the motion core itself is agnostic to — sub-step scale,
//! soft travel bounds, and the `f_best`/`df_max`/precision knobs for the
//! locator and elevator.
use anyhow::{Context, Result};
use configparser::ini::Ini;
use std::path::Path;

fn required(config: &Ini, section: &str, key: &str) -> Result<String> {
    config
        .get(section, key)
        .with_context(|| format!("[{}] {} not found", section, key))
}

fn required_parse<T: std::str::FromStr>(config: &Ini, section: &str, key: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let raw = required(config, section, key)?;
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("[{}] {} is not valid: {}", section, key, e))
}

fn optional_parse<T: std::str::FromStr>(config: &Ini, section: &str, key: &str) -> Option<T> {
    config.get(section, key).and_then(|v| v.parse::<T>().ok())
}

/// Soft travel bounds for a single stepper axis, in sub-steps. Either
/// side may be left unset to leave that bound unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisBounds {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// The `[locator]` section: tuning shared by the X/Y equalization search.
#[derive(Debug, Clone, Copy)]
pub struct LocatorConfig {
    pub f_best: i64,
    pub df_max: i64,
    pub epsilon: i64,
}

/// The `[elevator]` section: tuning for the Z follower.
#[derive(Debug, Clone, Copy)]
pub struct ElevatorConfig {
    pub f_best: i64,
    pub df_max: i64,
}

/// The whole machine description.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Extra unit-scale multiplier applied on top of metric/inch
    /// conversion, forwarded to `GCodeReader::set_scale`.
    pub scale: f32,
    pub metric: bool,
    pub locator: LocatorConfig,
    pub elevator: ElevatorConfig,
    pub x: AxisBounds,
    pub y: AxisBounds,
    pub z: AxisBounds,
}

impl MachineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|e| anyhow::anyhow!("failed to load configuration file {:?}: {}", path, e))?;

        let scale = optional_parse(&config, "machine", "scale").unwrap_or(1.0);
        let unit: String = optional_parse(&config, "machine", "unit").unwrap_or_else(|| "mm".to_string());
        let metric = !unit.eq_ignore_ascii_case("inch");

        let locator = LocatorConfig {
            f_best: required_parse(&config, "locator", "f_best")?,
            df_max: required_parse(&config, "locator", "df_max")?,
            epsilon: required_parse(&config, "locator", "epsilon")?,
        };
        let elevator = ElevatorConfig {
            f_best: required_parse(&config, "elevator", "f_best")?,
            df_max: required_parse(&config, "elevator", "df_max")?,
        };

        Ok(MachineConfig {
            scale,
            metric,
            locator,
            elevator,
            x: Self::load_bounds(&config, "stepper_x"),
            y: Self::load_bounds(&config, "stepper_y"),
            z: Self::load_bounds(&config, "stepper_z"),
        })
    }

    fn load_bounds(config: &Ini, section: &str) -> AxisBounds {
        AxisBounds {
            min: optional_parse(config, section, "min"),
            max: optional_parse(config, section, "max"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU32, Ordering};

    static NEXT_ID: AtomicU32 = AtomicU32::new(0);

    struct TempFile {
        path: PathBuf,
    }

    impl TempFile {
        fn new(contents: &str) -> Self {
            let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "gantry-core-host-config-test-{}-{}.cfg",
                std::process::id(),
                id
            ));
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(contents.as_bytes()).unwrap();
            TempFile { path }
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    #[test]
    fn loads_required_sections_and_defaults_scale() {
        let file = TempFile::new(
            "[locator]\nf_best = 200\ndf_max = 4\nepsilon = 5\n\n[elevator]\nf_best = 100\ndf_max = 2\n",
        );
        let cfg = MachineConfig::load(file.path()).unwrap();
        assert_eq!(cfg.locator.f_best, 200);
        assert_eq!(cfg.elevator.df_max, 2);
        assert_eq!(cfg.scale, 1.0);
        assert!(cfg.metric);
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let file = TempFile::new("[locator]\nf_best = 200\n");
        assert!(MachineConfig::load(file.path()).is_err());
    }

    #[test]
    fn axis_bounds_are_optional() {
        let file = TempFile::new(
            "[locator]\nf_best = 1\ndf_max = 1\nepsilon = 1\n\n[elevator]\nf_best = 1\ndf_max = 1\n\n[stepper_x]\nmin = -1000\nmax = 1000\n",
        );
        let cfg = MachineConfig::load(file.path()).unwrap();
        assert_eq!(cfg.x.min, Some(-1000));
        assert_eq!(cfg.y.min, None);
    }
}
