use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

/// Sentinel reading used where the reference surface expects a value
/// even though no valid temperature could be read.
pub const TEMP_INVALID_MILLIDEG: i32 = -999;

const SYSFS_THERMAL_ROOT: &str = "/sys/class/thermal";

// Zone types that identify the CPU/SoC package sensor. Matched as
// substrings against the zone "type" file.
const PREFERRED_ZONE_TYPES: &[&str] = &["cpu", "x86_pkg_temp", "soc"];

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("no usable CPU temperature sensor under {path}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read CPU temperature from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Source of instantaneous CPU temperature readings in milli-degrees
/// Celsius (1000 = 1.0°C).
pub trait TemperatureSensor {
    fn read_millidegrees(&mut self) -> Result<i32, SensorError>;
}

/// Reads the CPU temperature from the Linux sysfs thermal class.
///
/// The thermal zone is resolved on the first read and the resolved path
/// is cached for the process lifetime. Resolution prefers a zone whose
/// type names the CPU or SoC package and falls back to the lowest
/// numbered zone.
pub struct CpuTempSensor {
    base: PathBuf,
    temp_path: Option<PathBuf>,
}

impl CpuTempSensor {
    pub fn new() -> Self {
        Self::with_base(SYSFS_THERMAL_ROOT)
    }

    fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            temp_path: None,
        }
    }

    fn resolve(&mut self) -> Result<PathBuf, SensorError> {
        if let Some(path) = &self.temp_path {
            return Ok(path.clone());
        }

        let zone = find_thermal_zone(&self.base).map_err(|source| {
            SensorError::Resolve {
                path: self.base.clone(),
                source,
            }
        })?;

        debug!("resolved CPU temperature sensor: {}", zone.display());

        let path = zone.join("temp");
        self.temp_path = Some(path.clone());

        Ok(path)
    }

    fn read_at(path: &Path) -> io::Result<i32> {
        let raw = fs::read_to_string(path)?;

        raw.trim().parse::<i32>().map_err(|err| {
            io::Error::new(io::ErrorKind::InvalidData, err)
        })
    }
}

impl TemperatureSensor for CpuTempSensor {
    fn read_millidegrees(&mut self) -> Result<i32, SensorError> {
        let path = self.resolve()?;

        Self::read_at(&path).map_err(|source| SensorError::Read {
            path,
            source,
        })
    }
}

// Scan the thermal class directory and pick the zone to read from.
// Zones are visited in name order so the fallback is deterministic.
fn find_thermal_zone(base: &Path) -> io::Result<PathBuf> {
    let mut zones: Vec<PathBuf> = fs::read_dir(base)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("thermal_zone"))
        })
        .collect();

    zones.sort();

    for zone in &zones {
        if let Ok(zone_type) = fs::read_to_string(zone.join("type")) {
            let zone_type = zone_type.trim().to_ascii_lowercase();

            if PREFERRED_ZONE_TYPES.iter().any(|t| zone_type.contains(t)) {
                return Ok(zone.clone());
            }
        }
    }

    zones.into_iter().next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "no thermal zones found",
        )
    })
}

/// Render a milli-degree reading as `<degrees>.<millidegrees>`.
///
/// Keeps the truncating division and remainder of the reference output
/// but applies the sign explicitly, so the sentinel renders as "-0.999".
/// Remainders below 100 still lose their leading zeros ("45.30").
pub fn format_millidegrees(milli: i32) -> String {
    let sign = if milli < 0 { "-" } else { "" };
    let magnitude = milli.unsigned_abs();

    format!("{}{}.{}", sign, magnitude / 1000, magnitude % 1000)
}
