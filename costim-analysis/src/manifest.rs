//! Experiment metadata for each recording, read from a JSON manifest.
use crate::error::LoadError;
use costim_common::{CellId, ProtocolId, Real};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Manifest<T> {
    pub files: Vec<T>,
}

impl<T: DeserializeOwned> Manifest<T> {
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self, LoadError> {
        serde_json::from_reader(reader).map_err(|source| LoadError::Manifest {
            path: path.to_owned(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), path)
    }
}

/// An entry of a manifest, naming one recording.
pub trait ManifestEntry {
    fn path(&self) -> &Path;
}

/// A costimulation recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CostimFileMetadata {
    pub path: PathBuf,
    /// Membrane capacitance, pF.
    pub capacitance: Real,
    /// LED drive, DACs.
    pub optical_power: Real,
    pub optical_threshold: Real,
    /// Injected current, pA.
    pub electrical_power: Real,
    pub electrical_threshold: Real,
    /// Whether action potentials were seen when the file was recorded.
    #[serde(default)]
    pub aps_observed: bool,
    pub cell: CellId,
    pub protocol: ProtocolId,
}

/// A pulse-train recording, in which each run steps the electrical current
/// through a number of levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PulseTrainFileMetadata {
    pub path: PathBuf,
    pub capacitance: Real,
    pub optical_power: Real,
    /// ms
    pub optical_pulse_width: Real,
    /// Interval between optical pulses, ms.
    pub optical_isi: Real,
    /// pA
    pub min_current: i64,
    /// pA
    pub max_current: i64,
    /// ms
    pub electrical_pulse_width: Real,
    pub current_levels: usize,
    pub optical_threshold: Real,
    pub electrical_threshold: Real,
    pub cell: CellId,
}

impl ManifestEntry for CostimFileMetadata {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl ManifestEntry for PulseTrainFileMetadata {
    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COSTIM_MANIFEST: &str = r#"
    {
        "files": [
            {
                "path": "cell1/costim_0001.axgd",
                "capacitance": 21.5,
                "optical-power": 2000,
                "optical-threshold": 2200,
                "electrical-power": 135,
                "electrical-threshold": 150,
                "aps-observed": true,
                "cell": 1,
                "protocol": 0
            },
            {
                "path": "cell2/costim_0002.axgd",
                "capacitance": 18,
                "optical-power": 0,
                "optical-threshold": 1900,
                "electrical-power": 200,
                "electrical-threshold": 210,
                "cell": 2,
                "protocol": 3
            }
        ]
    }
    "#;

    const PULSE_TRAIN_MANIFEST: &str = r#"
    {
        "files": [
            {
                "path": "cell4/train_0001.axgd",
                "capacitance": 20,
                "optical-power": 1800,
                "optical-pulse-width": 5,
                "optical-isi": 45,
                "min-current": 100,
                "max-current": 200,
                "electrical-pulse-width": 3,
                "current-levels": 3,
                "optical-threshold": 1900,
                "electrical-threshold": 210,
                "cell": 4
            }
        ]
    }
    "#;

    #[test]
    fn costim_manifest() {
        let manifest: Manifest<CostimFileMetadata> =
            Manifest::from_reader(COSTIM_MANIFEST.as_bytes(), Path::new("costim.json")).unwrap();
        assert_eq!(manifest.files.len(), 2);
        let first = &manifest.files[0];
        assert_eq!(first.path, PathBuf::from("cell1/costim_0001.axgd"));
        assert!(first.aps_observed);
        assert_eq!(first.protocol, 0);
        assert!(!manifest.files[1].aps_observed);
        assert_eq!(manifest.files[1].cell, 2);
    }

    #[test]
    fn pulse_train_manifest() {
        let manifest: Manifest<PulseTrainFileMetadata> =
            Manifest::from_reader(PULSE_TRAIN_MANIFEST.as_bytes(), Path::new("trains.json"))
                .unwrap();
        let file = &manifest.files[0];
        assert_eq!(file.current_levels, 3);
        assert_eq!(file.max_current - file.min_current, 100);
        assert_eq!(file.optical_isi, 45.0);
    }

    #[test]
    fn malformed_manifest_is_a_load_error() {
        let error = Manifest::<CostimFileMetadata>::from_reader(
            r#"{"files": [{"path": "a"}]}"#.as_bytes(),
            Path::new("broken.json"),
        )
        .unwrap_err();
        assert!(matches!(error, LoadError::Manifest { .. }));
    }
}
