//! Simulator settings

use std::path::PathBuf;

use blelogger_core::config::DeviceConfig;
use blelogger_core::link::ConnectionSignal;
use blelogger_core::storage::VolumeGeometry;
use serde::{Deserialize, Serialize};

/// How the phone app reaches the simulated device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkConfig {
    /// Accept one TCP client at a time
    Tcp { addr: String },
    /// UART-attached radio module
    Serial {
        port: String,
        baud: u32,
        #[serde(default)]
        signal: ConnectionSignal,
    },
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig::Tcp {
            addr: "127.0.0.1:7878".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub device: DeviceConfig,
    /// Directory standing in for the card root
    pub storage_dir: PathBuf,
    pub geometry: VolumeGeometry,
    /// Scheduler tick period
    pub tick_interval_ms: u64,
    pub link: LinkConfig,
    /// Fixed seed for the simulated sensor; random when absent
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            storage_dir: PathBuf::from("card"),
            geometry: VolumeGeometry::default(),
            tick_interval_ms: 50,
            link: LinkConfig::default(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config() {
        let json = r#"{
            "storage_dir": "/tmp/card",
            "device": { "rotation_threshold": 5 },
            "link": { "kind": "serial", "port": "/dev/ttyUSB0", "baud": 9600 }
        }"#;
        let config: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/card"));
        assert_eq!(config.device.rotation_threshold, 5);
        assert_eq!(config.device.sample_interval_ms, 1000);
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(
            config.link,
            LinkConfig::Serial {
                port: "/dev/ttyUSB0".into(),
                baud: 9600,
                signal: ConnectionSignal::Always,
            }
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sim.json");
        std::fs::write(&path, r#"{ "link": { "kind": "tcp", "addr": "0.0.0.0:9000" }, "seed": 7 }"#)
            .unwrap();

        let config: SimConfig = blelogger_core::config::load_json(&path).unwrap();
        assert_eq!(
            config.link,
            LinkConfig::Tcp {
                addr: "0.0.0.0:9000".into()
            }
        );
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.geometry, VolumeGeometry::default());
    }
}
