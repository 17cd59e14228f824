//! Application configuration
//!
//! Loaded from `<config dir>/remotepad/config.toml`. Every section falls back
//! to defaults, so a missing file or a partial one is fine.

use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::controller::{ControllerKind, ControllerSettings, StickCalibration};

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub listener: ListenerConfig,
    pub controller: ControllerConfig,
    pub host: HostConfig,
    pub console: ConsoleConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Largest datagram accepted, in bytes
    pub buffer_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 9081,
            buffer_size: 1024,
        }
    }
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub kind: ControllerKind,
    pub tap_duration_ms: u64,
    pub left_stick: StickCalibration,
    pub right_stick: StickCalibration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kind: ControllerKind::default(),
            tap_duration_ms: 100,
            left_stick: StickCalibration::default(),
            right_stick: StickCalibration::default(),
        }
    }
}

impl ControllerConfig {
    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            tap_duration: Duration::from_millis(self.tap_duration_ms),
            ..ControllerSettings::default()
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    /// `host:port` receiving the input reports; reports are only logged when unset
    pub target: Option<String>,
}

impl HostConfig {
    pub fn resolve_target(&self) -> Result<Option<SocketAddr>> {
        let Some(target) = &self.target else {
            return Ok(None);
        };
        let addr = target
            .to_socket_addrs()
            .wrap_err_with(|| format!("Invalid host target \"{}\"", target))?
            .next()
            .ok_or_else(|| eyre!("Host target \"{}\" did not resolve", target))?;
        Ok(Some(addr))
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("remotepad").join("config.toml"))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).wrap_err("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values serde accepts but the controller cannot use
    pub fn validate(&self) -> Result<()> {
        self.controller
            .left_stick
            .validate()
            .wrap_err("Invalid [controller.left_stick] calibration")?;
        self.controller
            .right_stick
            .validate()
            .wrap_err("Invalid [controller.right_stick] calibration")?;
        Ok(())
    }

    /// Reads the given file, or the default location when `path` is `None`
    ///
    /// An explicitly given file must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => {
                    debug!("No config directory on this platform, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() && !required {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [listener]
            port = 7000

            [controller]
            kind = "joycon_l"

            [controller.left_stick]
            h_center = 2000
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 7000);
        assert_eq!(config.listener.buffer_size, 1024);
        assert_eq!(config.controller.kind, ControllerKind::JoyconL);
        assert_eq!(config.controller.tap_duration_ms, 100);
        assert_eq!(config.controller.left_stick.h_center, 2000);
        assert_eq!(config.controller.left_stick.v_center, 0x800);
        assert!(!config.console.enabled);
        assert_eq!(config.host.target, None);
    }

    #[test]
    fn defaults_match_protocol() {
        let config = Config::default();
        assert_eq!(config.listener.socket_addr(), "0.0.0.0:9081".parse().unwrap());
        assert_eq!(
            config.controller.settings().tap_duration,
            Duration::from_millis(100)
        );
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[host]\ntarget = \"127.0.0.1:9082\"\n[console]\nenabled = true").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert!(config.console.enabled);
        assert_eq!(
            config.host.resolve_target().unwrap(),
            Some("127.0.0.1:9082".parse().unwrap())
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Config::from_toml("[controller]\nkind = \"gamecube\"").is_err());
        assert!(Config::from_toml("[listener]\nbind_address = \"nowhere\"").is_err());
    }

    #[test]
    fn out_of_range_calibration_is_rejected() {
        let err = Config::from_toml("[controller.left_stick]\nh_center = 5000").unwrap_err();
        assert!(format!("{:#}", err).contains("h_center must be below 4096, got 5000"));

        assert!(Config::from_toml("[controller.right_stick]\nv_center = 4096").is_err());
        assert!(Config::from_toml("[controller.right_stick]\nv_center = 4095").is_ok());
    }
}
