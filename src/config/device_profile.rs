use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::client::attendance::models::ClientMeta;

pub const PLACEHOLDER_IP: &str = "0.0.0.0";

/// Client metadata sent with every punch, kept in a small JSON file so an
/// operator can fill in real values for the workstation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub device: String,
    pub ip: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        DeviceProfile {
            device: format!("punch_timer/{} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS),
            ip: PLACEHOLDER_IP.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            address: None,
        }
    }
}

impl DeviceProfile {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let profile = serde_json::from_str(&data)?;
        Ok(profile)
    }

    /// Reads the profile, writing the placeholder one first if the file does not exist yet.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }
        let profile = DeviceProfile::default();
        profile.save_to_file(path)?;
        Ok(profile)
    }

    /// True while IP and geolocation are still the unfilled placeholders.
    pub fn is_placeholder(&self) -> bool {
        self.ip == PLACEHOLDER_IP || (self.latitude == 0.0 && self.longitude == 0.0)
    }

    pub fn client_meta(&self) -> ClientMeta {
        ClientMeta {
            ip: self.ip.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            device: self.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_placeholder_when_missing() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("device_profile.json");

        let profile = DeviceProfile::load_or_create(&path).unwrap();

        assert!(path.exists());
        assert!(profile.is_placeholder());
        assert_eq!(DeviceProfile::from_file(&path).unwrap(), profile);
    }

    #[test]
    fn reads_operator_values() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("device_profile.json");
        fs::write(
            &path,
            r#"{"device":"front-desk","ip":"10.0.4.12","latitude":-5.185,"longitude":-80.594,"address":null}"#,
        )
        .unwrap();

        let profile = DeviceProfile::load_or_create(&path).unwrap();

        assert!(!profile.is_placeholder());
        let meta = profile.client_meta();
        assert_eq!(meta.device, "front-desk");
        assert_eq!(meta.ip, "10.0.4.12");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("device_profile.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(DeviceProfile::load_or_create(&path).is_err());
    }
}
