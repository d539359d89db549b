use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scan engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Base URL of the session backend
    pub backend_url: String,
    /// How long each body part stays active before it is marked scanned
    pub dwell_ms: u64,
    /// Pause between the operator confirming and the first part
    pub start_delay_ms: u64,
    /// Glow phase added after each rendered frame
    pub glow_increment: f32,
    /// Pixels added on every side of a part's bounding box
    pub box_margin_px: f32,
    /// Half width of the square sampled around the head for skin tone
    pub skin_sample_half_width: u32,
    /// Nominal capture resolution
    pub frame_width: u32,
    pub frame_height: u32,
    /// Frame height that corresponds to the reference body height
    pub reference_frame_height: f32,
    pub reference_height_cm: f32,
    /// Reject retained landmarks older than this at completion (None keeps any age)
    pub max_landmark_age_ms: Option<u64>,
    /// Minimum confidence passed to the landmark provider (0.0-1.0)
    pub min_detection_confidence: f32,
    /// Frames per second requested from the capture source
    pub target_fps: u32,
    /// Timeout for the backend request
    pub request_timeout_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".to_string(),
            dwell_ms: 1500,
            start_delay_ms: 3000,
            glow_increment: 0.2,
            box_margin_px: 15.0,
            skin_sample_half_width: 20,
            frame_width: 640,
            frame_height: 480,
            reference_frame_height: 480.0,
            reference_height_cm: 170.0,
            max_landmark_age_ms: None,
            min_detection_confidence: 0.5,
            target_fps: 30,
            request_timeout_secs: 10,
        }
    }
}

impl ScanConfig {
    /// Load configuration from the default location, creating it with defaults if missing
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`, creating it with defaults if missing
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ScanConfig = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.backend_url.trim().is_empty() {
            return Err("Backend URL cannot be empty".into());
        }
        if !(self.backend_url.starts_with("http://") || self.backend_url.starts_with("https://")) {
            return Err(format!(
                "Invalid backend URL: {}. Must start with http:// or https://",
                self.backend_url
            )
            .into());
        }

        if !(100..=60_000).contains(&self.dwell_ms) {
            return Err(format!(
                "Invalid dwell time: {} ms. Must be between 100 and 60000",
                self.dwell_ms
            )
            .into());
        }

        if self.start_delay_ms > 60_000 {
            return Err(format!(
                "Invalid start delay: {} ms. Must be at most 60000",
                self.start_delay_ms
            )
            .into());
        }

        if !(self.glow_increment > 0.0) {
            return Err(format!(
                "Invalid glow increment: {}. Must be positive",
                self.glow_increment
            )
            .into());
        }

        if !(0.0..=200.0).contains(&self.box_margin_px) {
            return Err(format!(
                "Invalid box margin: {}. Must be between 0 and 200 pixels",
                self.box_margin_px
            )
            .into());
        }

        if !(1..=200).contains(&self.skin_sample_half_width) {
            return Err(format!(
                "Invalid skin sample half width: {}. Must be between 1 and 200 pixels",
                self.skin_sample_half_width
            )
            .into());
        }

        for (name, value) in [("width", self.frame_width), ("height", self.frame_height)] {
            if value == 0 || value > 8192 {
                return Err(format!(
                    "Invalid frame {}: {}. Must be between 1 and 8192",
                    name, value
                )
                .into());
            }
        }

        if !(self.reference_frame_height > 0.0) || !(self.reference_height_cm > 0.0) {
            return Err("Reference frame height and body height must be positive".into());
        }

        if self.max_landmark_age_ms == Some(0) {
            return Err("Maximum landmark age must be positive when set".into());
        }

        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(format!(
                "Invalid detection confidence: {}. Must be between 0.0 and 1.0",
                self.min_detection_confidence
            )
            .into());
        }

        if self.target_fps == 0 || self.target_fps > 60 {
            return Err(format!(
                "Invalid target FPS: {}. Must be between 1 and 60",
                self.target_fps
            )
            .into());
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(format!(
                "Invalid request timeout: {}. Must be between 1 and 300 seconds",
                self.request_timeout_secs
            )
            .into());
        }

        Ok(())
    }

    /// Reset to default configuration
    pub fn reset() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn get_config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| "Could not determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".hautfit");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn get_test_config_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("hautfit_test_config_{}", name));
        path.push("settings.json");
        path
    }

    fn cleanup_test_config(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.dwell_ms, 1500);
        assert_eq!(config.glow_increment, 0.2);
        assert_eq!(config.box_margin_px, 15.0);
        assert_eq!(config.skin_sample_half_width, 20);
        assert_eq!(config.frame_width, 640);
        assert_eq!(config.frame_height, 480);
        assert_eq!(config.reference_height_cm, 170.0);
        assert_eq!(config.max_landmark_age_ms, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScanConfig::default();

        config.backend_url = "ftp://example".to_string();
        assert!(config.validate().is_err());
        config.backend_url = "https://example.org".to_string();
        assert!(config.validate().is_ok());

        config.dwell_ms = 0;
        assert!(config.validate().is_err());
        config.dwell_ms = 1500;

        config.glow_increment = 0.0;
        assert!(config.validate().is_err());
        config.glow_increment = 0.2;

        config.min_detection_confidence = 1.5;
        assert!(config.validate().is_err());
        config.min_detection_confidence = 0.5;

        config.max_landmark_age_ms = Some(0);
        assert!(config.validate().is_err());
        config.max_landmark_age_ms = Some(250);
        assert!(config.validate().is_ok());

        config.frame_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = ScanConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: ScanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ScanConfig = serde_json::from_str(r#"{"dwell_ms": 500}"#).unwrap();
        assert_eq!(config.dwell_ms, 500);
        assert_eq!(config.frame_height, 480);
    }

    #[test]
    fn test_load_creates_defaults() {
        let path = get_test_config_path("load");
        cleanup_test_config(&path);

        let config = ScanConfig::load_from(&path).unwrap();
        assert_eq!(config, ScanConfig::default());
        assert!(path.exists());

        let reloaded = ScanConfig::load_from(&path).unwrap();
        assert_eq!(reloaded, config);

        cleanup_test_config(&path);
    }

    #[test]
    fn test_save_rejects_invalid() {
        let path = get_test_config_path("invalid");
        cleanup_test_config(&path);

        let mut config = ScanConfig::default();
        config.target_fps = 0;
        assert!(config.save_to(&path).is_err());
        assert!(!path.exists());

        cleanup_test_config(&path);
    }
}
