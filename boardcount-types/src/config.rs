use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    640
}
fn default_line_height() -> u32 {
    130
}
fn default_detect_conf() -> f64 {
    0.45
}
fn default_detect_iou() -> f64 {
    0.01
}
fn default_true() -> bool {
    true
}
fn default_min_detection_square() -> f64 {
    0.0
}
fn default_max_bbox_sides_relation() -> f64 {
    f64::INFINITY
}
fn default_cls_threshold() -> f64 {
    0.25
}
fn default_cls_mode() -> String {
    "torch".to_string()
}
fn default_tracker_max_age() -> u32 {
    60
}
fn default_tracker_min_hits() -> u32 {
    1
}
fn default_tracker_iou() -> f64 {
    0.02
}
fn default_num_frames_to_average() -> usize {
    5
}
fn default_min_frames_to_count() -> u64 {
    500
}
fn default_max_tracked_objects() -> usize {
    100
}
fn default_patience() -> u64 {
    120
}
fn default_fourcc() -> String {
    "mp4v".to_string()
}
fn default_fps() -> u32 {
    30
}
fn default_stop_hour() -> u32 {
    2
}
fn default_out_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("/tmp")
}

/// If `path` is non-empty and relative, expand shell variables (`~`, `$A`,
/// `${B}`) in it and resolve it against `dirname`. Grounded on
/// `braid-config-data::fixup_relative_path`. Empty paths (an unset
/// `detect_weights`/`cls_weights`, caught by `validate`) are left alone.
fn fixup_relative_path(path: &mut std::path::PathBuf, dirname: &std::path::Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    let pathstr = path.to_string_lossy();
    let expanded = shellexpand::full(&pathstr)?;
    *path = std::path::PathBuf::from(expanded.to_string());
    if path.is_relative() {
        *path = dirname.join(&path);
    }
    Ok(())
}

/// Detector model handle and thresholding knobs, deserialized from the
/// `detect_*` fields of a session configuration file.
///
/// No `#[serde(deny_unknown_fields)]` here: this struct is only ever
/// deserialized through `#[serde(flatten)]` on [`SessionConfig`], and serde
/// does not support combining `flatten` with `deny_unknown_fields` — the
/// flattened fields are collected through a map that has already filtered
/// down to this struct's own keys, so the attribute would never fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Path to the person-detector model weights.
    pub detect_weights: std::path::PathBuf,
    #[serde(default = "default_detect_conf")]
    pub detect_conf: f64,
    #[serde(default = "default_detect_iou")]
    pub detect_iou: f64,
    #[serde(default = "default_true")]
    pub detect_half: bool,
    #[serde(default = "default_min_detection_square")]
    pub min_detection_square: f64,
    #[serde(default = "default_max_bbox_sides_relation")]
    pub max_bbox_sides_relation: f64,
}

/// Door classifier model handle and thresholding knobs.
///
/// No `#[serde(deny_unknown_fields)]`, for the same reason as
/// [`DetectorConfig`]: it is only reached via `#[serde(flatten)]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Path to the door classifier model weights.
    pub cls_weights: std::path::PathBuf,
    #[serde(default = "default_cls_threshold")]
    pub cls_threshold: f64,
    #[serde(default = "default_true")]
    pub cls_half: bool,
    #[serde(default = "default_cls_mode")]
    pub cls_mode: String,
    /// `(width, height)` of the classifier input tensor.
    pub cls_shape: (u32, u32),
}

/// Multi-object tracker knobs plus the event-classification parameters of
/// spec.md §4.5.
///
/// No `#[serde(deny_unknown_fields)]`, for the same reason as
/// [`DetectorConfig`]: it is only reached via `#[serde(flatten)]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_max_age")]
    pub tracker_max_age: u32,
    #[serde(default = "default_tracker_min_hits")]
    pub tracker_min_hits: u32,
    #[serde(default = "default_tracker_iou")]
    pub tracker_iou: f64,
    #[serde(default = "default_num_frames_to_average")]
    pub num_frames_to_average: usize,
    #[serde(default = "default_min_frames_to_count")]
    pub min_frames_to_count: u64,
    #[serde(default = "default_max_tracked_objects")]
    pub max_tracked_objects: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracker_max_age: default_tracker_max_age(),
            tracker_min_hits: default_tracker_min_hits(),
            tracker_iou: default_tracker_iou(),
            num_frames_to_average: default_num_frames_to_average(),
            min_frames_to_count: default_min_frames_to_count(),
            max_tracked_objects: default_max_tracked_objects(),
        }
    }
}

/// A single session's complete configuration, as loaded from a TOML file.
///
/// Mirrors the options table of spec.md §6. Validation (missing model
/// weights, mismatched `streams`/`n_cameras` length) happens in
/// [`SessionConfig::validate`], which a caller must invoke before starting
/// a [`Session`](boardcount-core) — per spec.md §6, these are the only
/// conditions that produce a non-zero exit code before workers start.
///
/// No `#[serde(deny_unknown_fields)]`: this struct flattens
/// [`DetectorConfig`]/[`ClassifierConfig`]/[`TrackerConfig`] into the same
/// flat TOML table spec.md §6 documents, and serde does not support
/// `deny_unknown_fields` together with `flatten` (the flattened fields are
/// pulled from a map already narrowed to each sub-struct's own keys, so the
/// attribute here would never see an unmatched one either). A typo'd key is
/// therefore silently ignored rather than rejected; tightening this would
/// mean nesting the sub-configs as named tables instead of flattening them,
/// which would break the single flat option table spec.md §6 specifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub bus_id: String,
    pub route_id: String,
    pub n_cameras: usize,
    pub streams: Vec<String>,

    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_line_height")]
    pub line_height: u32,

    #[serde(flatten)]
    pub detector: DetectorConfig,
    #[serde(flatten)]
    pub classifier: ClassifierConfig,
    #[serde(flatten)]
    pub tracker: TrackerConfig,

    #[serde(default = "default_patience")]
    pub patience: u64,

    #[serde(default = "default_fourcc")]
    pub fourcc: String,
    #[serde(default = "default_fps")]
    pub fps: u32,

    #[serde(default = "default_stop_hour")]
    pub stop_hour: u32,

    #[serde(default = "default_out_dir")]
    pub logs_dir: std::path::PathBuf,
    #[serde(default = "default_out_dir")]
    pub out_video_dir: std::path::PathBuf,

    /// Credential for the geolocation provider. Falls back to the
    /// `GPS_API_KEY` environment variable when absent, matching
    /// `original_source/managers/session.py`.
    #[serde(default)]
    pub gps_api_key: Option<String>,
}

impl SessionConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: SessionConfig = toml::from_str(s)?;
        Ok(cfg)
    }

    /// Load from a config file, then expand shell variables (`~`, `$A`,
    /// `${B}`) in every path field and resolve relative paths against the
    /// config file's own directory, matching
    /// `braid-config-data`'s `fixup_relative_path` so a session can be
    /// launched from any working directory.
    pub fn from_toml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut cfg = Self::from_toml_str(&contents)?;

        let dirname = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        fixup_relative_path(&mut cfg.detector.detect_weights, dirname)?;
        fixup_relative_path(&mut cfg.classifier.cls_weights, dirname)?;
        fixup_relative_path(&mut cfg.logs_dir, dirname)?;
        fixup_relative_path(&mut cfg.out_video_dir, dirname)?;

        Ok(cfg)
    }

    /// Resolve `gps_api_key` from the `GPS_API_KEY` environment variable
    /// when the configuration file did not set one.
    pub fn resolve_gps_api_key(&mut self) {
        if self.gps_api_key.is_none() {
            self.gps_api_key = std::env::var("GPS_API_KEY").ok();
        }
    }

    /// Validate the two fatal pre-start conditions of spec.md §6: missing
    /// model weight paths and a `streams` length mismatch.
    pub fn validate(&self) -> Result<()> {
        if self.detector.detect_weights.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "detect_weights must be set".to_string(),
            ));
        }
        if self.classifier.cls_weights.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("cls_weights must be set".to_string()));
        }
        if self.streams.len() != self.n_cameras {
            return Err(Error::InvalidConfig(format!(
                "provided {} streams for {} cameras",
                self.streams.len(),
                self.n_cameras
            )));
        }
        Ok(())
    }

    /// `session_id` as `YYYY-MM-DD_bus_route`, derived at construction
    /// time from the current date.
    pub fn session_id(&self, today: chrono::NaiveDate) -> String {
        format!("{}_{}_{}", today, self.bus_id, self.route_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
        bus_id = "081433"
        route_id = "304A"
        n_cameras = 2
        streams = ["cam1.mp4", "cam2.mp4"]
        detect_weights = "model.pt"
        cls_weights = "cls.pt"
        cls_shape = [128, 64]
        "#
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let cfg = SessionConfig::from_toml_str(minimal_toml()).unwrap();
        assert_eq!(cfg.width, 640);
        assert_eq!(cfg.height, 640);
        assert_eq!(cfg.line_height, 130);
        assert_eq!(cfg.tracker.min_frames_to_count, 500);
        assert_eq!(cfg.stop_hour, 2);
        assert_eq!(cfg.logs_dir, std::path::PathBuf::from("/tmp"));
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_stream_count_mismatch() {
        let mut cfg = SessionConfig::from_toml_str(minimal_toml()).unwrap();
        cfg.n_cameras = 3;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn gps_api_key_falls_back_to_env() {
        std::env::set_var("GPS_API_KEY", "test-key-123");
        let mut cfg = SessionConfig::from_toml_str(minimal_toml()).unwrap();
        assert!(cfg.gps_api_key.is_none());
        cfg.resolve_gps_api_key();
        assert_eq!(cfg.gps_api_key.as_deref(), Some("test-key-123"));
        std::env::remove_var("GPS_API_KEY");
    }

    /// `from_toml_file` resolves relative path fields against the config
    /// file's own directory, matching `braid-config-data`'s
    /// `fixup_relative_path` so a session can be launched from anywhere.
    #[test]
    fn from_toml_file_resolves_relative_paths_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("session.toml");
        std::fs::write(&config_path, minimal_toml()).unwrap();

        let cfg = SessionConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(cfg.detector.detect_weights, dir.path().join("model.pt"));
        assert_eq!(cfg.classifier.cls_weights, dir.path().join("cls.pt"));
        // logs_dir/out_video_dir default to the absolute "/tmp" and are
        // left untouched by the relative-path fixup.
        assert_eq!(cfg.logs_dir, std::path::PathBuf::from("/tmp"));
    }
}
