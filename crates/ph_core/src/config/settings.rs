//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level
//! updates.

use serde::{Deserialize, Serialize};

use crate::models::{DurationPolicy, LoudnessTarget, QualityPreset, TargetSpec};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Source selection settings.
    #[serde(default)]
    pub selection: SelectionSettings,

    /// Encode target settings.
    #[serde(default)]
    pub encoding: EncodingSettings,
}

/// Identifies a settings section for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Logging,
    Selection,
    Encoding,
}

impl ConfigSection {
    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Selection => "selection",
            ConfigSection::Encoding => "encoding",
        }
    }

    /// All known sections, in file order.
    pub fn all() -> &'static [ConfigSection] {
        &[
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Selection,
            ConfigSection::Encoding,
        ]
    }
}

/// Working directories for temp artifacts and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root folder under which each run creates its temporary directory.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format (filter progress lines, keep an error tail).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of encoder output lines kept for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: usize,

    /// Progress is logged only at these percent intervals in compact mode.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Prefix log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> usize {
    40
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_timestamps: true,
        }
    }
}

/// Source selection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Length of each extracted segment, seconds.
    #[serde(default = "default_clip_length")]
    pub clip_length_secs: f64,

    /// Seconds reserved at each end of a source, excluded from selection.
    #[serde(default = "default_edge_margin")]
    pub edge_margin_secs: f64,

    /// How many source clips a run aims for.
    #[serde(default = "default_clip_count")]
    pub clip_count: usize,
}

fn default_clip_length() -> f64 {
    60.0
}

fn default_edge_margin() -> f64 {
    10.0
}

fn default_clip_count() -> usize {
    60
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            clip_length_secs: default_clip_length(),
            edge_margin_secs: default_edge_margin(),
            clip_count: default_clip_count(),
        }
    }
}

impl SelectionSettings {
    /// The minimum-duration policy these settings imply.
    pub fn policy(&self) -> DurationPolicy {
        DurationPolicy {
            clip_length_secs: self.clip_length_secs,
            edge_margin_secs: self.edge_margin_secs,
        }
    }
}

/// Encode target configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingSettings {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Quality preset mapped to an x264 CRF/preset pair.
    #[serde(default)]
    pub quality: QualityPreset,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,

    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate_hz: u32,

    #[serde(default = "default_audio_channels")]
    pub audio_channels: u8,

    /// Loudness normalization target, LUFS.
    #[serde(default = "default_target_lufs")]
    pub target_lufs: f64,

    /// Target loudness range, LU.
    #[serde(default = "default_loudness_range")]
    pub loudness_range: f64,

    /// Maximum true peak, dBTP.
    #[serde(default = "default_true_peak")]
    pub true_peak_dbtp: f64,
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_fps() -> u32 {
    30
}

fn default_audio_bitrate() -> u32 {
    192
}

fn default_audio_sample_rate() -> u32 {
    48_000
}

fn default_audio_channels() -> u8 {
    2
}

fn default_target_lufs() -> f64 {
    -23.0
}

fn default_loudness_range() -> f64 {
    7.0
}

fn default_true_peak() -> f64 {
    -1.5
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            quality: QualityPreset::default(),
            audio_bitrate_kbps: default_audio_bitrate(),
            audio_sample_rate_hz: default_audio_sample_rate(),
            audio_channels: default_audio_channels(),
            target_lufs: default_target_lufs(),
            loudness_range: default_loudness_range(),
            true_peak_dbtp: default_true_peak(),
        }
    }
}

impl EncodingSettings {
    /// The uniform output spec these settings imply.
    pub fn target_spec(&self) -> TargetSpec {
        TargetSpec {
            width: self.width,
            height: self.height,
            fps: self.fps,
            crf: self.quality.crf(),
            preset: self.quality.x264_preset().to_string(),
            audio_bitrate_kbps: self.audio_bitrate_kbps,
            audio_sample_rate_hz: self.audio_sample_rate_hz,
            audio_channels: self.audio_channels,
        }
    }

    /// The loudness normalization target these settings imply.
    pub fn loudness_target(&self) -> LoudnessTarget {
        LoudnessTarget {
            integrated_lufs: self.target_lufs,
            loudness_range: self.loudness_range,
            true_peak_dbtp: self.true_peak_dbtp,
        }
    }
}
