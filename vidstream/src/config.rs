/*!
    Pipeline configuration and its on-disk form.
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StreamError, StreamResult};

pub const DEFAULT_MAX_VIDEO_FRAMES: usize = 30;
pub const DEFAULT_MAX_AUDIO_FRAMES: usize = 100;
pub const DEFAULT_MAX_VIDEO_PACKETS: usize = 50;
pub const DEFAULT_MAX_AUDIO_PACKETS: usize = 200;

/**
    What the demux stage does with a packet whose queue is full.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Discard the packet and keep reading.
    #[default]
    Drop,
    /// Hold the packet until its queue has room; reading pauses meanwhile.
    Backpressure,
}

/**
    Per-session logging settings.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Prefix put in front of every log line of the session.
    pub label: String,
    /// Log every packet and frame at trace level.
    pub trace_items: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            label: "vidstream".to_string(),
            trace_items: false,
        }
    }
}

/**
    Configuration of one stream session.

    Durations are stored as milliseconds in the JSON form.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub max_video_frames: usize,
    pub max_audio_frames: usize,
    pub max_video_packets: usize,
    pub max_audio_packets: usize,
    /// Longest a pull accessor waits for a frame.
    #[serde(with = "millis", rename = "pull_timeout_ms")]
    pub pull_timeout: Duration,
    /// Longest a decode stage waits for a packet before rechecking its flags.
    #[serde(with = "millis", rename = "pop_timeout_ms")]
    pub pop_timeout: Duration,
    /// Idle time of a stage whose output queue is full.
    #[serde(with = "millis", rename = "backoff_ms")]
    pub backoff: Duration,
    /// How long `stop` waits for each stage before reporting it as stuck.
    #[serde(with = "millis", rename = "join_timeout_ms")]
    pub join_timeout: Duration,
    pub overflow: OverflowPolicy,
    /// Codec worker threads for the FFmpeg backend, zero for automatic.
    pub decoder_threads: u16,
    pub log: LogConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_video_frames: DEFAULT_MAX_VIDEO_FRAMES,
            max_audio_frames: DEFAULT_MAX_AUDIO_FRAMES,
            max_video_packets: DEFAULT_MAX_VIDEO_PACKETS,
            max_audio_packets: DEFAULT_MAX_AUDIO_PACKETS,
            pull_timeout: Duration::from_millis(2),
            pop_timeout: Duration::from_millis(100),
            backoff: Duration::from_millis(10),
            join_timeout: Duration::from_secs(3),
            overflow: OverflowPolicy::Drop,
            decoder_threads: 0,
            log: LogConfig::default(),
        }
    }
}

impl StreamConfig {
    /**
        Check that every queue can hold at least one item.
    */
    pub fn validate(&self) -> StreamResult<()> {
        let capacities = [
            ("max_video_frames", self.max_video_frames),
            ("max_audio_frames", self.max_audio_frames),
            ("max_video_packets", self.max_video_packets),
            ("max_audio_packets", self.max_audio_packets),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(StreamError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }

    /**
        Default location of the config file.
    */
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("vidstream").join("config.json"))
    }

    /**
        Load and validate a config file.
    */
    pub fn load(path: impl AsRef<Path>) -> StreamResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| StreamError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| StreamError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /**
        Load the config from [`StreamConfig::default_path`], falling back to
        defaults when there is no such file.
    */
    pub fn load_or_default() -> StreamResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /**
        Save the config as pretty-printed JSON, creating parent directories.
    */
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().try_into().unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_capacities() {
        let config = StreamConfig::default();
        assert_eq!(config.max_video_frames, 30);
        assert_eq!(config.max_audio_frames, 100);
        assert_eq!(config.max_video_packets, 50);
        assert_eq!(config.max_audio_packets, 200);
        assert_eq!(config.overflow, OverflowPolicy::Drop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = StreamConfig {
            max_audio_packets: 0,
            ..StreamConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_audio_packets"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: StreamConfig = serde_json::from_str(
            r#"{ "max_video_frames": 2, "backoff_ms": 5, "overflow": "backpressure" }"#,
        )
        .unwrap();
        assert_eq!(config.max_video_frames, 2);
        assert_eq!(config.backoff, Duration::from_millis(5));
        assert_eq!(config.overflow, OverflowPolicy::Backpressure);
        assert_eq!(config.max_audio_frames, DEFAULT_MAX_AUDIO_FRAMES);
        assert_eq!(config.log.label, "vidstream");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = StreamConfig {
            max_video_frames: 4,
            join_timeout: Duration::from_millis(1500),
            log: LogConfig {
                label: "cam1".into(),
                trace_items: true,
            },
            ..StreamConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(StreamConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            StreamConfig::load(&path),
            Err(StreamError::Config(_))
        ));
    }
}
