use anyhow::{Context, Result};
use rendition::{AudioLayout, DynamicRange, SelectionConfigBuilder, SubtitleSelection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "evdl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory renditions are fetched to
    pub download_dir: PathBuf,

    /// Video flavors fetched when none are given
    pub video_flavors: Vec<DynamicRange>,

    /// Audio languages in priority order
    pub audio_languages: Vec<String>,

    /// Audio layouts fetched for every language
    pub audio_layouts: Vec<AudioLayout>,

    /// Fetch audio description tracks by default
    pub include_audio_description: bool,

    /// Subtitle selection: "all", "none" or comma separated languages
    pub subtitles: String,

    /// Subtitle language flagged as default in the muxed file
    pub default_subtitle_language: Option<String>,

    /// Muxed output file
    pub mux_output: PathBuf,

    /// ffmpeg executable, looked up on PATH when unset
    pub ffmpeg_path: Option<PathBuf>,

    /// mkvmerge executable, looked up on PATH when unset
    pub mkvmerge_path: Option<PathBuf>,

    /// Maximum concurrent fetches
    pub max_concurrent: usize,

    /// Default request timeout in seconds
    pub default_timeout: u64,

    /// Default number of retries
    pub default_retries: u32,

    /// User agent string for requests
    pub user_agent: Option<String>,

    /// Enable colored output
    pub colored_output: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(rendition::selection::DEFAULT_DOWNLOAD_DIR),
            video_flavors: vec![DynamicRange::Sdr],
            audio_languages: vec!["en".to_string()],
            audio_layouts: vec![AudioLayout::Stereo],
            include_audio_description: false,
            subtitles: "all".to_string(),
            default_subtitle_language: None,
            mux_output: PathBuf::from("output.mkv"),
            ffmpeg_path: None,
            mkvmerge_path: None,
            max_concurrent: 4,
            default_timeout: 30,
            default_retries: 3,
            user_agent: Some("AppleCoreMedia/1.0.0.21E230 (Macintosh; U; Intel Mac OS X 14_4; en_us)".to_string()),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => confy::load(APP_NAME, None).context("Failed to load configuration"),
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Reset configuration to defaults and save
    pub fn reset(config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;

        Self::default().save(&path)
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }

    /// Parsed form of [`AppConfig::subtitles`].
    pub fn subtitle_selection(&self) -> Result<SubtitleSelection> {
        self.subtitles
            .parse()
            .map_err(anyhow::Error::msg)
            .context("Invalid `subtitles` value in configuration")
    }

    /// Selection builder pre-filled with the configured defaults.
    pub fn selection_defaults(&self) -> Result<SelectionConfigBuilder> {
        Ok(rendition::SelectionConfig::builder()
            .video_flavors(self.video_flavors.iter().copied())
            .audio_languages(self.audio_languages.iter().cloned())
            .audio_layouts(self.audio_layouts.iter().copied())
            .include_audio_description(self.include_audio_description)
            .subtitles(self.subtitle_selection()?)
            .default_subtitle_language(self.default_subtitle_language.clone())
            .download_dir(self.download_dir.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("evdl.toml");

        let mut config = AppConfig::default();
        config.audio_languages = vec!["fr".to_string(), "en".to_string()];
        config.video_flavors = vec![DynamicRange::DolbyVision];
        config.save(&path).unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evdl.toml");
        std::fs::write(
            &path,
            "audio_layouts = [\"atmos\"]\nvideo_flavors = [\"hdr10\", \"dolby-vision\"]\n",
        )
        .unwrap();

        let loaded = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.audio_layouts, vec![AudioLayout::Atmos]);
        assert_eq!(
            loaded.video_flavors,
            vec![DynamicRange::Hdr10, DynamicRange::DolbyVision]
        );
        assert_eq!(loaded.max_concurrent, 4);
    }

    #[test]
    fn test_invalid_subtitles_value() {
        let config = AppConfig {
            subtitles: ",".to_string(),
            ..AppConfig::default()
        };
        assert!(config.selection_defaults().is_err());
    }
}
