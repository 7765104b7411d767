//! # Selection configuration
//!
//! [`SelectionConfig`] is the single input the resolver understands. Prompts,
//! command-line flags and programmatic callers all build one through
//! [`SelectionConfigBuilder`].
//!
//! ```
//! use rendition::{AudioLayout, DynamicRange, SelectionConfig};
//!
//! let config = SelectionConfig::builder()
//!     .video_flavors([DynamicRange::DolbyVision, DynamicRange::Sdr])
//!     .audio_languages(["en", "fr"])
//!     .audio_layouts([AudioLayout::Stereo, AudioLayout::Atmos])
//!     .include_audio_description(true)
//!     .subtitle_languages(["en", "ja"])
//!     .download_dir("downloads/keynote")
//!     .build();
//!
//! assert_eq!(config.audio_languages, vec!["en", "fr"]);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::model::{AudioLayout, DynamicRange};

pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

/// Which video variants to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSelection {
    /// The best (highest bandwidth) variant of each flavor, in the given
    /// order. The first flavor becomes the main video track.
    Flavors(Vec<DynamicRange>),
    /// Explicit variant indexes as shown by the stream matrix. The first
    /// index becomes the main video track.
    Indexes(Vec<usize>),
}

impl VideoSelection {
    pub fn is_empty(&self) -> bool {
        match self {
            VideoSelection::Flavors(f) => f.is_empty(),
            VideoSelection::Indexes(i) => i.is_empty(),
        }
    }
}

impl Default for VideoSelection {
    fn default() -> Self {
        VideoSelection::Flavors(vec![DynamicRange::Sdr])
    }
}

/// Which subtitle renditions to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleSelection {
    All,
    /// Listed languages only; an empty list fetches no subtitles.
    Languages(Vec<String>),
}

impl SubtitleSelection {
    pub fn none() -> Self {
        SubtitleSelection::Languages(Vec::new())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SubtitleSelection::Languages(l) if l.is_empty())
    }
}

impl Default for SubtitleSelection {
    fn default() -> Self {
        SubtitleSelection::All
    }
}

impl FromStr for SubtitleSelection {
    type Err = String;

    /// `all`, `none`, or a comma separated list of language tags.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(SubtitleSelection::All);
        }
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(SubtitleSelection::none());
        }
        let languages = normalize_languages(s.split(','));
        if languages.is_empty() {
            return Err(format!("Invalid subtitle selection: '{s}'"));
        }
        Ok(SubtitleSelection::Languages(languages))
    }
}

impl fmt::Display for SubtitleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubtitleSelection::All => write!(f, "all"),
            SubtitleSelection::Languages(l) if l.is_empty() => write!(f, "none"),
            SubtitleSelection::Languages(l) => write!(f, "{}", l.join(",")),
        }
    }
}

/// The user's choices, decoupled from how they were collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionConfig {
    pub video: VideoSelection,
    /// Audio languages in priority order. The first one provides the
    /// default audio track.
    pub audio_languages: Vec<String>,
    /// Layouts fetched for every audio language.
    pub audio_layouts: Vec<AudioLayout>,
    /// Also fetch the audio description track of every audio language.
    pub include_audio_description: bool,
    pub subtitles: SubtitleSelection,
    /// Subtitle language flagged as default in the muxed file.
    pub default_subtitle_language: Option<String>,
    /// Directory the fetched renditions are written to.
    pub download_dir: PathBuf,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            video: VideoSelection::default(),
            audio_languages: vec!["en".to_string()],
            audio_layouts: vec![AudioLayout::Stereo],
            include_audio_description: false,
            subtitles: SubtitleSelection::default(),
            default_subtitle_language: None,
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
        }
    }
}

impl SelectionConfig {
    pub fn builder() -> SelectionConfigBuilder {
        SelectionConfigBuilder::new()
    }
}

/// Builder for [`SelectionConfig`]. `build` removes duplicate entries while
/// keeping the first occurrence, and falls back to stereo when no audio
/// layout was given.
#[derive(Debug, Clone, Default)]
pub struct SelectionConfigBuilder {
    config: SelectionConfig,
}

impl SelectionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video_flavors(mut self, flavors: impl IntoIterator<Item = DynamicRange>) -> Self {
        self.config.video = VideoSelection::Flavors(flavors.into_iter().collect());
        self
    }

    pub fn video_indexes(mut self, indexes: impl IntoIterator<Item = usize>) -> Self {
        self.config.video = VideoSelection::Indexes(indexes.into_iter().collect());
        self
    }

    pub fn video(mut self, video: VideoSelection) -> Self {
        self.config.video = video;
        self
    }

    pub fn audio_languages<S: Into<String>>(mut self, languages: impl IntoIterator<Item = S>) -> Self {
        self.config.audio_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn audio_layouts(mut self, layouts: impl IntoIterator<Item = AudioLayout>) -> Self {
        self.config.audio_layouts = layouts.into_iter().collect();
        self
    }

    pub fn include_audio_description(mut self, include: bool) -> Self {
        self.config.include_audio_description = include;
        self
    }

    pub fn subtitles(mut self, subtitles: SubtitleSelection) -> Self {
        self.config.subtitles = subtitles;
        self
    }

    pub fn subtitle_languages<S: Into<String>>(
        mut self,
        languages: impl IntoIterator<Item = S>,
    ) -> Self {
        self.config.subtitles =
            SubtitleSelection::Languages(languages.into_iter().map(Into::into).collect());
        self
    }

    pub fn all_subtitles(self) -> Self {
        self.subtitles(SubtitleSelection::All)
    }

    pub fn no_subtitles(self) -> Self {
        self.subtitles(SubtitleSelection::none())
    }

    pub fn default_subtitle_language(mut self, language: Option<impl Into<String>>) -> Self {
        self.config.default_subtitle_language = language.map(Into::into);
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = dir.into();
        self
    }

    pub fn build(self) -> SelectionConfig {
        let mut config = self.config;

        config.video = match config.video {
            VideoSelection::Flavors(f) => VideoSelection::Flavors(dedup(f)),
            VideoSelection::Indexes(i) => VideoSelection::Indexes(dedup(i)),
        };
        config.audio_languages = normalize_languages(config.audio_languages);
        config.audio_layouts = dedup(config.audio_layouts);
        if config.audio_layouts.is_empty() {
            config.audio_layouts.push(AudioLayout::Stereo);
        }
        if let SubtitleSelection::Languages(l) = config.subtitles {
            config.subtitles = SubtitleSelection::Languages(normalize_languages(l));
        }
        config.default_subtitle_language = config
            .default_subtitle_language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        config
    }
}

fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Trim, drop empty tags and remove case-insensitive duplicates.
fn normalize_languages<S: AsRef<str>>(languages: impl IntoIterator<Item = S>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for lang in languages {
        let lang = lang.as_ref().trim();
        if lang.is_empty() || out.iter().any(|l| l.eq_ignore_ascii_case(lang)) {
            continue;
        }
        out.push(lang.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_deduplicates() {
        let config = SelectionConfig::builder()
            .video_flavors([DynamicRange::Hdr10, DynamicRange::Sdr, DynamicRange::Hdr10])
            .audio_languages(["en", " EN ", "fr", ""])
            .audio_layouts(Vec::<AudioLayout>::new())
            .subtitle_languages(["ja", "ja"])
            .default_subtitle_language(Some("  "))
            .build();

        assert_eq!(
            config.video,
            VideoSelection::Flavors(vec![DynamicRange::Hdr10, DynamicRange::Sdr])
        );
        assert_eq!(config.audio_languages, vec!["en", "fr"]);
        assert_eq!(config.audio_layouts, vec![AudioLayout::Stereo]);
        assert_eq!(
            config.subtitles,
            SubtitleSelection::Languages(vec!["ja".to_string()])
        );
        assert_eq!(config.default_subtitle_language, None);
    }

    #[test]
    fn test_defaults() {
        let config = SelectionConfig::default();
        assert_eq!(config.video, VideoSelection::Flavors(vec![DynamicRange::Sdr]));
        assert_eq!(config.audio_languages, vec!["en"]);
        assert_eq!(config.subtitles, SubtitleSelection::All);
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn test_subtitle_selection_from_str() {
        assert_eq!("all".parse::<SubtitleSelection>(), Ok(SubtitleSelection::All));
        assert_eq!("none".parse::<SubtitleSelection>(), Ok(SubtitleSelection::none()));
        assert_eq!(
            "en, fr".parse::<SubtitleSelection>(),
            Ok(SubtitleSelection::Languages(vec![
                "en".to_string(),
                "fr".to_string()
            ]))
        );
        assert!(",,".parse::<SubtitleSelection>().is_err());
        assert_eq!(SubtitleSelection::none().to_string(), "none");
    }
}
