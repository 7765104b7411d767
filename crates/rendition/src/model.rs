//! Normalized rendition types.
//!
//! A [`Rendition`] is one selectable track of a master playlist: a video
//! variant (`#EXT-X-STREAM-INF`) or an audio / subtitle alternative
//! (`#EXT-X-MEDIA`). Kind-specific attributes live in [`Track`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenditionKind {
    Video,
    Audio,
    Subtitle,
}

impl fmt::Display for RenditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenditionKind::Video => write!(f, "video"),
            RenditionKind::Audio => write!(f, "audio"),
            RenditionKind::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// Dynamic range flavor of a video variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum DynamicRange {
    Sdr,
    Hdr10,
    DolbyVision,
}

impl DynamicRange {
    pub const ALL: [DynamicRange; 3] = [
        DynamicRange::Sdr,
        DynamicRange::Hdr10,
        DynamicRange::DolbyVision,
    ];

    /// Derive the flavor from the `VIDEO-RANGE` attribute and the `CODECS` list.
    ///
    /// Dolby Vision is only recognizable from the codec (`dvh1` / `dvhe` /
    /// `dva1` / `dvav`); both `PQ` and `HLG` map to HDR10 otherwise. A
    /// missing `VIDEO-RANGE` means SDR.
    pub fn detect(video_range: Option<&str>, codecs: &str) -> Self {
        let dolby = codecs
            .split(',')
            .map(str::trim)
            .any(|c| ["dvh1", "dvhe", "dva1", "dvav"].iter().any(|p| c.starts_with(p)));
        if dolby {
            return DynamicRange::DolbyVision;
        }
        match video_range.map(str::to_ascii_uppercase).as_deref() {
            Some("PQ") | Some("HLG") => DynamicRange::Hdr10,
            _ => DynamicRange::Sdr,
        }
    }
}

impl fmt::Display for DynamicRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicRange::Sdr => write!(f, "SDR"),
            DynamicRange::Hdr10 => write!(f, "HDR10"),
            DynamicRange::DolbyVision => write!(f, "Dolby Vision"),
        }
    }
}

impl FromStr for DynamicRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "sdr" => Ok(DynamicRange::Sdr),
            "hdr" | "hdr10" | "pq" => Ok(DynamicRange::Hdr10),
            "dv" | "dovi" | "dolby-vision" | "dolbyvision" => Ok(DynamicRange::DolbyVision),
            other => Err(format!("Unknown dynamic range: {other}")),
        }
    }
}

/// Channel layout of an audio rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum AudioLayout {
    Mono,
    Stereo,
    Surround,
    Atmos,
}

impl AudioLayout {
    /// Derive the layout from the `CHANNELS` attribute, falling back to
    /// hints in the `GROUP-ID` (`audio-stereo-160`, `audio-atmos`).
    pub fn detect(channels: Option<&str>, group_id: &str) -> Self {
        if let Some(channels) = channels {
            let mut parts = channels.split('/');
            let count = parts.next().and_then(|c| c.trim().parse::<u32>().ok());
            if parts.any(|p| p.eq_ignore_ascii_case("JOC")) {
                return AudioLayout::Atmos;
            }
            match count {
                Some(1) => return AudioLayout::Mono,
                Some(2) => return AudioLayout::Stereo,
                Some(n) if n > 2 => return AudioLayout::Surround,
                _ => {}
            }
        }

        let group = group_id.to_ascii_lowercase();
        if group.contains("atmos") {
            AudioLayout::Atmos
        } else if group.contains("mono") {
            AudioLayout::Mono
        } else if group.contains("5.1") || group.contains("surround") || group.contains("multi") {
            AudioLayout::Surround
        } else {
            AudioLayout::Stereo
        }
    }
}

impl fmt::Display for AudioLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioLayout::Mono => write!(f, "mono"),
            AudioLayout::Stereo => write!(f, "stereo"),
            AudioLayout::Surround => write!(f, "surround"),
            AudioLayout::Atmos => write!(f, "atmos"),
        }
    }
}

impl FromStr for AudioLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mono" => Ok(AudioLayout::Mono),
            "stereo" => Ok(AudioLayout::Stereo),
            "surround" | "5.1" | "multichannel" => Ok(AudioLayout::Surround),
            "atmos" | "joc" => Ok(AudioLayout::Atmos),
            other => Err(format!("Unknown audio layout: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Eac3,
}

impl AudioCodec {
    /// Guess the codec from the `GROUP-ID`, e.g. `audio-stereo-aac-160` or
    /// `audio-eac3-atmos`.
    pub fn from_group_id(group_id: &str) -> Option<Self> {
        let group = group_id.to_ascii_lowercase();
        if group.contains("eac3") || group.contains("ec3") || group.contains("atmos") {
            Some(AudioCodec::Eac3)
        } else if group.contains("aac") {
            Some(AudioCodec::Aac)
        } else {
            None
        }
    }

    /// Guess the codec from a variant `CODECS` list referencing the group.
    pub fn from_codecs(codecs: &str) -> Option<Self> {
        let codecs = codecs.to_ascii_lowercase();
        if codecs.contains("ec-3") || codecs.contains("ec+3") {
            Some(AudioCodec::Eac3)
        } else if codecs.contains("mp4a") {
            Some(AudioCodec::Aac)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Eac3 => "eac3",
        }
    }
}

/// Stable identity of a rendition within one manifest.
///
/// `index` is the position in the source list the rendition came from:
/// the variant list (I-frame playlists excluded) for video, the
/// `#EXT-X-MEDIA` list for audio and subtitles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenditionId {
    pub kind: RenditionKind,
    pub index: usize,
}

impl fmt::Display for RenditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoTrack {
    pub bandwidth: u64,
    pub average_bandwidth: Option<u64>,
    pub codecs: String,
    pub resolution: Option<(u64, u64)>,
    pub frame_rate: Option<f64>,
    pub dynamic_range: DynamicRange,
    /// Raw `VIDEO-RANGE` attribute as written in the manifest.
    pub video_range: Option<String>,
    pub hdcp_level: Option<String>,
    pub audio_group: Option<String>,
    pub subtitle_group: Option<String>,
    pub closed_captions: Option<String>,
}

impl VideoTrack {
    /// First entry of the `CODECS` list, which is the video codec in
    /// Apple's manifests.
    pub fn video_codec(&self) -> Option<&str> {
        self.codecs
            .split(',')
            .map(str::trim)
            .find(|c| !c.is_empty())
    }

    pub fn resolution_label(&self) -> Option<String> {
        self.resolution.map(|(w, h)| format!("{w}x{h}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioTrack {
    pub language: String,
    pub layout: AudioLayout,
    pub codec: AudioCodec,
    pub channels: Option<String>,
    /// `CHARACTERISTICS` contains `public.accessibility.describes-video`.
    pub describes_video: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleTrack {
    pub language: String,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Track {
    Video(VideoTrack),
    Audio(AudioTrack),
    Subtitle(SubtitleTrack),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendition {
    pub id: RenditionId,
    /// Media playlist URI, absolute when the manifest had a base URL.
    pub uri: String,
    /// Track-group identifier: `GROUP-ID` for media, the `VIDEO` group or
    /// `STABLE-VARIANT-ID` for variants.
    pub group_id: String,
    pub name: String,
    /// `DEFAULT=YES` in the manifest.
    pub manifest_default: bool,
    pub track: Track,
}

impl Rendition {
    pub fn kind(&self) -> RenditionKind {
        self.id.kind
    }

    pub fn language(&self) -> Option<&str> {
        match &self.track {
            Track::Video(_) => None,
            Track::Audio(a) => Some(&a.language),
            Track::Subtitle(s) => Some(&s.language),
        }
    }

    pub fn as_video(&self) -> Option<&VideoTrack> {
        match &self.track {
            Track::Video(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioTrack> {
        match &self.track {
            Track::Audio(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_subtitle(&self) -> Option<&SubtitleTrack> {
        match &self.track {
            Track::Subtitle(s) => Some(s),
            _ => None,
        }
    }

    /// Short human readable description, used by prompts and logs.
    pub fn describe(&self) -> String {
        match &self.track {
            Track::Video(v) => {
                let mut s = format!("{} {}", v.dynamic_range, v.codecs);
                if let Some(res) = v.resolution_label() {
                    s.push_str(&format!(" {res}"));
                }
                s.push_str(&format!(" @ {} kbps", v.bandwidth / 1000));
                s
            }
            Track::Audio(a) => {
                let mut s = format!("{} [{}] {} {}", self.name, a.language, a.layout, self.group_id);
                if a.describes_video {
                    s.push_str(" (AD)");
                }
                s
            }
            Track::Subtitle(t) => {
                let mut s = format!("{} [{}]", self.name, t.language);
                if t.forced {
                    s.push_str(" (forced)");
                }
                s
            }
        }
    }
}

/// Compare BCP-47 tags the way a user means them: case-insensitively, and a
/// bare primary tag (`en`) also matches regional tags (`en-GB`).
pub fn language_matches(requested: &str, actual: &str) -> bool {
    if requested.eq_ignore_ascii_case(actual) {
        return true;
    }
    if requested.contains('-') {
        return false;
    }
    actual
        .split(['-', '_'])
        .next()
        .is_some_and(|primary| primary.eq_ignore_ascii_case(requested))
}
