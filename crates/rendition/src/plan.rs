use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::{Rendition, RenditionId, RenditionKind, Track};

/// Metadata attached to a fetched file when it is muxed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackLabel {
    pub name: String,
    /// Language tag; `None` for video, which takes the mux default.
    pub language: Option<String>,
    pub default: bool,
    pub visual_impaired: bool,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    pub rendition: Rendition,
    pub target: PathBuf,
    pub label: TrackLabel,
}

impl PlanEntry {
    pub fn new(rendition: &Rendition, download_dir: &Path, default: bool) -> Self {
        Self {
            target: download_dir.join(file_name(rendition)),
            label: label(rendition, default),
            rendition: rendition.clone(),
        }
    }

    pub fn kind(&self) -> RenditionKind {
        self.rendition.kind()
    }
}

/// File name a rendition is fetched to: `video_<n>.ts`,
/// `audio_<n>.<aac|eac3>` or `subtitle_<n>.vtt`, where `n` is the index of
/// the rendition in its source list.
pub fn file_name(rendition: &Rendition) -> String {
    let index = rendition.id.index;
    match &rendition.track {
        Track::Video(_) => format!("video_{index}.ts"),
        Track::Audio(a) => format!("audio_{index}.{}", a.codec.extension()),
        Track::Subtitle(_) => format!("subtitle_{index}.vtt"),
    }
}

fn label(rendition: &Rendition, default: bool) -> TrackLabel {
    match &rendition.track {
        Track::Video(v) => TrackLabel {
            name: match v.video_codec() {
                Some(codec) => format!("{} ({codec})", v.dynamic_range),
                None => v.dynamic_range.to_string(),
            },
            language: None,
            default,
            visual_impaired: false,
            forced: false,
        },
        Track::Audio(a) => {
            let mut name = rendition.name.clone();
            if a.codec == crate::model::AudioCodec::Eac3 {
                name.push_str(" (Dolby Atmos)");
            }
            TrackLabel {
                name,
                language: Some(a.language.clone()),
                default,
                visual_impaired: a.describes_video,
                forced: false,
            }
        }
        Track::Subtitle(s) => TrackLabel {
            name: rendition.name.clone(),
            language: Some(s.language.clone()),
            default,
            visual_impaired: false,
            forced: s.forced,
        },
    }
}

/// Ordered renditions to fetch: video first (main track leading), then
/// audio, then subtitles. Built by the resolver and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DownloadPlan {
    entries: Vec<PlanEntry>,
}

impl DownloadPlan {
    pub(crate) fn new(entries: Vec<PlanEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<RenditionId> {
        self.entries.iter().map(|e| e.rendition.id).collect()
    }

    pub fn of_kind(&self, kind: RenditionKind) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(move |e| e.kind() == kind)
    }

    pub fn main_video(&self) -> Option<&PlanEntry> {
        self.of_kind(RenditionKind::Video).next()
    }
}

impl<'a> IntoIterator for &'a DownloadPlan {
    type Item = &'a PlanEntry;
    type IntoIter = std::slice::Iter<'a, PlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
