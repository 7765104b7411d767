//! Grouped view of a manifest's renditions, used for listing and prompting.

use serde::Serialize;

use crate::error::ParseError;
use crate::manifest::Manifest;
use crate::model::{DynamicRange, Rendition, RenditionKind};

/// Renditions sharing one distinguishing attribute, in manifest order.
#[derive(Debug, Clone, Serialize)]
pub struct RenditionGroup<'a, K> {
    pub key: K,
    pub renditions: Vec<&'a Rendition>,
}

/// Renditions grouped by kind, then by flavor (video) or language (audio,
/// subtitles). Groups keep the order in which their key first appears.
#[derive(Debug, Clone, Serialize)]
pub struct RenditionCatalog<'a> {
    pub video: Vec<RenditionGroup<'a, DynamicRange>>,
    pub audio: Vec<RenditionGroup<'a, String>>,
    pub subtitles: Vec<RenditionGroup<'a, String>>,
}

impl<'a> RenditionCatalog<'a> {
    /// Group the renditions of `manifest`. Video and audio are required;
    /// a manifest without subtitles is accepted.
    pub fn from_manifest(manifest: &'a Manifest) -> Result<Self, ParseError> {
        let mut video = Vec::new();
        let mut audio = Vec::new();
        let mut subtitles = Vec::new();

        for rendition in manifest.renditions() {
            match rendition.kind() {
                RenditionKind::Video => {
                    if let Some(track) = rendition.as_video() {
                        push_grouped(&mut video, track.dynamic_range, rendition);
                    }
                }
                RenditionKind::Audio => {
                    if let Some(lang) = rendition.language() {
                        push_grouped(&mut audio, lang.to_string(), rendition);
                    }
                }
                RenditionKind::Subtitle => {
                    if let Some(lang) = rendition.language() {
                        push_grouped(&mut subtitles, lang.to_string(), rendition);
                    }
                }
            }
        }

        if video.is_empty() {
            return Err(ParseError::MissingCategory(RenditionKind::Video));
        }
        if audio.is_empty() {
            return Err(ParseError::MissingCategory(RenditionKind::Audio));
        }

        Ok(Self {
            video,
            audio,
            subtitles,
        })
    }

    pub fn flavors(&self) -> impl Iterator<Item = DynamicRange> + '_ {
        self.video.iter().map(|g| g.key)
    }

    pub fn audio_languages(&self) -> impl Iterator<Item = &str> + '_ {
        self.audio.iter().map(|g| g.key.as_str())
    }

    pub fn subtitle_languages(&self) -> impl Iterator<Item = &str> + '_ {
        self.subtitles.iter().map(|g| g.key.as_str())
    }

    /// All video renditions in manifest order, regardless of flavor.
    pub fn videos(&self) -> Vec<&'a Rendition> {
        let mut all: Vec<&Rendition> = self
            .video
            .iter()
            .flat_map(|g| g.renditions.iter().copied())
            .collect();
        all.sort_by_key(|r| r.id);
        all
    }

    pub fn len(&self) -> usize {
        let video: usize = self.video.iter().map(|g| g.renditions.len()).sum();
        let audio: usize = self.audio.iter().map(|g| g.renditions.len()).sum();
        let subtitles: usize = self.subtitles.iter().map(|g| g.renditions.len()).sum();
        video + audio + subtitles
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn push_grouped<'a, K: PartialEq>(
    groups: &mut Vec<RenditionGroup<'a, K>>,
    key: K,
    rendition: &'a Rendition,
) {
    match groups.iter_mut().find(|g| g.key == key) {
        Some(group) => group.renditions.push(rendition),
        None => groups.push(RenditionGroup {
            key,
            renditions: vec![rendition],
        }),
    }
}

/// List the renditions of `manifest` grouped by kind and distinguishing
/// attribute.
pub fn list_renditions(manifest: &Manifest) -> Result<RenditionCatalog<'_>, ParseError> {
    RenditionCatalog::from_manifest(manifest)
}
