//! Maps a [`SelectionConfig`] onto a [`Manifest`].
//!
//! Resolution is all-or-nothing: the first requested combination that has
//! no matching rendition aborts with a [`SelectionError`] naming it, and no
//! plan is produced.
//!
//! Languages are looked up in two passes over the whole manifest: an exact
//! (case-insensitive) tag match wins, and only when there is none does a
//! bare primary tag (`fr`) match a regional one (`fr-CA`). Two requested
//! languages landing on the same rendition is an error rather than a
//! shorter plan.
//!
//! When several renditions match one request the first in manifest order is
//! used and the rest are ignored. For video flavors the highest bandwidth
//! variant wins, with equal bandwidths again falling back to manifest order.

use std::collections::HashMap;

use tracing::debug;

use crate::error::SelectionError;
use crate::manifest::Manifest;
use crate::model::{
    AudioTrack, DynamicRange, Rendition, RenditionId, RenditionKind, language_matches,
};
use crate::plan::{DownloadPlan, PlanEntry};
use crate::selection::{SelectionConfig, SubtitleSelection, VideoSelection};

pub struct Resolver<'a> {
    manifest: &'a Manifest,
}

impl<'a> Resolver<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        Self { manifest }
    }

    pub fn resolve(&self, config: &SelectionConfig) -> Result<DownloadPlan, SelectionError> {
        let video = self.select_video(&config.video)?;
        let audio = self.select_audio(config)?;
        let subtitles = self.select_subtitles(&config.subtitles)?;

        if video.is_empty() && audio.is_empty() && subtitles.is_empty() {
            return Err(SelectionError::NothingSelected);
        }

        let mut entries = Vec::with_capacity(video.len() + audio.len() + subtitles.len());
        let dir = config.download_dir.as_path();

        for (i, rendition) in video.into_iter().enumerate() {
            entries.push(PlanEntry::new(rendition, dir, i == 0));
        }

        // only the leading audio rendition is default, which is always a
        // regular (non description) track of the first requested language
        for (i, rendition) in audio.into_iter().enumerate() {
            entries.push(PlanEntry::new(rendition, dir, i == 0));
        }

        let default_subtitle = config
            .default_subtitle_language
            .as_deref()
            .and_then(|language| {
                let regular: Vec<&Rendition> = subtitles
                    .iter()
                    .copied()
                    .filter(|r| r.as_subtitle().is_some_and(|s| !s.forced))
                    .collect();
                by_language(&regular, language)
            })
            .map(|r| r.id);

        for rendition in subtitles {
            let default = default_subtitle == Some(rendition.id);
            entries.push(PlanEntry::new(rendition, dir, default));
        }

        debug!(entries = entries.len(), "Resolved download plan");
        Ok(DownloadPlan::new(entries))
    }

    fn select_video(&self, selection: &VideoSelection) -> Result<Vec<&'a Rendition>, SelectionError> {
        match selection {
            VideoSelection::Flavors(flavors) => flavors
                .iter()
                .map(|&flavor| {
                    self.best_video(flavor)
                        .ok_or(SelectionError::MissingVideo { flavor })
                })
                .collect(),
            VideoSelection::Indexes(indexes) => indexes
                .iter()
                .map(|&index| {
                    self.manifest
                        .get(RenditionId {
                            kind: RenditionKind::Video,
                            index,
                        })
                        .ok_or_else(|| SelectionError::UnknownVideoIndex {
                            index,
                            valid: self
                                .manifest
                                .iter_kind(RenditionKind::Video)
                                .map(|r| r.id.index)
                                .collect(),
                        })
                })
                .collect(),
        }
    }

    fn best_video(&self, flavor: DynamicRange) -> Option<&'a Rendition> {
        let mut best: Option<(&Rendition, u64)> = None;
        for rendition in self.manifest.iter_kind(RenditionKind::Video) {
            let Some(video) = rendition.as_video() else {
                continue;
            };
            if video.dynamic_range != flavor {
                continue;
            }
            // strictly greater, so equal bandwidths keep the earlier variant
            if best.is_none_or(|(_, bw)| video.bandwidth > bw) {
                best = Some((rendition, video.bandwidth));
            }
        }
        if let Some((r, bw)) = best {
            debug!(%flavor, uri = %r.uri, bandwidth = bw, "Selected video variant");
        }
        best.map(|(r, _)| r)
    }

    fn select_audio(&self, config: &SelectionConfig) -> Result<Vec<&'a Rendition>, SelectionError> {
        let mut selected = Vec::new();
        let mut claims = Claims::default();

        for language in &config.audio_languages {
            for &layout in &config.audio_layouts {
                let rendition = self
                    .find_audio(language, |a| !a.describes_video && a.layout == layout)
                    .ok_or_else(|| SelectionError::MissingAudio {
                        language: language.clone(),
                        layout,
                    })?;
                claims.claim(rendition, language)?;
                selected.push(rendition);
            }
        }

        if config.include_audio_description {
            for language in &config.audio_languages {
                let rendition = self
                    .find_audio(language, |a| a.describes_video)
                    .ok_or_else(|| SelectionError::MissingAudioDescription {
                        language: language.clone(),
                    })?;
                claims.claim(rendition, language)?;
                selected.push(rendition);
            }
        }

        Ok(selected)
    }

    fn find_audio(
        &self,
        language: &str,
        predicate: impl Fn(&AudioTrack) -> bool,
    ) -> Option<&'a Rendition> {
        let candidates: Vec<&Rendition> = self
            .manifest
            .iter_kind(RenditionKind::Audio)
            .filter(|r| r.as_audio().is_some_and(&predicate))
            .collect();
        by_language(&candidates, language)
    }

    fn select_subtitles(
        &self,
        selection: &SubtitleSelection,
    ) -> Result<Vec<&'a Rendition>, SelectionError> {
        match selection {
            SubtitleSelection::All => Ok(self.manifest.iter_kind(RenditionKind::Subtitle).collect()),
            SubtitleSelection::Languages(languages) => {
                let mut claims = Claims::default();
                let mut selected = Vec::with_capacity(languages.len());
                for language in languages {
                    let rendition = self.find_subtitle(language).ok_or_else(|| {
                        SelectionError::MissingSubtitle {
                            language: language.clone(),
                        }
                    })?;
                    claims.claim(rendition, language)?;
                    selected.push(rendition);
                }
                Ok(selected)
            }
        }
    }

    /// Exact tags before primary-tag matches; within each pass a regular
    /// track is preferred and forced-only languages still resolve.
    fn find_subtitle(&self, language: &str) -> Option<&'a Rendition> {
        let (forced, regular): (Vec<&Rendition>, Vec<&Rendition>) = self
            .manifest
            .iter_kind(RenditionKind::Subtitle)
            .partition(|r| r.as_subtitle().is_some_and(|s| s.forced));

        exact_language(&regular, language)
            .or_else(|| exact_language(&forced, language))
            .or_else(|| primary_language(&regular, language))
            .or_else(|| primary_language(&forced, language))
    }
}

/// Which requested language each chosen rendition was picked for.
#[derive(Default)]
struct Claims<'s> {
    by_id: HashMap<RenditionId, &'s str>,
}

impl<'s> Claims<'s> {
    fn claim(&mut self, rendition: &Rendition, language: &'s str) -> Result<(), SelectionError> {
        match self.by_id.get(&rendition.id) {
            Some(first) if !first.eq_ignore_ascii_case(language) => {
                Err(SelectionError::OverlappingLanguages {
                    first: first.to_string(),
                    second: language.to_string(),
                    uri: rendition.uri.clone(),
                })
            }
            Some(_) => Ok(()),
            None => {
                self.by_id.insert(rendition.id, language);
                Ok(())
            }
        }
    }
}

fn exact_language<'r>(candidates: &[&'r Rendition], language: &str) -> Option<&'r Rendition> {
    candidates
        .iter()
        .copied()
        .find(|r| r.language().is_some_and(|l| l.eq_ignore_ascii_case(language)))
}

fn primary_language<'r>(candidates: &[&'r Rendition], language: &str) -> Option<&'r Rendition> {
    candidates
        .iter()
        .copied()
        .find(|r| r.language().is_some_and(|l| language_matches(language, l)))
}

fn by_language<'r>(candidates: &[&'r Rendition], language: &str) -> Option<&'r Rendition> {
    exact_language(candidates, language).or_else(|| primary_language(candidates, language))
}

/// Resolve `config` against `manifest` into a download plan.
pub fn resolve_selection(
    manifest: &Manifest,
    config: &SelectionConfig,
) -> Result<DownloadPlan, SelectionError> {
    Resolver::new(manifest).resolve(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectionError;
    use crate::model::AudioLayout;

    const MASTER: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-aac",NAME="English",LANGUAGE="en",DEFAULT=YES,AUTOSELECT=YES,CHANNELS="2",URI="a/en.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-aac",NAME="English AD",LANGUAGE="en",CHANNELS="2",CHARACTERISTICS="public.accessibility.describes-video",URI="a/en_ad.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-aac",NAME="Français",LANGUAGE="fr-CA",CHANNELS="2",URI="a/fr.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-atmos",NAME="English",LANGUAGE="en",CHANNELS="16/JOC",URI="a/en_atmos.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="English",LANGUAGE="en",URI="s/en.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="English Forced",LANGUAGE="en",AUTOSELECT=YES,FORCED=YES,URI="s/en_forced.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="Japanese",LANGUAGE="ja",AUTOSELECT=YES,FORCED=YES,URI="s/ja_forced.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=2000000,CODECS="avc1.640028,mp4a.40.2",VIDEO-RANGE=SDR,AUDIO="audio-stereo-aac",SUBTITLES="subs"
v/sdr_a.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=4000000,CODECS="avc1.640028,mp4a.40.2",VIDEO-RANGE=SDR,AUDIO="audio-stereo-aac",SUBTITLES="subs"
v/sdr_b.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=4000000,CODECS="avc1.640028,mp4a.40.2",VIDEO-RANGE=SDR,AUDIO="audio-stereo-aac",SUBTITLES="subs"
v/sdr_c.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=8000000,CODECS="dvh1.05.06,ec-3",VIDEO-RANGE=PQ,AUDIO="audio-atmos",SUBTITLES="subs"
v/dv.m3u8
"#;

    fn manifest() -> Manifest {
        Manifest::parse(MASTER.as_bytes(), None).unwrap()
    }

    fn uris(plan: &DownloadPlan) -> Vec<&str> {
        plan.iter().map(|e| e.rendition.uri.as_str()).collect()
    }

    #[test]
    fn test_best_video_per_flavor() {
        let manifest = manifest();
        let config = SelectionConfig::builder()
            .video_flavors([DynamicRange::DolbyVision, DynamicRange::Sdr])
            .no_subtitles()
            .build();
        let plan = resolve_selection(&manifest, &config).unwrap();

        // equal bandwidth keeps the earlier variant
        assert_eq!(
            uris(&plan),
            vec!["v/dv.m3u8", "v/sdr_b.m3u8", "a/en.m3u8"]
        );
        assert!(plan.entries()[0].label.default);
        assert!(!plan.entries()[1].label.default);
        assert!(plan.entries()[2].label.default);
    }

    #[test]
    fn test_video_indexes() {
        let manifest = manifest();
        let config = SelectionConfig::builder()
            .video_indexes([2, 0])
            .no_subtitles()
            .build();
        let plan = resolve_selection(&manifest, &config).unwrap();
        assert_eq!(plan.main_video().unwrap().rendition.uri, "v/sdr_c.m3u8");

        let config = SelectionConfig::builder().video_indexes([7]).build();
        assert_eq!(
            resolve_selection(&manifest, &config).unwrap_err(),
            SelectionError::UnknownVideoIndex {
                index: 7,
                valid: vec![0, 1, 2, 3]
            }
        );
    }

    #[test]
    fn test_duplicate_variant_index_is_unknown() {
        let text = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-aac",NAME="English",LANGUAGE="en",CHANNELS="2",URI="a/en.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=2000000,CODECS="avc1.640028,mp4a.40.2",VIDEO-RANGE=SDR,AUDIO="audio-stereo-aac"
v/sdr.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2000000,CODECS="avc1.640028,mp4a.40.2",VIDEO-RANGE=SDR,AUDIO="audio-stereo-aac"
v/sdr.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=4000000,CODECS="avc1.640028,mp4a.40.2",VIDEO-RANGE=SDR,AUDIO="audio-stereo-aac"
v/sdr_hi.m3u8
"#;
        let manifest = Manifest::parse(text.as_bytes(), None).unwrap();
        let config = SelectionConfig::builder().video_indexes([1]).build();
        let err = resolve_selection(&manifest, &config).unwrap_err();
        assert_eq!(
            err,
            SelectionError::UnknownVideoIndex {
                index: 1,
                valid: vec![0, 2]
            }
        );
        assert!(err.to_string().contains("valid indexes: 0, 2"));
    }

    #[test]
    fn test_missing_flavor() {
        let manifest = manifest();
        let config = SelectionConfig::builder()
            .video_flavors([DynamicRange::Hdr10])
            .build();
        assert_eq!(
            resolve_selection(&manifest, &config).unwrap_err(),
            SelectionError::MissingVideo {
                flavor: DynamicRange::Hdr10
            }
        );
    }

    #[test]
    fn test_audio_layouts_and_description() {
        let manifest = manifest();
        let config = SelectionConfig::builder()
            .audio_languages(["en", "fr"])
            .audio_layouts([AudioLayout::Stereo])
            .include_audio_description(false)
            .no_subtitles()
            .build();
        let plan = resolve_selection(&manifest, &config).unwrap();
        // primary tag "fr" matches "fr-CA"
        assert_eq!(
            uris(&plan)[1..].to_vec(),
            vec!["a/en.m3u8", "a/fr.m3u8"]
        );

        let config = SelectionConfig::builder()
            .audio_languages(["en"])
            .audio_layouts([AudioLayout::Stereo, AudioLayout::Atmos])
            .include_audio_description(true)
            .no_subtitles()
            .build();
        let plan = resolve_selection(&manifest, &config).unwrap();
        assert_eq!(
            uris(&plan)[1..].to_vec(),
            vec!["a/en.m3u8", "a/en_atmos.m3u8", "a/en_ad.m3u8"]
        );
        let ad = &plan.entries()[3];
        assert!(ad.label.visual_impaired);
        assert!(!ad.label.default);
        assert_eq!(plan.entries()[2].label.name, "English (Dolby Atmos)");
    }

    #[test]
    fn test_missing_audio() {
        let manifest = manifest();
        let config = SelectionConfig::builder()
            .audio_languages(["fr"])
            .audio_layouts([AudioLayout::Atmos])
            .build();
        let err = resolve_selection(&manifest, &config).unwrap_err();
        assert_eq!(
            err,
            SelectionError::MissingAudio {
                language: "fr".to_string(),
                layout: AudioLayout::Atmos
            }
        );

        let config = SelectionConfig::builder()
            .audio_languages(["fr"])
            .include_audio_description(true)
            .build();
        assert_eq!(
            resolve_selection(&manifest, &config).unwrap_err(),
            SelectionError::MissingAudioDescription {
                language: "fr".to_string()
            }
        );
    }

    #[test]
    fn test_subtitle_languages_prefer_regular_tracks() {
        let manifest = manifest();
        let config = SelectionConfig::builder()
            .subtitle_languages(["ja", "en"])
            .default_subtitle_language(Some("en"))
            .build();
        let plan = resolve_selection(&manifest, &config).unwrap();
        let subs: Vec<_> = plan.of_kind(RenditionKind::Subtitle).collect();

        assert_eq!(subs[0].rendition.uri, "s/ja_forced.m3u8");
        assert!(subs[0].label.forced);
        assert!(!subs[0].label.default);
        assert_eq!(subs[1].rendition.uri, "s/en.m3u8");
        assert!(subs[1].label.default);

        let config = SelectionConfig::builder().subtitle_languages(["de"]).build();
        assert_eq!(
            resolve_selection(&manifest, &config).unwrap_err(),
            SelectionError::MissingSubtitle {
                language: "de".to_string()
            }
        );
    }

    #[test]
    fn test_all_subtitles() {
        let manifest = manifest();
        let plan = resolve_selection(&manifest, &SelectionConfig::default()).unwrap();
        assert_eq!(plan.of_kind(RenditionKind::Subtitle).count(), 3);
        assert!(plan.of_kind(RenditionKind::Subtitle).all(|e| !e.label.default));
    }

    #[test]
    fn test_nothing_selected() {
        let manifest = manifest();
        let config = SelectionConfig::builder()
            .video_flavors(Vec::<DynamicRange>::new())
            .audio_languages(Vec::<String>::new())
            .no_subtitles()
            .build();
        assert_eq!(
            resolve_selection(&manifest, &config).unwrap_err(),
            SelectionError::NothingSelected
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let manifest = manifest();
        let config = SelectionConfig::builder()
            .video_flavors(DynamicRange::ALL.into_iter().filter(|f| *f != DynamicRange::Hdr10))
            .audio_languages(["en", "fr"])
            .audio_layouts([AudioLayout::Stereo])
            .subtitle_languages(["en", "ja"])
            .default_subtitle_language(Some("en"))
            .build();
        let first = resolve_selection(&manifest, &config).unwrap();
        assert_eq!(first.len(), 6);
        for _ in 0..10 {
            assert_eq!(resolve_selection(&manifest, &config).unwrap(), first);
        }
    }

    const REGIONAL: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-aac",NAME="Français (Canada)",LANGUAGE="fr-CA",CHANNELS="2",URI="a/fr_ca.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-aac",NAME="Français",LANGUAGE="fr",CHANNELS="2",URI="a/fr.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-aac",NAME="English (UK)",LANGUAGE="en-GB",CHANNELS="2",URI="a/en_gb.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="Français (Canada)",LANGUAGE="fr-CA",URI="s/fr_ca.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="Français",LANGUAGE="fr",URI="s/fr.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=2000000,CODECS="avc1.640028,mp4a.40.2",VIDEO-RANGE=SDR,AUDIO="audio-stereo-aac",SUBTITLES="subs"
v/sdr.m3u8
"#;

    #[test]
    fn test_exact_language_beats_earlier_regional_tag() {
        let manifest = Manifest::parse(REGIONAL.as_bytes(), None).unwrap();
        let config = SelectionConfig::builder()
            .audio_languages(["fr"])
            .subtitle_languages(["fr", "fr-CA"])
            .default_subtitle_language(Some("fr"))
            .build();
        let plan = resolve_selection(&manifest, &config).unwrap();

        let audio: Vec<&str> = plan
            .of_kind(RenditionKind::Audio)
            .map(|e| e.rendition.uri.as_str())
            .collect();
        assert_eq!(audio, vec!["a/fr.m3u8"]);

        let subtitles: Vec<(&str, bool)> = plan
            .of_kind(RenditionKind::Subtitle)
            .map(|e| (e.rendition.uri.as_str(), e.label.default))
            .collect();
        assert_eq!(subtitles, vec![("s/fr.m3u8", true), ("s/fr_ca.m3u8", false)]);
    }

    #[test]
    fn test_primary_tag_falls_back_to_regional() {
        let manifest = Manifest::parse(REGIONAL.as_bytes(), None).unwrap();
        let config = SelectionConfig::builder()
            .audio_languages(["en"])
            .no_subtitles()
            .build();
        let plan = resolve_selection(&manifest, &config).unwrap();
        assert_eq!(uris(&plan), vec!["v/sdr.m3u8", "a/en_gb.m3u8"]);
    }

    #[test]
    fn test_languages_sharing_a_rendition_are_rejected() {
        let manifest = Manifest::parse(REGIONAL.as_bytes(), None).unwrap();
        let config = SelectionConfig::builder()
            .audio_languages(["en", "en-GB"])
            .no_subtitles()
            .build();
        assert_eq!(
            resolve_selection(&manifest, &config).unwrap_err(),
            SelectionError::OverlappingLanguages {
                first: "en".to_string(),
                second: "en-GB".to_string(),
                uri: "a/en_gb.m3u8".to_string(),
            }
        );
    }
}
