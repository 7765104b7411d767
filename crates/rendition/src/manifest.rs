// Manifest normalization: flattens a parsed master playlist into renditions.

use std::collections::{HashMap, HashSet};

use m3u8_rs::{
    AlternativeMedia, AlternativeMediaType, ClosedCaptionGroupId, HDCPLevel, MasterPlaylist,
    Playlist, QuotedOrUnquoted, VariantStream, parse_playlist_res,
};
use tracing::{debug, warn};
use url::Url;

use crate::error::ParseError;
use crate::model::{
    AudioCodec, AudioLayout, AudioTrack, DynamicRange, Rendition, RenditionId, RenditionKind,
    SubtitleTrack, Track, VideoTrack,
};

const DESCRIBES_VIDEO: &str = "public.accessibility.describes-video";
const UNDETERMINED_LANGUAGE: &str = "und";

/// A master playlist normalized into a flat, deduplicated rendition list.
///
/// Renditions are stored in manifest order: video variants first, then the
/// `#EXT-X-MEDIA` entries. Entries whose URI repeats an earlier rendition of
/// the same kind are dropped, so every URI appears once per kind.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    base_url: Option<Url>,
    renditions: Vec<Rendition>,
}

impl Manifest {
    /// Parse raw m3u8 bytes. Relative URIs are resolved against `base_url`
    /// when one is given.
    pub fn parse(input: &[u8], base_url: Option<&Url>) -> Result<Self, ParseError> {
        match parse_playlist_res(input) {
            Ok(Playlist::MasterPlaylist(pl)) => Self::from_master_playlist(&pl, base_url),
            Ok(Playlist::MediaPlaylist(_)) => Err(ParseError::NotMasterPlaylist),
            Err(e) => Err(ParseError::Syntax(e.to_string())),
        }
    }

    pub fn from_master_playlist(
        playlist: &MasterPlaylist,
        base_url: Option<&Url>,
    ) -> Result<Self, ParseError> {
        let mut renditions =
            Vec::with_capacity(playlist.variants.len() + playlist.alternatives.len());
        let mut seen: HashSet<(RenditionKind, String)> = HashSet::new();

        // Codecs of the variants referencing each audio group, used when the
        // GROUP-ID itself carries no codec hint.
        let mut group_codecs: HashMap<&str, &str> = HashMap::new();
        for variant in &playlist.variants {
            if let (Some(group), Some(codecs)) = (&variant.audio, &variant.codecs) {
                group_codecs.entry(group.as_str()).or_insert(codecs.as_str());
            }
        }

        let video_variants = playlist.variants.iter().filter(|v| !v.is_i_frame);
        for (index, variant) in video_variants.enumerate() {
            let uri = resolve_uri(base_url, &variant.uri)?;
            if !seen.insert((RenditionKind::Video, uri.clone())) {
                debug!(index, uri = %uri, "Skipping duplicate video variant");
                continue;
            }
            renditions.push(normalize_variant(index, variant, uri));
        }

        for (index, media) in playlist.alternatives.iter().enumerate() {
            let kind = match media.media_type {
                AlternativeMediaType::Audio => RenditionKind::Audio,
                AlternativeMediaType::Subtitles => RenditionKind::Subtitle,
                ref other => {
                    debug!(index, media_type = ?other, name = %media.name, "Ignoring media entry");
                    continue;
                }
            };

            let Some(raw_uri) = media.uri.as_deref() else {
                warn!(
                    index,
                    name = %media.name,
                    group_id = %media.group_id,
                    "Media entry has no URI, it is muxed into the variants and cannot be fetched on its own"
                );
                continue;
            };

            let uri = resolve_uri(base_url, raw_uri)?;
            if !seen.insert((kind, uri.clone())) {
                debug!(index, uri = %uri, "Skipping duplicate {kind} rendition");
                continue;
            }

            let track = match kind {
                RenditionKind::Audio => {
                    let variant_codecs = group_codecs.get(media.group_id.as_str()).copied();
                    Track::Audio(normalize_audio(media, variant_codecs)?)
                }
                _ => Track::Subtitle(SubtitleTrack {
                    language: language_of(media),
                    forced: media.forced,
                }),
            };

            renditions.push(Rendition {
                id: RenditionId { kind, index },
                uri,
                group_id: media.group_id.clone(),
                name: media.name.clone(),
                manifest_default: media.default,
                track,
            });
        }

        debug!(
            renditions = renditions.len(),
            variants = playlist.variants.len(),
            alternatives = playlist.alternatives.len(),
            "Normalized master playlist"
        );

        Ok(Self {
            base_url: base_url.cloned(),
            renditions,
        })
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn renditions(&self) -> &[Rendition] {
        &self.renditions
    }

    pub fn iter_kind(&self, kind: RenditionKind) -> impl Iterator<Item = &Rendition> {
        self.renditions.iter().filter(move |r| r.kind() == kind)
    }

    pub fn get(&self, id: RenditionId) -> Option<&Rendition> {
        self.renditions.iter().find(|r| r.id == id)
    }

    pub fn count(&self, kind: RenditionKind) -> usize {
        self.iter_kind(kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.renditions.is_empty()
    }
}

impl FromIterator<Rendition> for Manifest {
    /// Build a manifest from already normalized renditions, keeping the
    /// first rendition for any repeated id.
    fn from_iter<T: IntoIterator<Item = Rendition>>(iter: T) -> Self {
        let mut seen = HashSet::new();
        let renditions = iter.into_iter().filter(|r| seen.insert(r.id)).collect();
        Self {
            base_url: None,
            renditions,
        }
    }
}

fn resolve_uri(base_url: Option<&Url>, uri: &str) -> Result<String, ParseError> {
    match base_url {
        Some(base) => base
            .join(uri)
            .map(|u| u.to_string())
            .map_err(|e| ParseError::InvalidUri {
                uri: uri.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(uri.to_string()),
    }
}

fn attribute<'a>(
    attributes: &'a Option<HashMap<String, QuotedOrUnquoted>>,
    name: &str,
) -> Option<&'a str> {
    attributes
        .as_ref()
        .and_then(|attrs| attrs.get(name))
        .map(|value| match value {
            QuotedOrUnquoted::Quoted(s) | QuotedOrUnquoted::Unquoted(s) => s.as_str(),
        })
}

fn normalize_variant(index: usize, variant: &VariantStream, uri: String) -> Rendition {
    let codecs = variant.codecs.clone().unwrap_or_default();
    let video_range = attribute(&variant.other_attributes, "VIDEO-RANGE").map(str::to_string);
    let dynamic_range = DynamicRange::detect(video_range.as_deref(), &codecs);
    let stable_id = attribute(&variant.other_attributes, "STABLE-VARIANT-ID");

    let group_id = variant
        .video
        .as_deref()
        .or(stable_id)
        .unwrap_or("video")
        .to_string();

    let hdcp_level = variant.hdcp_level.as_ref().map(|level| match level {
        HDCPLevel::Type0 => "TYPE-0".to_string(),
        HDCPLevel::Type1 => "TYPE-1".to_string(),
        HDCPLevel::None => "NONE".to_string(),
        HDCPLevel::Other(s) => s.clone(),
    });

    let closed_captions = variant.closed_captions.as_ref().map(|cc| match cc {
        ClosedCaptionGroupId::None => "NONE".to_string(),
        ClosedCaptionGroupId::GroupId(s) | ClosedCaptionGroupId::Other(s) => s.clone(),
    });

    let track = VideoTrack {
        bandwidth: variant.bandwidth,
        average_bandwidth: variant.average_bandwidth,
        resolution: variant.resolution.as_ref().map(|r| (r.width, r.height)),
        frame_rate: variant.frame_rate,
        dynamic_range,
        video_range,
        hdcp_level,
        audio_group: variant.audio.clone(),
        subtitle_group: variant.subtitles.clone(),
        closed_captions,
        codecs,
    };

    Rendition {
        id: RenditionId {
            kind: RenditionKind::Video,
            index,
        },
        name: format!("{} {}", track.dynamic_range, track.resolution_label().unwrap_or_default())
            .trim_end()
            .to_string(),
        uri,
        group_id,
        manifest_default: false,
        track: Track::Video(track),
    }
}

fn normalize_audio(
    media: &AlternativeMedia,
    variant_codecs: Option<&str>,
) -> Result<AudioTrack, ParseError> {
    let codec = AudioCodec::from_group_id(&media.group_id)
        .or_else(|| variant_codecs.and_then(AudioCodec::from_codecs))
        .ok_or_else(|| ParseError::UnsupportedAudioGroup(media.group_id.clone()))?;

    let describes_video = media
        .characteristics
        .as_deref()
        .is_some_and(|c| c.split(',').any(|tag| tag.trim() == DESCRIBES_VIDEO));

    Ok(AudioTrack {
        language: language_of(media),
        layout: AudioLayout::detect(media.channels.as_deref(), &media.group_id),
        codec,
        channels: media.channels.clone(),
        describes_video,
    })
}

fn language_of(media: &AlternativeMedia) -> String {
    media
        .language
        .clone()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| UNDETERMINED_LANGUAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = r#"#EXTM3U
#EXT-X-VERSION:6
#EXT-X-INDEPENDENT-SEGMENTS
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-160",NAME="English",LANGUAGE="en",DEFAULT=YES,AUTOSELECT=YES,CHANNELS="2",URI="audio/en/stereo.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-160",NAME="English AD",LANGUAGE="en",AUTOSELECT=YES,CHANNELS="2",CHARACTERISTICS="public.accessibility.describes-video",URI="audio/en/ad.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-atmos-2034",NAME="English",LANGUAGE="en",CHANNELS="16/JOC",URI="audio/en/atmos.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-64",NAME="English",LANGUAGE="en",CHANNELS="2",URI="audio/en/stereo.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="English",LANGUAGE="en",AUTOSELECT=YES,URI="subs/en.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="Japanese",LANGUAGE="ja",AUTOSELECT=YES,URI="subs/ja.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=2500000,AVERAGE-BANDWIDTH=2200000,CODECS="avc1.640028,mp4a.40.2",RESOLUTION=1920x1080,FRAME-RATE=29.970,VIDEO-RANGE=SDR,AUDIO="audio-stereo-160",SUBTITLES="subs",CLOSED-CAPTIONS=NONE
video/sdr_1080.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=9000000,CODECS="dvh1.05.06,ec-3",RESOLUTION=3840x2160,FRAME-RATE=29.970,HDCP-LEVEL=TYPE-1,VIDEO-RANGE=PQ,AUDIO="audio-atmos-2034",SUBTITLES="subs",CLOSED-CAPTIONS=NONE
video/dv_2160.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2500000,CODECS="avc1.640028,mp4a.40.2",RESOLUTION=1920x1080,VIDEO-RANGE=SDR,AUDIO="audio-stereo-160"
video/sdr_1080.m3u8
#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=300000,CODECS="avc1.640028",RESOLUTION=1920x1080,URI="video/iframe.m3u8"
"#;

    fn base() -> Url {
        Url::parse("https://events-delivery.example.com/event/m3u8/vod_index.m3u8").unwrap()
    }

    #[test]
    fn test_normalize_master_playlist() {
        let manifest = Manifest::parse(MASTER.as_bytes(), Some(&base())).unwrap();

        // duplicate video URI and duplicate audio URI collapse, i-frame skipped
        assert_eq!(manifest.count(RenditionKind::Video), 2);
        assert_eq!(manifest.count(RenditionKind::Audio), 3);
        assert_eq!(manifest.count(RenditionKind::Subtitle), 2);

        let video: Vec<_> = manifest.iter_kind(RenditionKind::Video).collect();
        assert_eq!(
            video[0].uri,
            "https://events-delivery.example.com/event/m3u8/video/sdr_1080.m3u8"
        );
        let first = video[0].as_video().unwrap();
        assert_eq!(first.dynamic_range, DynamicRange::Sdr);
        assert_eq!(first.resolution, Some((1920, 1080)));
        assert_eq!(first.audio_group.as_deref(), Some("audio-stereo-160"));
        assert_eq!(first.video_codec(), Some("avc1.640028"));
        assert_eq!(first.hdcp_level, None);

        let uhd = video[1].as_video().unwrap();
        assert_eq!(uhd.dynamic_range, DynamicRange::DolbyVision);
        assert_eq!(uhd.hdcp_level.as_deref(), Some("TYPE-1"));
    }

    #[test]
    fn test_audio_attributes() {
        let manifest = Manifest::parse(MASTER.as_bytes(), None).unwrap();
        let audio: Vec<_> = manifest.iter_kind(RenditionKind::Audio).collect();

        let stereo = audio[0].as_audio().unwrap();
        assert_eq!(stereo.codec, AudioCodec::Aac);
        assert_eq!(stereo.layout, AudioLayout::Stereo);
        assert!(!stereo.describes_video);
        assert!(audio[0].manifest_default);
        assert_eq!(audio[0].uri, "audio/en/stereo.m3u8");

        assert!(audio[1].as_audio().unwrap().describes_video);

        let atmos = audio[2].as_audio().unwrap();
        assert_eq!(atmos.codec, AudioCodec::Eac3);
        assert_eq!(atmos.layout, AudioLayout::Atmos);
        assert_eq!(audio[2].id.index, 2);
    }

    #[test]
    fn test_media_playlist_rejected() {
        let media = "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXTINF:6.0,\nseg0.ts\n#EXT-X-ENDLIST\n";
        assert_eq!(
            Manifest::parse(media.as_bytes(), None).unwrap_err(),
            ParseError::NotMasterPlaylist
        );
    }

    #[test]
    fn test_unsupported_audio_group() {
        let text = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-opus",NAME="English",LANGUAGE="en",URI="audio/en.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=1000000,CODECS="avc1.640028,opus",AUDIO="audio-opus"
video.m3u8
"#;
        assert_eq!(
            Manifest::parse(text.as_bytes(), None).unwrap_err(),
            ParseError::UnsupportedAudioGroup("audio-opus".to_string())
        );
    }

    #[test]
    fn test_missing_language_is_undetermined() {
        let text = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="Unknown",URI="subs/x.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=1000000,CODECS="avc1.640028",SUBTITLES="subs"
video.m3u8
"#;
        let manifest = Manifest::parse(text.as_bytes(), None).unwrap();
        let sub = manifest.iter_kind(RenditionKind::Subtitle).next().unwrap();
        assert_eq!(sub.language(), Some("und"));
    }
}
