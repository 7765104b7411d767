//! # Rendition
//!
//! Turns an HLS master playlist into a flat list of selectable renditions
//! and resolves a user's choices into a concrete download plan.
//!
//! ## Features
//!
//! - Normalization of `m3u8-rs` master playlists (variants and alternative media)
//! - Dynamic range detection (SDR, HDR10, Dolby Vision) and audio layout detection
//! - Catalog of renditions grouped by kind and distinguishing attribute
//! - Deterministic selection with first-match tie-breaking
//! - Pure generation of `ffmpeg` fetch and `mkvmerge` mux command lines
//!
//! ```
//! use rendition::{Manifest, SelectionConfig, DynamicRange, resolve_selection};
//!
//! let text = "#EXTM3U
//! #EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"audio-stereo-160\",NAME=\"English\",LANGUAGE=\"en\",CHANNELS=\"2\",URI=\"audio/en.m3u8\"
//! #EXT-X-STREAM-INF:BANDWIDTH=2000000,CODECS=\"avc1.640028,mp4a.40.2\",VIDEO-RANGE=SDR,AUDIO=\"audio-stereo-160\"
//! video/sdr.m3u8
//! ";
//! let manifest = Manifest::parse(text.as_bytes(), None).unwrap();
//! let config = SelectionConfig::builder()
//!     .video_flavors([DynamicRange::Sdr])
//!     .audio_languages(["en"])
//!     .no_subtitles()
//!     .build();
//! let plan = resolve_selection(&manifest, &config).unwrap();
//! assert_eq!(plan.len(), 2);
//! ```

pub mod catalog;
pub mod command;
pub mod error;
pub mod manifest;
pub mod model;
pub mod mux;
pub mod plan;
pub mod resolver;
pub mod selection;

pub use catalog::{RenditionCatalog, RenditionGroup, list_renditions};
pub use command::ToolCommand;
pub use error::{Error, ParseError, Result, SelectionError};
pub use manifest::Manifest;
pub use model::{
    AudioCodec, AudioLayout, AudioTrack, DynamicRange, Rendition, RenditionId, RenditionKind,
    SubtitleTrack, Track, VideoTrack,
};
pub use mux::{MuxOptions, fetch_command, fetch_commands, generate_mux_commands, mkvmerge_command};
pub use plan::{DownloadPlan, PlanEntry, TrackLabel};
pub use resolver::{Resolver, resolve_selection};
pub use selection::{SelectionConfig, SelectionConfigBuilder, SubtitleSelection, VideoSelection};
