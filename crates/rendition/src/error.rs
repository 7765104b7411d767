use crate::model::{AudioLayout, DynamicRange, RenditionKind};

/// Errors raised while turning playlist text into a [`Manifest`](crate::Manifest).
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Playlist syntax error: {0}")]
    Syntax(String),

    #[error("Expected a master playlist, found a media playlist")]
    NotMasterPlaylist,

    #[error("Manifest has no {0} renditions")]
    MissingCategory(RenditionKind),

    #[error("Unsupported audio type: {0}")]
    UnsupportedAudioGroup(String),

    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
}

/// Errors raised while mapping user choices onto a manifest.
///
/// Each variant names the exact combination that could not be satisfied so
/// the user can pick again.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No {flavor} video rendition available")]
    MissingVideo { flavor: DynamicRange },

    #[error("No video variant with index {index} (valid indexes: {})", join_indexes(.valid))]
    UnknownVideoIndex { index: usize, valid: Vec<usize> },

    #[error("No {layout} audio rendition for language '{language}'")]
    MissingAudio {
        language: String,
        layout: AudioLayout,
    },

    #[error("No audio description rendition for language '{language}'")]
    MissingAudioDescription { language: String },

    #[error("No subtitle rendition for language '{language}'")]
    MissingSubtitle { language: String },

    #[error("Languages '{first}' and '{second}' both resolve to {uri}")]
    OverlappingLanguages {
        first: String,
        second: String,
        uri: String,
    },

    #[error("Selection is empty: choose at least one video, audio or subtitle rendition")]
    NothingSelected,
}

fn join_indexes(indexes: &[usize]) -> String {
    if indexes.is_empty() {
        return "none".to_string();
    }
    indexes
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
