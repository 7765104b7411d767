//! Interactive selection. Every answer ends up in a [`SelectionConfig`];
//! the resolver never reads input itself.

use std::fmt;

use rendition::{AudioLayout, RenditionCatalog, SelectionConfig, SelectionConfigBuilder};

use crate::error::{CliError, Result};

/// A prompt option carrying the value it stands for.
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "interactive"), allow(dead_code))]
struct Choice<T> {
    label: String,
    value: T,
}

impl<T> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Audio layouts offered by the catalog for any of `languages`, in the
/// order they first appear.
pub fn layouts_for(catalog: &RenditionCatalog<'_>, languages: &[String]) -> Vec<AudioLayout> {
    let mut layouts = Vec::new();
    for group in &catalog.audio {
        if !languages.iter().any(|l| l.eq_ignore_ascii_case(&group.key)) {
            continue;
        }
        let regular = group
            .renditions
            .iter()
            .filter_map(|r| r.as_audio())
            .filter(|a| !a.describes_video);
        for audio in regular {
            if !layouts.contains(&audio.layout) {
                layouts.push(audio.layout);
            }
        }
    }
    layouts
}

/// Whether every language in `languages` has an audio description track.
pub fn has_audio_description(catalog: &RenditionCatalog<'_>, languages: &[String]) -> bool {
    !languages.is_empty()
        && languages.iter().all(|language| {
            catalog
                .audio
                .iter()
                .filter(|g| g.key.eq_ignore_ascii_case(language))
                .flat_map(|g| g.renditions.iter())
                .any(|r| r.as_audio().is_some_and(|a| a.describes_video))
        })
}

/// Reorder `languages` so `first` leads; the rest keep their order.
#[cfg_attr(not(feature = "interactive"), allow(dead_code))]
pub fn move_to_front(mut languages: Vec<String>, first: &str) -> Vec<String> {
    if let Some(pos) = languages.iter().position(|l| l == first) {
        let language = languages.remove(pos);
        languages.insert(0, language);
    }
    languages
}

#[cfg(feature = "interactive")]
fn prompt_error(e: inquire::InquireError) -> CliError {
    match e {
        inquire::InquireError::OperationCanceled | inquire::InquireError::OperationInterrupted => {
            CliError::user_cancelled()
        }
        other => CliError::Prompt(other),
    }
}

/// Ask for video, audio and subtitle choices, starting from `defaults`
/// for the download directory.
#[cfg(feature = "interactive")]
pub fn prompt_selection(
    catalog: &RenditionCatalog<'_>,
    defaults: SelectionConfigBuilder,
) -> Result<SelectionConfig> {
    use inquire::{Confirm, MultiSelect, Select};

    const BY_FLAVOR: &str = "Best variant per dynamic range";
    const BY_INDEX: &str = "Pick variants from the stream matrix";

    let mut builder = defaults;

    let mode = Select::new("How should video be chosen?", vec![BY_FLAVOR, BY_INDEX])
        .prompt()
        .map_err(prompt_error)?;

    if mode == BY_INDEX {
        let options: Vec<Choice<usize>> = catalog
            .videos()
            .into_iter()
            .map(|r| Choice {
                label: format!("[{}] {}", r.id.index, r.describe()),
                value: r.id.index,
            })
            .collect();
        let picked = MultiSelect::new("Video variants (the first becomes the main track):", options)
            .prompt()
            .map_err(prompt_error)?;
        builder = builder.video_indexes(picked.into_iter().map(|c| c.value));
    } else {
        let options: Vec<Choice<_>> = catalog
            .video
            .iter()
            .map(|g| Choice {
                label: format!("{} ({} variants)", g.key, g.renditions.len()),
                value: g.key,
            })
            .collect();
        let picked = MultiSelect::new("Video dynamic ranges:", options)
            .with_default(&[0])
            .prompt()
            .map_err(prompt_error)?;
        builder = builder.video_flavors(picked.into_iter().map(|c| c.value));
    }

    let options: Vec<Choice<String>> = catalog
        .audio
        .iter()
        .map(|g| Choice {
            label: format!("{} ({} renditions)", g.key, g.renditions.len()),
            value: g.key.clone(),
        })
        .collect();
    let mut languages: Vec<String> = MultiSelect::new("Audio languages:", options)
        .prompt()
        .map_err(prompt_error)?
        .into_iter()
        .map(|c| c.value)
        .collect();

    // MultiSelect answers in list order, so the default track is asked for
    if languages.len() > 1 {
        let default = Select::new("Default audio language:", languages.clone())
            .prompt()
            .map_err(prompt_error)?;
        languages = move_to_front(languages, &default);
    }

    let layouts = layouts_for(catalog, &languages);
    let chosen_layouts = if layouts.len() > 1 {
        let options: Vec<Choice<AudioLayout>> = layouts
            .iter()
            .map(|&layout| Choice {
                label: layout.to_string(),
                value: layout,
            })
            .collect();
        MultiSelect::new("Audio layouts:", options)
            .with_default(&[0])
            .prompt()
            .map_err(prompt_error)?
            .into_iter()
            .map(|c| c.value)
            .collect()
    } else {
        layouts
    };

    let audio_description = if has_audio_description(catalog, &languages) {
        Confirm::new("Include audio description tracks?")
            .with_default(false)
            .prompt()
            .map_err(prompt_error)?
    } else {
        false
    };

    builder = builder
        .audio_languages(languages)
        .audio_layouts(chosen_layouts)
        .include_audio_description(audio_description);

    let subtitle_languages: Vec<String> = catalog.subtitle_languages().map(str::to_string).collect();
    if subtitle_languages.is_empty() {
        builder = builder.no_subtitles().default_subtitle_language(None::<String>);
    } else {
        let total = subtitle_languages.len();
        let all: Vec<usize> = (0..total).collect();
        let picked = MultiSelect::new("Subtitle languages:", subtitle_languages)
            .with_default(&all)
            .prompt()
            .map_err(prompt_error)?;

        const NO_DEFAULT: &str = "(none)";
        let default = if picked.is_empty() {
            None
        } else {
            let mut options = vec![NO_DEFAULT.to_string()];
            options.extend(picked.iter().cloned());
            Some(
                Select::new("Default subtitle language:", options)
                    .prompt()
                    .map_err(prompt_error)?,
            )
            .filter(|l| l != NO_DEFAULT)
        };

        builder = if picked.len() == total {
            builder.all_subtitles()
        } else {
            builder.subtitle_languages(picked)
        };
        builder = builder.default_subtitle_language(default);
    }

    Ok(builder.build())
}

#[cfg(not(feature = "interactive"))]
pub fn prompt_selection(
    _catalog: &RenditionCatalog<'_>,
    _defaults: SelectionConfigBuilder,
) -> Result<SelectionConfig> {
    Err(CliError::invalid_input(
        "interactive prompts are not available in this build, pass selection flags instead",
    ))
}
