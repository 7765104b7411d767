use crate::{
    cli::{OutputFormat, SelectionArgs, SourceArgs},
    config::AppConfig,
    download::Downloader,
    error::Result,
    fetch::{HttpSettings, ManifestLoader},
    output::{Color, OutputManager, write_output},
    prompt::prompt_selection,
    tools,
};
use indicatif::{ProgressBar, ProgressStyle};
use rendition::{
    DownloadPlan, Manifest, MuxOptions, SelectionConfig, SelectionConfigBuilder,
    generate_mux_commands, list_renditions, mkvmerge_command, resolve_selection,
};
use std::{path::Path, time::Duration};
use tracing::{debug, info};

pub struct CommandExecutor {
    config: AppConfig,
    loader: ManifestLoader,
    output: OutputManager,
    quiet: bool,
}

impl CommandExecutor {
    pub fn new(
        config: AppConfig,
        timeout: Option<u64>,
        retries: Option<u32>,
        quiet: bool,
    ) -> Result<Self> {
        let settings = HttpSettings {
            timeout: Duration::from_secs(timeout.unwrap_or(config.default_timeout)),
            retries: retries.unwrap_or(config.default_retries),
            user_agent: config.user_agent.clone(),
        };
        let loader = ManifestLoader::new(settings)?;
        let output = OutputManager::new(config.colored_output);

        Ok(Self {
            config,
            loader,
            output,
            quiet,
        })
    }

    /// Print the renditions of a master playlist.
    pub async fn list(
        &self,
        source: &SourceArgs,
        format: &OutputFormat,
        output_file: Option<&Path>,
    ) -> Result<()> {
        let manifest = self.load(source).await?;
        let catalog = list_renditions(&manifest)?;
        let output = self.output.format_catalog(&catalog, format)?;
        write_output(&output, output_file)
    }

    /// Resolve a selection and print the plan with its commands.
    pub async fn plan(
        &self,
        source: &SourceArgs,
        selection: &SelectionArgs,
        format: &OutputFormat,
        output_file: Option<&Path>,
    ) -> Result<()> {
        let manifest = self.load(source).await?;
        let plan = self.resolve(&manifest, selection)?;
        let options = self.mux_options(selection, false, false)?;

        let commands = generate_mux_commands(&plan, &options);
        let output = self.output.format_plan(&plan, &commands, format)?;
        write_output(&output, output_file)
    }

    /// Resolve a selection, fetch every rendition and optionally mux them.
    pub async fn download(
        &self,
        source: &SourceArgs,
        selection: &SelectionArgs,
        mux: bool,
        max_concurrent: Option<usize>,
    ) -> Result<()> {
        let manifest = self.load(source).await?;
        let plan = self.resolve(&manifest, selection)?;
        let options = self.mux_options(selection, true, mux)?;

        if !self.quiet {
            let output = self.output.format_plan(&plan, &[], &OutputFormat::Pretty)?;
            write_output(&output, None)?;
        }

        let downloader = Downloader::new(
            options,
            max_concurrent.unwrap_or(self.config.max_concurrent),
        )
        .with_progress(!self.quiet);
        downloader.run(&plan).await?;

        if mux {
            downloader.mux(&plan).await?;
            self.announce(&format!(
                "✓ Muxed into {}",
                downloader.options().output.display()
            ));
        } else {
            let command = mkvmerge_command(&plan, downloader.options());
            self.announce("✓ Renditions fetched. Mux them with:");
            println!("{command}");
        }

        Ok(())
    }

    async fn load(&self, source: &SourceArgs) -> Result<Manifest> {
        let pb = self.create_progress_bar("Loading playlist...");
        let result = self.loader.load(&source.source, source.base_url.as_ref()).await;
        pb.finish_and_clear();
        result
    }

    fn resolve(&self, manifest: &Manifest, args: &SelectionArgs) -> Result<DownloadPlan> {
        let catalog = list_renditions(manifest)?;

        let config = if args.interactive {
            let mut defaults = self.config.selection_defaults()?;
            if let Some(dir) = &args.download_dir {
                defaults = defaults.download_dir(dir);
            }
            prompt_selection(&catalog, defaults)?
        } else {
            selection_from_args(&self.config, args)?
        };
        debug!(?config, "Selection");

        let plan = resolve_selection(manifest, &config)?;
        info!(entries = plan.len(), "Resolved download plan");
        Ok(plan)
    }

    /// Tool paths are only checked when the commands are going to run.
    fn mux_options(
        &self,
        args: &SelectionArgs,
        locate_ffmpeg: bool,
        locate_mkvmerge: bool,
    ) -> Result<MuxOptions> {
        let ffmpeg = if locate_ffmpeg {
            tools::locate(tools::FFMPEG, self.config.ffmpeg_path.as_deref())?
                .to_string_lossy()
                .into_owned()
        } else {
            configured_tool(self.config.ffmpeg_path.as_deref(), tools::FFMPEG)
        };
        let mkvmerge = if locate_mkvmerge {
            tools::locate(tools::MKVMERGE, self.config.mkvmerge_path.as_deref())?
                .to_string_lossy()
                .into_owned()
        } else {
            configured_tool(self.config.mkvmerge_path.as_deref(), tools::MKVMERGE)
        };

        Ok(MuxOptions::new()
            .with_ffmpeg(ffmpeg)
            .with_mkvmerge(mkvmerge)
            .with_output(args.mkv.clone().unwrap_or_else(|| self.config.mux_output.clone())))
    }

    fn announce(&self, message: &str) {
        if !self.quiet {
            println!("{}", self.output.colorize(message, &Color::Green, true));
        }
    }

    fn create_progress_bar(&self, message: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .map(|s| s.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "))
        {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb
    }
}

fn configured_tool(path: Option<&Path>, name: &str) -> String {
    path.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

/// Selection from command-line flags, with unset flags taken from the
/// configuration.
pub fn selection_from_args(config: &AppConfig, args: &SelectionArgs) -> Result<SelectionConfig> {
    let mut builder: SelectionConfigBuilder = config.selection_defaults()?;

    if !args.video.is_empty() {
        builder = builder.video_flavors(args.video.iter().copied());
    }
    if !args.video_index.is_empty() {
        builder = builder.video_indexes(args.video_index.iter().copied());
    }
    if !args.audio.is_empty() {
        builder = builder.audio_languages(args.audio.iter().cloned());
    }
    if !args.layout.is_empty() {
        builder = builder.audio_layouts(args.layout.iter().copied());
    }
    if args.audio_description {
        builder = builder.include_audio_description(true);
    } else if args.no_audio_description {
        builder = builder.include_audio_description(false);
    }
    if let Some(subtitles) = &args.subtitles {
        builder = builder.subtitles(subtitles.clone());
    }
    if let Some(language) = &args.default_subtitle {
        builder = builder.default_subtitle_language(Some(language.clone()));
    }
    if let Some(dir) = &args.download_dir {
        builder = builder.download_dir(dir);
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendition::{AudioLayout, DynamicRange, SubtitleSelection, VideoSelection};
    use std::path::PathBuf;

    #[test]
    fn test_flags_override_config() {
        let config = AppConfig {
            audio_languages: vec!["fr".to_string()],
            include_audio_description: true,
            ..AppConfig::default()
        };
        let args = SelectionArgs {
            video: vec![DynamicRange::Hdr10],
            audio: vec!["en".to_string(), "de".to_string()],
            layout: vec![AudioLayout::Atmos],
            subtitles: Some(SubtitleSelection::none()),
            download_dir: Some(PathBuf::from("/tmp/event")),
            ..SelectionArgs::default()
        };

        let selection = selection_from_args(&config, &args).unwrap();
        assert_eq!(
            selection.video,
            VideoSelection::Flavors(vec![DynamicRange::Hdr10])
        );
        assert_eq!(selection.audio_languages, vec!["en", "de"]);
        assert_eq!(selection.audio_layouts, vec![AudioLayout::Atmos]);
        assert!(selection.include_audio_description);
        assert!(selection.subtitles.is_none());
        assert_eq!(selection.download_dir, PathBuf::from("/tmp/event"));
    }

    #[test]
    fn test_config_defaults_apply() {
        let config = AppConfig {
            video_flavors: vec![DynamicRange::DolbyVision, DynamicRange::Sdr],
            subtitles: "en,ja".to_string(),
            default_subtitle_language: Some("en".to_string()),
            ..AppConfig::default()
        };
        let args = SelectionArgs {
            video_index: vec![4, 1],
            ..SelectionArgs::default()
        };

        let selection = selection_from_args(&config, &args).unwrap();
        assert_eq!(selection.video, VideoSelection::Indexes(vec![4, 1]));
        assert_eq!(
            selection.subtitles,
            SubtitleSelection::Languages(vec!["en".to_string(), "ja".to_string()])
        );
        assert_eq!(selection.default_subtitle_language.as_deref(), Some("en"));
        assert_eq!(selection.audio_languages, vec!["en"]);
    }

    #[test]
    fn test_flag_disables_configured_audio_description() {
        let config = AppConfig {
            include_audio_description: true,
            ..AppConfig::default()
        };

        let selection = selection_from_args(&config, &SelectionArgs::default()).unwrap();
        assert!(selection.include_audio_description);

        let args = SelectionArgs {
            no_audio_description: true,
            ..SelectionArgs::default()
        };
        let selection = selection_from_args(&config, &args).unwrap();
        assert!(!selection.include_audio_description);
    }

    #[test]
    fn test_configured_tool_names() {
        assert_eq!(configured_tool(None, "ffmpeg"), "ffmpeg");
        assert_eq!(
            configured_tool(Some(Path::new("/opt/bin/ffmpeg")), "ffmpeg"),
            "/opt/bin/ffmpeg"
        );
    }
}
