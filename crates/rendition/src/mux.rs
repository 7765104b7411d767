//! Fetch and mux command generation.
//!
//! Every function here is pure: the same plan and options always produce the
//! same commands, and nothing is executed.

use std::path::{Path, PathBuf};

use crate::command::ToolCommand;
use crate::plan::{DownloadPlan, PlanEntry};

/// Tool locations and output settings for the generated commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxOptions {
    pub ffmpeg: String,
    pub mkvmerge: String,
    /// Muxed output file.
    pub output: PathBuf,
    /// Language written for video tracks, which carry none in the manifest.
    pub video_language: String,
}

impl Default for MuxOptions {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            mkvmerge: "mkvmerge".to_string(),
            output: PathBuf::from("output.mkv"),
            video_language: "und".to_string(),
        }
    }
}

impl MuxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    pub fn with_mkvmerge(mut self, mkvmerge: impl Into<String>) -> Self {
        self.mkvmerge = mkvmerge.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_video_language(mut self, language: impl Into<String>) -> Self {
        self.video_language = language.into();
        self
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Stream-copy one plan entry to its target file.
pub fn fetch_command(entry: &PlanEntry, options: &MuxOptions) -> ToolCommand {
    let mut cmd = ToolCommand::new(&options.ffmpeg);
    cmd.arg("-i")
        .arg(&entry.rendition.uri)
        .args(["-c", "copy"])
        .arg(path_arg(&entry.target));
    cmd
}

/// One ffmpeg command per plan entry, in plan order.
pub fn fetch_commands(plan: &DownloadPlan, options: &MuxOptions) -> Vec<ToolCommand> {
    plan.iter().map(|e| fetch_command(e, options)).collect()
}

/// The mkvmerge command combining every fetched file into
/// [`MuxOptions::output`]. Tracks keep plan order.
pub fn mkvmerge_command(plan: &DownloadPlan, options: &MuxOptions) -> ToolCommand {
    let mut cmd = ToolCommand::new(&options.mkvmerge);
    cmd.arg("--output").arg(path_arg(&options.output));

    for entry in plan {
        let label = &entry.label;
        let language = label.language.as_deref().unwrap_or(&options.video_language);

        cmd.arg("--language").arg(format!("0:{language}"));
        cmd.arg("--track-name").arg(format!("0:{}", label.name));
        if !label.default {
            cmd.arg("--default-track-flag").arg("0:no");
        }
        if label.visual_impaired {
            cmd.arg("--visual-impaired-flag").arg("0:yes");
        }
        if label.forced {
            cmd.arg("--forced-display-flag").arg("0:yes");
        }
        cmd.arg(path_arg(&entry.target));
    }

    cmd
}

/// Shell lines for the whole job: the fetch commands followed by the mux
/// command. An empty plan yields no lines.
pub fn generate_mux_commands(plan: &DownloadPlan, options: &MuxOptions) -> Vec<String> {
    if plan.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = fetch_commands(plan, options)
        .iter()
        .map(ToolCommand::to_shell_string)
        .collect();
    lines.push(mkvmerge_command(plan, options).to_shell_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::model::{AudioLayout, DynamicRange};
    use crate::resolver::resolve_selection;
    use crate::selection::SelectionConfig;

    const MASTER: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-aac",NAME="English",LANGUAGE="en",DEFAULT=YES,AUTOSELECT=YES,CHANNELS="2",URI="audio/en.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-aac",NAME="English AD",LANGUAGE="en",CHANNELS="2",CHARACTERISTICS="public.accessibility.describes-video",URI="audio/en_ad.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-eac3-atmos",NAME="English",LANGUAGE="en",CHANNELS="16/JOC",URI="audio/en_atmos.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="English",LANGUAGE="en",URI="subs/en.m3u8"
#EXT-X-MEDIA:TYPE=SUBTITLES,GROUP-ID="subs",NAME="Japanese",LANGUAGE="ja",URI="subs/ja.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=2000000,CODECS="avc1.640028,mp4a.40.2",VIDEO-RANGE=SDR,AUDIO="audio-stereo-aac",SUBTITLES="subs"
video/sdr.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=9000000,CODECS="dvh1.05.06,ec-3",VIDEO-RANGE=PQ,AUDIO="audio-eac3-atmos",SUBTITLES="subs"
video/dv.m3u8
"#;

    fn plan() -> DownloadPlan {
        let base = url::Url::parse("https://cdn.example.com/event/index.m3u8").unwrap();
        let manifest = Manifest::parse(MASTER.as_bytes(), Some(&base)).unwrap();
        let config = SelectionConfig::builder()
            .video_flavors([DynamicRange::DolbyVision, DynamicRange::Sdr])
            .audio_languages(["en"])
            .audio_layouts([AudioLayout::Stereo, AudioLayout::Atmos])
            .include_audio_description(true)
            .subtitle_languages(["en", "ja"])
            .default_subtitle_language(Some("en"))
            .build();
        resolve_selection(&manifest, &config).unwrap()
    }

    #[test]
    fn test_fetch_commands() {
        let commands = fetch_commands(&plan(), &MuxOptions::default());
        assert_eq!(commands.len(), 7);
        assert_eq!(
            commands[0].to_shell_string(),
            "ffmpeg -i https://cdn.example.com/event/video/dv.m3u8 -c copy downloads/video_1.ts"
        );
        assert_eq!(
            commands[3].to_shell_string(),
            "ffmpeg -i https://cdn.example.com/event/audio/en_atmos.m3u8 -c copy downloads/audio_2.eac3"
        );
    }

    #[test]
    fn test_mkvmerge_command() {
        let options = MuxOptions::new()
            .with_mkvmerge("/usr/bin/mkvmerge")
            .with_output("keynote.mkv");
        let cmd = mkvmerge_command(&plan(), &options);

        insta::assert_snapshot!(cmd.to_shell_string(), @"/usr/bin/mkvmerge --output keynote.mkv --language 0:und --track-name '0:Dolby Vision (dvh1.05.06)' downloads/video_1.ts --language 0:und --track-name '0:SDR (avc1.640028)' --default-track-flag 0:no downloads/video_0.ts --language 0:en --track-name 0:English downloads/audio_0.aac --language 0:en --track-name '0:English (Dolby Atmos)' --default-track-flag 0:no downloads/audio_2.eac3 --language 0:en --track-name '0:English AD' --default-track-flag 0:no --visual-impaired-flag 0:yes downloads/audio_1.aac --language 0:en --track-name 0:English downloads/subtitle_3.vtt --language 0:ja --track-name 0:Japanese --default-track-flag 0:no downloads/subtitle_4.vtt");
    }

    #[test]
    fn test_generate_is_deterministic() {
        let plan = plan();
        let options = MuxOptions::default();
        let first = generate_mux_commands(&plan, &options);

        assert_eq!(first.len(), plan.len() + 1);
        assert!(first.last().unwrap().starts_with("mkvmerge --output output.mkv"));
        assert_eq!(generate_mux_commands(&plan, &options), first);
    }

    #[test]
    fn test_empty_plan() {
        assert!(generate_mux_commands(&DownloadPlan::default(), &MuxOptions::default()).is_empty());
    }
}
