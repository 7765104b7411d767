use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use rendition::{DownloadPlan, Rendition, RenditionCatalog};
use std::borrow::Cow;
use std::io::Write;
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};

/// One line of the stream matrix: every attribute of a video variant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "table-output", derive(Tabled))]
pub struct MatrixRow {
    pub index: usize,
    pub audio: String,
    pub average_bandwidth: String,
    pub bandwidth: u64,
    pub closed_captions: String,
    pub codecs: String,
    pub frame_rate: String,
    pub hdcp_level: String,
    pub resolution: String,
    pub subtitles: String,
    pub video: String,
    pub video_range: String,
}

impl MatrixRow {
    const HEADER: &'static str = "index,audio,average_bandwidth,bandwidth,closed_captions,codecs,frame_rate,hdcp_level,resolution,subtitles,video,video_range";

    fn from_rendition(rendition: &Rendition) -> Option<Self> {
        let video = rendition.as_video()?;
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Some(Self {
            index: rendition.id.index,
            audio: text(&video.audio_group),
            average_bandwidth: video
                .average_bandwidth
                .map(|b| b.to_string())
                .unwrap_or_default(),
            bandwidth: video.bandwidth,
            closed_captions: text(&video.closed_captions),
            codecs: video.codecs.clone(),
            frame_rate: video.frame_rate.map(|f| format!("{f:.3}")).unwrap_or_default(),
            hdcp_level: text(&video.hdcp_level),
            resolution: video.resolution_label().unwrap_or_default(),
            subtitles: text(&video.subtitle_group),
            video: rendition.group_id.clone(),
            video_range: video
                .video_range
                .clone()
                .unwrap_or_else(|| video.dynamic_range.to_string()),
        })
    }
}

pub fn stream_matrix(catalog: &RenditionCatalog<'_>) -> Vec<MatrixRow> {
    catalog
        .videos()
        .into_iter()
        .filter_map(MatrixRow::from_rendition)
        .collect()
}

#[cfg(feature = "table-output")]
#[derive(Tabled)]
struct PlanRow<'a> {
    rendition: String,
    name: Cow<'a, str>,
    language: Cow<'a, str>,
    flags: String,
    target: Cow<'a, str>,
}

fn flags(entry: &rendition::PlanEntry) -> String {
    let mut flags = Vec::new();
    if entry.label.default {
        flags.push("default");
    }
    if entry.label.visual_impaired {
        flags.push("audio-description");
    }
    if entry.label.forced {
        flags.push("forced");
    }
    flags.join(",")
}

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_catalog(
        &self,
        catalog: &RenditionCatalog<'_>,
        format: &OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.catalog_pretty(catalog)),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(catalog)?),
            OutputFormat::JsonCompact => Ok(serde_json::to_string(catalog)?),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(self.catalog_table(catalog)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => Ok(self.catalog_pretty(catalog)),
            OutputFormat::Csv => Ok(Self::matrix_csv(&stream_matrix(catalog))),
        }
    }

    pub fn format_plan(
        &self,
        plan: &DownloadPlan,
        commands: &[String],
        format: &OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.plan_pretty(plan, commands)),
            OutputFormat::Json | OutputFormat::JsonCompact => {
                let value = serde_json::json!({
                    "entries": plan.entries(),
                    "commands": commands,
                });
                if *format == OutputFormat::Json {
                    Ok(serde_json::to_string_pretty(&value)?)
                } else {
                    Ok(serde_json::to_string(&value)?)
                }
            }
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(self.plan_table(plan, commands)),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => Ok(self.plan_pretty(plan, commands)),
            OutputFormat::Csv => Ok(Self::plan_csv(plan)),
        }
    }

    fn catalog_pretty(&self, catalog: &RenditionCatalog<'_>) -> String {
        let mut output = String::new();

        output.push_str(&self.colorize("Video:", &Color::Green, true));
        output.push('\n');
        for group in &catalog.video {
            output.push_str(&format!(
                "  {}\n",
                self.colorize(&group.key.to_string(), &Color::Yellow, true)
            ));
            for rendition in &group.renditions {
                output.push_str(&self.rendition_line(rendition));
            }
        }

        output.push('\n');
        output.push_str(&self.colorize("Audio:", &Color::Green, true));
        output.push('\n');
        for group in &catalog.audio {
            output.push_str(&format!(
                "  {}\n",
                self.colorize(&group.key, &Color::Yellow, true)
            ));
            for rendition in &group.renditions {
                output.push_str(&self.rendition_line(rendition));
            }
        }

        output.push('\n');
        output.push_str(&self.colorize("Subtitles:", &Color::Green, true));
        output.push('\n');
        if catalog.subtitles.is_empty() {
            output.push_str("  (none)\n");
        }
        for group in &catalog.subtitles {
            output.push_str(&format!(
                "  {}\n",
                self.colorize(&group.key, &Color::Yellow, true)
            ));
            for rendition in &group.renditions {
                output.push_str(&self.rendition_line(rendition));
            }
        }

        output
    }

    fn rendition_line(&self, rendition: &Rendition) -> String {
        format!(
            "    [{}] {}\n",
            self.colorize(&rendition.id.index.to_string(), &Color::Cyan, false),
            rendition.describe()
        )
    }

    #[cfg(feature = "table-output")]
    fn catalog_table(&self, catalog: &RenditionCatalog<'_>) -> String {
        let mut output = Table::new(stream_matrix(catalog))
            .with(Style::modern())
            .to_string();
        output.push('\n');

        #[derive(Tabled)]
        struct MediaRow<'a> {
            index: usize,
            kind: String,
            language: Cow<'a, str>,
            name: Cow<'a, str>,
            group: Cow<'a, str>,
            details: String,
        }

        let rows: Vec<MediaRow<'_>> = catalog
            .audio
            .iter()
            .chain(catalog.subtitles.iter())
            .flat_map(|g| g.renditions.iter())
            .map(|r| MediaRow {
                index: r.id.index,
                kind: r.kind().to_string(),
                language: Cow::Borrowed(r.language().unwrap_or_default()),
                name: Cow::Borrowed(&r.name),
                group: Cow::Borrowed(&r.group_id),
                details: r.describe(),
            })
            .collect();

        if !rows.is_empty() {
            output.push_str(&Table::new(rows).with(Style::modern()).to_string());
            output.push('\n');
        }
        output
    }

    fn plan_pretty(&self, plan: &DownloadPlan, commands: &[String]) -> String {
        let mut output = String::new();

        output.push_str(&self.colorize("Download plan:", &Color::Green, true));
        output.push('\n');
        for entry in plan {
            let flags = flags(entry);
            output.push_str(&format!(
                "  {} {} -> {}{}\n",
                self.colorize(&entry.rendition.id.to_string(), &Color::Yellow, false),
                entry.label.name,
                self.colorize(&entry.target.display().to_string(), &Color::Blue, false),
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{flags}]")
                }
            ));
        }

        if !commands.is_empty() {
            output.push('\n');
            output.push_str(&self.colorize("Commands:", &Color::Green, true));
            output.push('\n');
            for command in commands {
                output.push_str(&self.colorize(command, &Color::Cyan, false));
                output.push('\n');
            }
        }

        output
    }

    #[cfg(feature = "table-output")]
    fn plan_table(&self, plan: &DownloadPlan, commands: &[String]) -> String {
        let rows: Vec<PlanRow<'_>> = plan
            .iter()
            .map(|e| PlanRow {
                rendition: e.rendition.id.to_string(),
                name: Cow::Borrowed(&e.label.name),
                language: Cow::Borrowed(e.label.language.as_deref().unwrap_or("-")),
                flags: flags(e),
                target: e.target.to_string_lossy(),
            })
            .collect();

        let mut output = Table::new(rows).with(Style::modern()).to_string();
        output.push('\n');
        for command in commands {
            output.push_str(command);
            output.push('\n');
        }
        output
    }

    fn matrix_csv(rows: &[MatrixRow]) -> String {
        let mut output = String::new();
        output.push_str(MatrixRow::HEADER);
        output.push('\n');
        for row in rows {
            output.push_str(&format!(
                "{},\"{}\",{},{},\"{}\",\"{}\",{},\"{}\",{},\"{}\",\"{}\",\"{}\"\n",
                row.index,
                Self::escape_csv(&row.audio),
                row.average_bandwidth,
                row.bandwidth,
                Self::escape_csv(&row.closed_captions),
                Self::escape_csv(&row.codecs),
                row.frame_rate,
                Self::escape_csv(&row.hdcp_level),
                row.resolution,
                Self::escape_csv(&row.subtitles),
                Self::escape_csv(&row.video),
                Self::escape_csv(&row.video_range),
            ));
        }
        output
    }

    fn plan_csv(plan: &DownloadPlan) -> String {
        let mut output = String::from("rendition,name,language,flags,uri,target\n");
        for entry in plan {
            output.push_str(&format!(
                "{},\"{}\",{},\"{}\",\"{}\",\"{}\"\n",
                entry.rendition.id,
                Self::escape_csv(&entry.label.name),
                entry.label.language.as_deref().unwrap_or_default(),
                flags(entry),
                Self::escape_csv(&entry.rendition.uri),
                Self::escape_csv(&entry.target.to_string_lossy()),
            ));
        }
        output
    }

    // Helper method to avoid unnecessary allocations when escaping CSV
    fn escape_csv(s: &str) -> Cow<'_, str> {
        if s.contains('"') {
            Cow::Owned(s.replace('"', "\"\""))
        } else {
            Cow::Borrowed(s)
        }
    }

    pub fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                    Color::Red => text.red(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold, self.colored);
            text.to_string()
        }
    }
}

pub enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
    Red,
}

pub fn write_output(content: &str, output_file: Option<&std::path::Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => {
            print!("{content}");
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}
