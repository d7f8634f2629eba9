use std::fmt::Write as _;

#[cfg(feature = "colored-output")]
use colored::*;
use frame_player::{AttachmentPlan, ChannelGroup, LogLevel, PlaybackSnapshot};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::probe::ProbeReport;
use crate::script::ScenarioReport;

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
    Red,
}

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    /// Serialize `value` when `format` is a JSON format, `None` otherwise.
    fn json<T: Serialize>(value: &T, format: OutputFormat) -> Result<Option<String>> {
        Ok(match format {
            OutputFormat::Json => Some(serde_json::to_string_pretty(value)?),
            OutputFormat::JsonCompact => Some(serde_json::to_string(value)?),
            OutputFormat::Pretty => None,
        })
    }

    pub fn format_plan(
        &self,
        url: &str,
        plan: &AttachmentPlan,
        format: OutputFormat,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Resolved<'a> {
            url: &'a str,
            plan: &'static str,
            hls_mediated: bool,
        }

        let resolved = Resolved {
            url,
            plan: plan.kind(),
            hls_mediated: plan.is_hls_mediated(),
        };
        if let Some(json) = Self::json(&resolved, format)? {
            return Ok(json);
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.colorize("Attachment plan:", &Color::Green, true));
        let _ = writeln!(out, "  {}: {}", self.label("URL"), self.colorize(url, &Color::Blue, false));
        let _ = writeln!(out, "  {}: {}", self.label("Plan"), self.colorize(plan.kind(), &Color::Cyan, false));
        let _ = writeln!(
            out,
            "  {}: {}",
            self.label("Quality tiers"),
            if plan.is_hls_mediated() { "available" } else { "none" }
        );
        Ok(out)
    }

    pub fn format_probe(&self, report: &ProbeReport, format: OutputFormat) -> Result<String> {
        if let Some(json) = Self::json(report, format)? {
            return Ok(json);
        }

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {}",
            self.colorize("Playlist:", &Color::Green, true),
            self.colorize(&report.url, &Color::Blue, false)
        );
        let _ = writeln!(out, "  {}: {}", self.label("Type"), report.playlist);
        if report.tiers.is_empty() {
            let _ = writeln!(out, "  No quality tiers, the player stays on auto");
            return Ok(out);
        }
        let _ = writeln!(
            out,
            "  {}: {}",
            self.label("Selector"),
            if report.shows_selector { "shown" } else { "hidden" }
        );
        for (tier, uri) in report.tiers.iter().zip(&report.variants) {
            let _ = writeln!(
                out,
                "  [{}] {:<10} {}",
                tier.index,
                self.colorize(&tier.label, &Color::Cyan, false),
                uri
            );
        }
        Ok(out)
    }

    pub fn format_groups(&self, groups: &[ChannelGroup], format: OutputFormat) -> Result<String> {
        if let Some(json) = Self::json(&groups, format)? {
            return Ok(json);
        }

        let mut out = String::new();
        for group in groups {
            let _ = writeln!(
                out,
                "{} ({})",
                self.colorize(&group.name, &Color::Green, true),
                group.channels.len()
            );
            for channel in &group.channels {
                let _ = writeln!(
                    out,
                    "  {:<24} {}",
                    self.colorize(&channel.name, &Color::Cyan, false),
                    channel.url
                );
            }
        }
        Ok(out)
    }

    pub fn format_scenario(&self, report: &ScenarioReport, format: OutputFormat) -> Result<String> {
        if let Some(json) = Self::json(report, format)? {
            return Ok(json);
        }

        let mut out = String::new();
        let title = report.name.as_deref().unwrap_or("scenario");
        let _ = writeln!(out, "{}", self.colorize(title, &Color::Green, true));

        let _ = writeln!(out, "{}", self.label("Snapshots"));
        for (index, snapshot) in report.snapshots.iter().enumerate() {
            let _ = writeln!(out, "  {:>3}. {}", index + 1, self.snapshot_line(snapshot));
        }

        if !report.debug_log.is_empty() {
            let _ = writeln!(out, "{}", self.label("Debug log"));
            for entry in &report.debug_log {
                let line = entry.to_string();
                let line = match entry.level {
                    LogLevel::Error => self.colorize(&line, &Color::Red, false),
                    LogLevel::Warn => self.colorize(&line, &Color::Yellow, false),
                    _ => line,
                };
                let _ = writeln!(out, "  {line}");
            }
        }

        let _ = writeln!(
            out,
            "{}: {}",
            self.label("Final"),
            self.snapshot_line(&report.final_snapshot)
        );
        let _ = writeln!(
            out,
            "{}: {} created, {} live",
            self.label("Transports"),
            report.transports_created,
            report.transports_live
        );
        Ok(out)
    }

    fn snapshot_line(&self, snapshot: &PlaybackSnapshot) -> String {
        let status = snapshot.status_line();
        if snapshot.shows_error_banner() {
            self.colorize(&status, &Color::Red, true)
        } else if snapshot.is_reconnecting {
            self.colorize(&status, &Color::Yellow, false)
        } else {
            status
        }
    }

    fn label(&self, text: &str) -> String {
        self.colorize(text, &Color::Yellow, false)
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
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
