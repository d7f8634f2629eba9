//! Playlist probe: fetch an HLS playlist and derive the tier list the
//! quality tracker would build from it.

use std::time::Duration;

use frame_player::{LevelInfo, QualityTier, QualityTracker};
use m3u8_rs::{MasterPlaylist, Playlist};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub url: String,
    /// `master` or `media`.
    pub playlist: &'static str,
    pub tiers: Vec<QualityTier>,
    pub shows_selector: bool,
    /// Variant uris resolved against the playlist url, in tier order.
    pub variants: Vec<String>,
}

pub async fn probe(url: &str, timeout: Duration, user_agent: &str) -> Result<ProbeReport> {
    let playlist_url = Url::parse(url)?;
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?;

    info!(%playlist_url, "Fetching playlist");
    let response = client.get(playlist_url.clone()).send().await?;
    if !response.status().is_success() {
        return Err(AppError::Playlist(format!(
            "Failed to fetch playlist {playlist_url}: HTTP {}",
            response.status()
        )));
    }
    let bytes = response.bytes().await?;
    debug!(bytes = bytes.len(), "Playlist downloaded");

    parse_report(&playlist_url, &bytes)
}

pub fn parse_report(playlist_url: &Url, bytes: &[u8]) -> Result<ProbeReport> {
    match m3u8_rs::parse_playlist_res(bytes) {
        Ok(Playlist::MasterPlaylist(master)) => Ok(master_report(playlist_url, &master)),
        Ok(Playlist::MediaPlaylist(_)) => Ok(ProbeReport {
            url: playlist_url.to_string(),
            playlist: "media",
            tiers: Vec::new(),
            shows_selector: false,
            variants: Vec::new(),
        }),
        Err(e) => Err(AppError::Playlist(format!(
            "Failed to parse playlist: {e}"
        ))),
    }
}

fn master_report(playlist_url: &Url, master: &MasterPlaylist) -> ProbeReport {
    // I-frame only variants are not playable levels.
    let playable: Vec<_> = master
        .variants
        .iter()
        .filter(|variant| !variant.is_i_frame)
        .collect();

    let levels: Vec<LevelInfo> = playable
        .iter()
        .map(|variant| {
            let (width, height) = variant
                .resolution
                .map(|r| (to_u32(r.width), to_u32(r.height)))
                .unwrap_or_default();
            LevelInfo::new(width, height, variant.bandwidth)
        })
        .collect();

    let mut tracker = QualityTracker::new();
    let tiers = tracker.rebuild(&levels).to_vec();

    let variants = playable
        .iter()
        .map(|variant| {
            playlist_url
                .join(&variant.uri)
                .map_or_else(|_| variant.uri.clone(), |u| u.to_string())
        })
        .collect();

    ProbeReport {
        url: playlist_url.to_string(),
        playlist: "master",
        shows_selector: tracker.shows_selector(),
        tiers,
        variants,
    }
}

fn to_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720
mid/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=96000,CODECS=\"mp4a.40.2\"
audio/index.m3u8
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXT-X-MEDIA-SEQUENCE:0
#EXTINF:6.0,
seg0.ts
";

    #[test]
    fn master_playlist_yields_tiers() {
        let url = Url::parse("https://cdn.example/live/master.m3u8").unwrap();
        let report = parse_report(&url, MASTER.as_bytes()).unwrap();

        assert_eq!(report.playlist, "master");
        let labels: Vec<_> = report.tiers.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["360p", "720p", "96 kbps"]);
        assert!(report.shows_selector);
        assert_eq!(
            report.variants[1],
            "https://cdn.example/live/mid/index.m3u8"
        );
    }

    #[test]
    fn media_playlist_has_no_tiers() {
        let url = Url::parse("https://cdn.example/live/index.m3u8").unwrap();
        let report = parse_report(&url, MEDIA.as_bytes()).unwrap();
        assert_eq!(report.playlist, "media");
        assert!(report.tiers.is_empty());
        assert!(!report.shows_selector);
    }

    #[test]
    fn garbage_is_rejected() {
        let url = Url::parse("https://cdn.example/x.m3u8").unwrap();
        assert!(matches!(
            parse_report(&url, b"<html></html>"),
            Err(AppError::Playlist(_))
        ));
    }
}
