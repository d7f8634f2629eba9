//! Channel catalog collaborator.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::PlaybackError;
use crate::channel::{ChannelDescriptor, ChannelGroup};

/// Group name used for channels the catalog did not categorise.
pub const UNGROUPED: &str = "Other";

/// Source of channel and station lists, fetched independently of playback.
#[async_trait]
pub trait ChannelCatalog: Send + Sync {
    async fn groups(&self) -> Result<Vec<ChannelGroup>, PlaybackError>;

    /// Look a channel up by its identity.
    async fn find(&self, url: &str) -> Result<Option<ChannelDescriptor>, PlaybackError> {
        Ok(self
            .groups()
            .await?
            .into_iter()
            .flat_map(|group| group.channels)
            .find(|channel| channel.url == url))
    }
}

/// A catalog held in memory, typically loaded from a JSON document.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    groups: Vec<ChannelGroup>,
}

impl StaticCatalog {
    pub fn new(groups: Vec<ChannelGroup>) -> Self {
        Self { groups }
    }

    /// Group a flat channel list by each descriptor's `group`, keeping the
    /// order in which groups first appear.
    pub fn from_channels(channels: Vec<ChannelDescriptor>) -> Self {
        let mut groups: Vec<ChannelGroup> = Vec::new();
        for channel in channels {
            let name = channel
                .group
                .clone()
                .unwrap_or_else(|| UNGROUPED.to_string());
            match groups.iter_mut().find(|group| group.name == name) {
                Some(group) => group.channels.push(channel),
                None => groups.push(ChannelGroup::new(name, vec![channel])),
            }
        }
        Self { groups }
    }

    /// Accepts either a list of groups or a flat list of channels.
    pub fn from_json(json: &str) -> Result<Self, PlaybackError> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Document {
            Groups(Vec<ChannelGroup>),
            Channels(Vec<ChannelDescriptor>),
        }

        match serde_json::from_str::<Document>(json)? {
            Document::Groups(groups) => Ok(Self::new(groups)),
            Document::Channels(channels) => Ok(Self::from_channels(channels)),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json(&json).map_err(|e| {
            PlaybackError::catalog(format!("failed to parse {}: {}", path.display(), e))
        })?;
        debug!(
            path = %path.display(),
            groups = catalog.groups.len(),
            "Loaded channel catalog"
        );
        Ok(catalog)
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelDescriptor> {
        self.groups.iter().flat_map(|group| group.channels.iter())
    }
}

#[async_trait]
impl ChannelCatalog for StaticCatalog {
    async fn groups(&self) -> Result<Vec<ChannelGroup>, PlaybackError> {
        Ok(self.groups.clone())
    }
}
