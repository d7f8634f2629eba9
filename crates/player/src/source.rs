//! Stream source resolution: decides how a channel url reaches the media sink.

use tracing::debug;

use crate::channel::ChannelDescriptor;
use crate::config::HlsDetectionConfig;

/// What the platform can do, sampled when a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformCapabilities {
    /// The HLS transport library runs here.
    pub hls_library: bool,
    /// The media element plays HLS manifests on its own.
    pub native_hls: bool,
}

/// How a resolved source is attached to the media sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentPlan {
    /// Through a transport library instance; quality tiers and error
    /// classification are available.
    HlsMediated { url: String },
    /// Manifest set directly on an element with built-in HLS support.
    NativeHls { url: String },
    /// Plain progressive audio or video.
    Progressive { url: String },
}

impl AttachmentPlan {
    pub fn url(&self) -> &str {
        match self {
            Self::HlsMediated { url } | Self::NativeHls { url } | Self::Progressive { url } => url,
        }
    }

    #[inline]
    pub fn is_hls_mediated(&self) -> bool {
        matches!(self, Self::HlsMediated { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::HlsMediated { .. } => "hls-library",
            Self::NativeHls { .. } => "native-hls",
            Self::Progressive { .. } => "progressive",
        }
    }
}

/// Pure decision table from channel url and platform capabilities to a plan.
#[derive(Debug, Clone)]
pub struct StreamSourceResolver {
    suffixes: Vec<String>,
}

impl StreamSourceResolver {
    pub fn new(config: &HlsDetectionConfig) -> Self {
        Self {
            suffixes: config
                .manifest_suffixes
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether the url path ends in one of the manifest suffixes.
    pub fn is_hls_manifest(&self, url: &str) -> bool {
        let path = match url::Url::parse(url) {
            Ok(parsed) => parsed.path().to_ascii_lowercase(),
            // Relative or malformed urls: strip query and fragment by hand.
            Err(_) => url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase(),
        };
        self.suffixes.iter().any(|suffix| path.ends_with(suffix))
    }

    /// Resolution never fails; anything unrecognised is played progressively.
    pub fn resolve(
        &self,
        descriptor: &ChannelDescriptor,
        capabilities: PlatformCapabilities,
    ) -> AttachmentPlan {
        let url = descriptor.url.clone();
        let plan = if self.is_hls_manifest(&url) {
            if capabilities.hls_library {
                AttachmentPlan::HlsMediated { url }
            } else if capabilities.native_hls {
                AttachmentPlan::NativeHls { url }
            } else {
                AttachmentPlan::Progressive { url }
            }
        } else {
            AttachmentPlan::Progressive { url }
        };

        debug!(channel = %descriptor.name, plan = plan.kind(), "Resolved stream source");
        plan
    }
}

impl Default for StreamSourceResolver {
    fn default() -> Self {
        Self::new(&HlsDetectionConfig::default())
    }
}
