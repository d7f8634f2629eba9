use serde::{Deserialize, Serialize};

/// Video resolution information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    #[inline]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when the transport did not report any dimensions.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.height == 0
    }

    /// Short vertical-resolution label such as `720p`.
    ///
    /// Returns `None` when the height is unknown.
    pub fn short_label(&self) -> Option<String> {
        if self.is_unknown() {
            None
        } else {
            Some(format!("{}p", self.height))
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Bitrate in bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bitrate(pub u64);

impl Bitrate {
    #[inline]
    pub fn from_bps(bps: u64) -> Self {
        Self(bps)
    }

    #[inline]
    pub fn bps(&self) -> u64 {
        self.0
    }

    /// Rounded kilobits per second.
    #[inline]
    pub fn kbps(&self) -> u64 {
        (self.0 + 500) / 1000
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Bitrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 >= 1_000_000 {
            write!(f, "{:.1} Mbps", self.0 as f64 / 1_000_000.0)
        } else {
            write!(f, "{} kbps", self.kbps())
        }
    }
}
