//! Command-line argument types shared by the binaries.
//!
//! [`ChannelSelection`] parses the `--channels` list and [`DetectionArgs`]
//! overlays detection flags on a saved [`DetectionConfig`].

use clap::Args;
use std::path::PathBuf;
use std::str::FromStr;

use crate::detection::DetectionConfig;
use crate::error::SpotError;

/// Which channels of an image to process.
///
/// Parsed from `all` or a comma-separated list of indices and inclusive
/// ranges (`0,2`, `0-2`, `1, 3-4`). Indices are kept signed until
/// [`resolve`](Self::resolve) so a negative value is reported as out of range
/// rather than as a syntax error.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChannelSelection {
    #[default]
    All,
    List(Vec<i64>),
}

impl FromStr for ChannelSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(ChannelSelection::All);
        }

        let mut channels = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            // A leading '-' is a sign, not a range separator
            let separator = part
                .char_indices()
                .skip(1)
                .find(|&(_, c)| c == '-')
                .map(|(i, _)| i);
            match separator {
                Some(split) => {
                    let start = parse_index(&part[..split])?;
                    let end = parse_index(&part[split + 1..])?;
                    if end < start {
                        return Err(format!("Channel range '{part}' is reversed"));
                    }
                    channels.extend(start..=end);
                }
                None => channels.push(parse_index(part)?),
            }
        }

        if channels.is_empty() {
            return Err("Channel list is empty".to_string());
        }
        Ok(ChannelSelection::List(channels))
    }
}

fn parse_index(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| format!("Invalid channel index '{}'", s.trim()))
}

impl std::fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelSelection::All => write!(f, "all"),
            ChannelSelection::List(channels) => {
                let parts: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

impl ChannelSelection {
    /// Expand against a channel axis of length `extent`.
    ///
    /// # Errors
    /// `OutOfRange` naming `channel` for any index outside `[0, extent)`.
    pub fn resolve(&self, extent: usize) -> Result<Vec<usize>, SpotError> {
        match self {
            ChannelSelection::All => Ok((0..extent).collect()),
            ChannelSelection::List(channels) => channels
                .iter()
                .map(|&c| {
                    if c < 0 || c as u64 >= extent as u64 {
                        Err(SpotError::out_of_range("channel", c, extent))
                    } else {
                        Ok(c as usize)
                    }
                })
                .collect(),
        }
    }
}

/// Detection parameters shared by the command-line tools.
///
/// Values given on the command line override those from `--config`, which in
/// turn override the built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct DetectionArgs {
    /// JSON file with a saved detection configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Axis holding the channels (default: the image's channel axis)
    #[arg(long)]
    pub channel_axis: Option<usize>,

    /// Narrow Gaussian sigma in pixels [default: 1.0]
    #[arg(long)]
    pub sigma1: Option<f64>,

    /// Wide Gaussian sigma in pixels [default: 1.5]
    #[arg(long)]
    pub sigma2: Option<f64>,

    /// Minimum DoG response for a spot [default: 100]
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,
}

impl DetectionArgs {
    /// Build the effective configuration.
    ///
    /// `image_channel_axis` is the channel axis reported by the loader; it is
    /// used when neither the command line nor the config file names one.
    pub fn to_config(&self, image_channel_axis: Option<usize>) -> Result<DetectionConfig, SpotError> {
        let (mut config, from_file) = match &self.config {
            Some(path) => (DetectionConfig::load_from_file(path)?, true),
            None => (DetectionConfig::default(), false),
        };

        if let Some(axis) = self.channel_axis {
            config.channel_axis = axis;
        } else if let (false, Some(axis)) = (from_file, image_channel_axis) {
            config.channel_axis = axis;
        }
        if let Some(sigma1) = self.sigma1 {
            config.sigma1 = sigma1;
        }
        if let Some(sigma2) = self.sigma2 {
            config.sigma2 = sigma2;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }
}
