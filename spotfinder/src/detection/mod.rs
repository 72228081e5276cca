pub mod config;
pub mod detector;

pub use config::{DetectionConfig, DEFAULT_CHANNEL_AXIS};
pub use detector::{detect_spots, Spot, SpotDetector};
