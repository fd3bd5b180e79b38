pub mod asset;
pub mod history;

pub use asset::AssetSnapshot;
pub use history::{downsample, FreshnessPolicy, PriceHistory, PricePoint};
