pub mod coingecko;
pub mod coinlore;
pub mod provider;

pub use coingecko::CoinGeckoClient;
pub use coinlore::CoinLoreClient;
pub use provider::{HistorySource, ListingSource};
