pub mod cache;
pub mod history;
pub mod market;
pub mod refresher;
pub mod resolver;
pub mod store;

pub use cache::Cache;
pub use history::{apply_plan, HistoryReading, HistoryService, HistoryUpdate, RefreshPlan};
pub use market::MarketService;
pub use refresher::Refresher;
pub use resolver::SymbolResolver;
pub use store::DocumentStore;
