pub mod analytics;
pub mod detector;
pub mod helius;
pub mod mint_book;
pub mod poller;
pub mod store;
pub mod telegram;
pub mod token_age;
pub mod watcher;

pub use analytics::Analytics;
pub use detector::{AgeFilter, SellDetector};
pub use helius::{HeliusClient, PageQuery, TransactionSource};
pub use mint_book::MintBook;
pub use poller::{PollSettings, Poller};
pub use store::{connect_redis, MemorySeenStore, RedisSeenStore, SeenStore};
pub use telegram::{format_sell_alert, Notifier, TelegramNotifier};
pub use token_age::{AgeResolver, TokenAgeLookup};
pub use watcher::{BatchOutcome, SellWatcher};
