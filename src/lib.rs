pub mod api;
pub mod capabilities;
pub mod config;
pub mod deck_store;
pub mod defaults;
pub mod errors;
pub mod logging;
pub mod models;
pub mod promotion;
pub mod session;
pub mod share_token;
pub mod storage;
pub mod workspace;

pub use capabilities::{IdSource, NotificationLog, Notifier, UuidIdSource};
pub use config::Config;
pub use deck_store::{DeckStore, SeedPolicy};
pub use errors::*;
pub use models::*;
pub use promotion::PromotionLevel;
pub use session::{Advance, Session, SessionState};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use workspace::Workspace;
