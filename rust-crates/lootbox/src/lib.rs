pub mod battle;

pub mod catalog;

pub mod config;

pub mod error;

pub mod fairness;

pub mod leaderboard;

pub mod ledger;

pub mod money;

pub mod opening;

pub mod rarity;

pub mod resolver;

pub mod roll;

pub mod session;

pub use catalog::{
    Case,
    Catalog,
    Item,
};
pub use config::{
    OpeningConfig,
    StoreConfig,
};
pub use error::Error;
pub use money::Money;
pub use opening::Opening;
pub use rarity::{
    Rarity,
    RarityWeights,
};
pub use resolver::EmptyTierPolicy;
pub use session::Session;

pub type Result<T, E = Error> = std::result::Result<T, E>;
