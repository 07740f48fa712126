use crate::money::Money;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("insufficient funds: balance {balance} is below price {price}")]
    InsufficientFunds { balance: Money, price: Money },

    #[error("no item with id {0:?} in inventory")]
    ItemNotFound(String),

    #[error("no case with id {0:?} in catalog")]
    CaseNotFound(String),

    #[error("invalid case definition: {0}")]
    Definition(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("sign in to add funds")]
    SignedOut,

    #[error("cannot sign in as {0:?}")]
    InvalidIdentity(String),

    #[error("a case is already being opened")]
    OpeningInProgress,

    #[error("opening has already been revealed")]
    NotSpinning,

    #[error("no battle with id {0:?}")]
    BattleNotFound(String),

    #[error("battle {0:?} cannot be joined")]
    BattleNotJoinable(String),

    #[error("fairness check failed: {0}")]
    Fairness(String),

    #[error("failed to parse catalog")]
    Catalog(#[from] serde_json::Error),

    #[error("failed to read catalog")]
    Io(#[from] std::io::Error),
}
