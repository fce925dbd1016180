pub mod block;
pub mod transaction;

pub use block::{Block, Header, Withdrawal};
pub use transaction::{
    AccessListItem, Eip1559Transaction, Eip2930Transaction, Eip4844Transaction,
    LegacyTransaction, Transaction, TransactionError,
};
