//! Types that represent the input data model, such as `Transaction` and `Mapping`.
mod amount;
mod mapping;
mod timestamp;
mod transaction;

pub use amount::{Amount, AmountError};
pub use mapping::{Column, Header, Mapping};
pub use timestamp::TimestampParser;
pub use transaction::{Transaction, Transactions, UNKNOWN_BENEFICIARY};
