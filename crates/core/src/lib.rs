pub mod book;
pub mod category;
pub mod money;
pub mod period;
pub mod record;

pub use book::{ExpenseBook, DEFAULT_BUDGET};
pub use category::{Category, LedgerError};
pub use money::Yen;
pub use period::{DateRange, Month};
pub use record::{ExpenseRecord, LineItem, RecordId, RecordPatch};
