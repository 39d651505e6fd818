pub mod db;
pub mod schema;
pub mod store;

pub use db::{create_db, create_memory_db, delete_value, get_value, set_value, DbPool};
pub use store::{ExpenseStore, StoreError, BUDGET_KEY, RECORDS_KEY};
