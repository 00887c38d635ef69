//! In-memory tuple store.

mod table;

pub use table::{Table, TableManager};
