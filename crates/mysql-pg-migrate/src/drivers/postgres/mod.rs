//! PostgreSQL target driver.

mod dialect;
mod writer;

pub use dialect::PostgresDialect;
pub use writer::{PostgresWriter, TableWriteSession};
