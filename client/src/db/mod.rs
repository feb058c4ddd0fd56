//! Database layer: connection pool and record queries.

mod pool;
mod records;

pub use pool::{create_pool, run_migrations, Pool};
pub use records::*;
