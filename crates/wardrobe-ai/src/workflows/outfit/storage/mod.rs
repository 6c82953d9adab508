pub mod memory;
pub mod postgres;

pub use memory::{InMemoryCatalog, InMemoryRatingStore};
pub use postgres::{PgCatalog, PgRatingStore};
