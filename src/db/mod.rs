pub mod connection;
pub mod schema;

pub use connection::make_pool;
pub use schema::{column_exists, list_tables_like, table_exists, validate_ident};
