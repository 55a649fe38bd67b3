pub mod connection;
pub mod filter;
pub mod schema;
pub mod store;
