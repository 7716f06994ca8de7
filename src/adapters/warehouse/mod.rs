pub mod postgres;

pub use postgres::PostgresWarehouse;
