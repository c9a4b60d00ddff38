pub mod accounts;

pub use accounts::PgAccountStore;
