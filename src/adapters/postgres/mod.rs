//! PostgreSQL adapters built on sqlx.

mod dunning_repository;
mod notification_store;
mod profile_repository;

pub use dunning_repository::PostgresDunningRepository;
pub use notification_store::PostgresNotificationStore;
pub use profile_repository::PostgresProfileRepository;
