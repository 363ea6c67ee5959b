pub mod cache;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use cache::{InMemoryMetadataCache, MetadataCache};
pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};
pub use self::redis::{create_redis_client, CacheWriterHandle, RedisMetadataCache};
pub use store::{HouseholdStore, LibraryStore};

#[cfg(test)]
pub use store::{MockHouseholdStore, MockLibraryStore};
