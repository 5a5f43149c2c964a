//! Response caching: key derivation, the durable TTL store, per-domain
//! lifetimes and the background expiry sweep.

pub mod domain;
pub mod key;
pub mod store;
pub mod sweeper;

pub use domain::DataDomain;
pub use key::{derive_key, CacheKey, KeyArg};
pub use store::PersistentCache;
pub use sweeper::spawn_sweeper;
