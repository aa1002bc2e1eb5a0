//! Offline-resilient fetch stack
//!
//! Every REST call and static resource load goes through a tower service
//! stack: [`OfflineCacheLayer`] over [`HttpFetcher`]. The layer picks a
//! strategy per request class and resolves network failures from versioned
//! cache namespaces, so the request boundary never fails while offline.
//! Streaming sockets do not pass through this stack.
//!
//! - [`request`]: request/response values
//! - [`namespace`]: versioned namespace names
//! - [`storage`]: the [`CacheStorage`] seam and its in-memory backend
//! - [`layer`]: the routing middleware
//! - [`orchestrator`]: install/activate lifecycle and control messages
//! - [`network`]: the `reqwest` leg

pub mod layer;
pub mod namespace;
pub mod network;
pub mod orchestrator;
pub mod request;
pub mod storage;

pub use layer::{OfflineCache, OfflineCacheLayer, OfflineCacheService};
pub use namespace::{CacheKind, CacheNamespaces};
pub use network::HttpFetcher;
pub use orchestrator::{CacheOrchestrator, ControlMessage, LifecycleState};
pub use request::{FetchRequest, FetchResponse, RequestMode};
pub use storage::{CacheStorage, MemoryCacheStorage};
