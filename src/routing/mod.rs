//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest (url, headers, referrer)
//!     → router.rs (classify)
//!     → matcher.rs (path prefixes, raw and foreign origins)
//!     → Return: Route::{Api, Reserved, Canister, Passthrough, Unresolved}
//! ```
//!
//! # Design Decisions
//! - Built once at startup, immutable at runtime
//! - Deterministic: same input always yields the same route
//! - First match wins, in a fixed order

pub mod matcher;
pub mod router;

pub use router::{Route, Router};
