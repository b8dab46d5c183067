//! HTTP gateway serving Internet Computer canisters with certificate
//! verification.

pub mod config;
pub mod gateway;
pub mod http;
pub mod ic;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
