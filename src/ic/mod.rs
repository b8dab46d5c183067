//! Internet Computer collaborators: the agent transport and the asset
//! certificate verifier.

pub mod agent;
pub mod certification;
pub mod types;

pub use agent::{AgentTransport, AgentTransportFactory};
pub use certification::CertificateVerifier;
