//! # HRC Gateway
//!
//! Async HTTP access to the remote health-record services.
//!
//! - [`Gateway`]: one method per remote operation, JSON in and out
//! - [`health`]: concurrent `/health` probes joined into a status table
//! - [`auth`] and [`assessment`]: the two workflows that combine a remote call with local
//!   state (the session store and the assessment flow)

pub mod assessment;
pub mod auth;
pub mod gateway;
pub mod health;

pub use gateway::Gateway;
pub use health::{HealthPoller, HealthProbe, ProbeReport, ServiceStatus, StatusTable};

use hrc_core::Service;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{service} service unreachable: {source}")]
    Transport {
        service: Service,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} service responded with status {status}: {body}")]
    Status {
        service: Service,
        status: u16,
        body: String,
    },
    #[error("{service} service returned an invalid payload: {source}")]
    Decode {
        service: Service,
        #[source]
        source: serde_json::Error,
    },
    #[error("{service} service did not answer within {}ms", .timeout.as_millis())]
    Timeout { service: Service, timeout: Duration },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl GatewayError {
    pub fn service(&self) -> Option<Service> {
        match self {
            GatewayError::Transport { service, .. }
            | GatewayError::Status { service, .. }
            | GatewayError::Decode { service, .. }
            | GatewayError::Timeout { service, .. } => Some(*service),
            GatewayError::Client(_) => None,
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
