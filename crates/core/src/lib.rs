//! # HRC Core
//!
//! Core logic for the health-record console.
//!
//! This crate contains the pure client-side logic:
//! - Domain records and the decoders that build them from service payloads
//! - The session store (current identity, persisted across restarts)
//! - The risk-assessment flow: ratings, request, response parsing and risk tiers
//! - Form validation and configuration resolved at startup
//!
//! **No transport concerns**: HTTP calls to the remote services live in `hrc-gateway`, the
//! local console routes in `api-rest`.

pub mod config;
pub mod constants;
pub mod error;
pub mod forms;
pub mod mapper;
pub mod records;
pub mod risk;
pub mod session;

pub use config::{ConsoleConfig, Service, ServiceEndpoints};
pub use constants::*;
pub use error::{ConsoleError, ConsoleResult};
pub use hrc_types::{EmailAddress, NonEmptyText, TextError};
pub use mapper::{MapError, MapResult};
pub use records::{
    Account, AccountIdentity, ClinicalEnums, DecisionDataset, DoctorProfile, ModelKind,
    ModelRef, Patient, Role, SessionIdentity, Widgets,
};
pub use risk::{
    AssessmentFlow, AssessmentReport, ComponentLine, FlowError, FlowState, RankingDialog,
    RelevanceRatings, RiskAssessmentRequest, RiskTier,
};
pub use session::{FileStorage, MemoryStorage, SessionStorage, SessionStore};
