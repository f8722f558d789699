//! Read access to blockchain networks.
//!
//! [`AccessService`] and [`Session`] are the narrow capability interface the
//! lookup API depends on. [`FlowAccessService`] implements it over the Flow
//! Access REST API and [`MemoryAccessService`] keeps everything in memory.

pub mod cadence;
mod error;
pub mod flow;
mod model;
pub mod script;
mod service;

pub use crate::error::AccessError;
pub use crate::flow::{FlowAccessService, FlowSession, KNOWN_NETWORKS};
pub use crate::model::{Argument, Block, Event, Import, ProposalKey, Transaction};
pub use crate::service::{AccessService, MemoryAccessService, Session, DEFAULT_NETWORK};
