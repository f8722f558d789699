//! Transaction lookup endpoint.
//!
//! `GET <route>?id=<hex>&network=<name>` resolves a transaction through an
//! [`AccessService`](txlookup_access::AccessService), joins it with its block
//! and answers with a flattened [`TransactionView`].

mod error;
pub mod lookup;
pub mod server;
pub mod view;

pub use crate::error::ApiError;
pub use crate::lookup::{lookup_transaction, LookupParams};
pub use crate::server::{build_router, start_server, AppState, DEFAULT_ROUTE, HEALTH_ROUTE};
pub use crate::view::{BlockView, EventView, ImportView, KeyValue, TransactionView};
