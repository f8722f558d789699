use crate::error::ApiError;
use crate::server::SharedState;
use crate::view::TransactionView;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use tracing::{debug, warn};
use txlookup_access::AccessService;

pub const MISSING_ID_MESSAGE: &str = "Specify id and/or network";

/// Query string accepted by the lookup endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupParams {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

impl LookupParams {
    /// Non-empty transaction id, if one was supplied.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Requested network, or `default_network` when absent or empty.
    pub fn network<'a>(&'a self, default_network: &'a str) -> &'a str {
        self.network
            .as_deref()
            .filter(|network| !network.is_empty())
            .unwrap_or(default_network)
    }
}

/// Resolve a transaction and its block, then flatten them.
pub async fn lookup_transaction(
    access: &dyn AccessService,
    id: &str,
    network: &str,
) -> Result<TransactionView, ApiError> {
    let session = access.connect(network).await.map_err(|err| {
        ApiError::bad_request(format!(
            "Cannot connect to network {network} for transaction with id {id} error:{err}"
        ))
    })?;

    let tx = session.get_transaction_by_id(id).await.map_err(|err| {
        ApiError::not_found(format!(
            "Cannot find transaction with id {id} on network {network} error:{err}"
        ))
    })?;

    let block = session.get_block_by_id(&tx.block_id).await.map_err(|err| {
        ApiError::not_found(format!(
            "Cannot find block for transaction with id {id} on network {network} error:{err}"
        ))
    })?;

    Ok(TransactionView::new(tx, block))
}

/// Encode a view as the JSON success response.
///
/// Encoding failures keep the not-found status clients already rely on.
pub fn json_response(view: &TransactionView, id: &str, network: &str) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(view).map_err(|err| {
        ApiError::not_found(format!(
            "Cannot marshal result as json for transaction with id {id} on network {network} error:{err}"
        ))
    })?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

pub(crate) async fn handle_lookup(
    State(state): State<SharedState>,
    Query(params): Query<LookupParams>,
) -> Result<Response, ApiError> {
    let Some(id) = params.id() else {
        debug!("lookup rejected: missing id");
        return Err(ApiError::bad_request(MISSING_ID_MESSAGE));
    };
    let network = params.network(&state.default_network);
    debug!(%id, %network, "looking up transaction");

    let result = match lookup_transaction(state.access.as_ref(), id, network).await {
        Ok(view) => json_response(&view, id, network),
        Err(err) => Err(err),
    };
    if let Err(err) = &result {
        warn!(%id, %network, status = %err.status, "lookup failed: {}", err.message);
    }
    result
}
