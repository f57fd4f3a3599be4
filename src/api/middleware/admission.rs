//! Admission gate middleware for `/api`.

use axum::{
    extract::{ConnectInfo, Request, State, rejection::ExtensionRejection},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use crate::{error::AppError, state::AppState};

/// Runs the [`AdmissionPipeline`](crate::application::services::AdmissionPipeline)
/// and forwards admitted requests.
///
/// The peer address comes from the `ConnectInfo` extractor, which also
/// honors `MockConnectInfo` in tests; without it the request is keyed under
/// the fallback bucket.
///
/// # Example
///
/// ```rust,ignore
/// let api = api::routes::protected_routes()
///     .layer(middleware::from_fn_with_state(state.clone(), admission::layer));
/// ```
pub async fn layer(
    State(st): State<AppState>,
    connect_info: Result<ConnectInfo<SocketAddr>, ExtensionRejection>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = connect_info.ok().map(|ConnectInfo(addr)| addr.ip());

    let req = st.pipeline.admit(peer, req).await?;

    Ok(next.run(req).await)
}
