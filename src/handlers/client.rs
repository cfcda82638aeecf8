//! Client address echo endpoint.

use axum::Json;
use tracing::instrument;

use crate::middleware::ClientIp;
use crate::models::ClientIpResponse;

/// Report the address the service resolved for the caller.
///
/// The route is rate limited, so repeated calls from the same client
/// receive 429 once the window quota is spent.
///
/// # Response Body
///
/// ```json
/// { "client_ip": "203.0.113.7" }
/// ```
///
/// `client_ip` is empty when neither forwarding headers nor the peer
/// address are available.
#[instrument(skip_all, fields(client_ip = %ip.as_str()))]
pub async fn client_ip(ip: ClientIp) -> Json<ClientIpResponse> {
    Json(ClientIpResponse { client_ip: ip.0 })
}
