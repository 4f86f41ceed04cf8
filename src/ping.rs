//! Liveness endpoint.

use crate::error::Result;
use crate::http::middleware::HttpRequest;
use crate::http::response::Envelope;

/// `GET /ping` → `"pong"`.
pub async fn ping(_req: HttpRequest) -> Result<Envelope<&'static str>> {
    Ok(Envelope::success(200, "pong"))
}
