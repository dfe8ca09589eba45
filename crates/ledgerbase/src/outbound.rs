use http::{Request, Response};
use once_cell::sync::Lazy;
use reqwest::Client;

use crate::error::GatewayError;

/// A single, global client, built once
static CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// Dispatch an `http::Request` through the shared `reqwest` client.
///
/// Non-2xx statuses are returned as responses, not errors; callers need the
/// status and body to distinguish credential failures from other rejections.
pub async fn call_outbound(req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, GatewayError> {
    let client = &*CLIENT;

    let method = req
        .method()
        .as_str()
        .parse::<reqwest::Method>()
        .map_err(|e| GatewayError::HttpError(e.to_string()))?;

    log::debug!("outbound {} {}", req.method(), req.uri());

    let mut rb = client.request(method, req.uri().to_string());

    // propagate headers
    for (name, value) in req.headers().iter() {
        let val_str = value
            .to_str()
            .map_err(|e| GatewayError::HttpError(e.to_string()))?;
        rb = rb.header(name.as_str(), val_str);
    }

    let resp = rb.body(req.into_body()).send().await?;

    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp.bytes().await?.to_vec();

    let mut builder = Response::builder().status(status.as_u16());
    for (name, value) in headers.iter() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }
    builder
        .body(bytes)
        .map_err(|e| GatewayError::HttpError(e.to_string()))
}
