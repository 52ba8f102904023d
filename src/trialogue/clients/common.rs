use crate::client_wrapper::{BackendFailure, BackendFailureKind};
use serde::de::DeserializeOwned;

/// Join a provider base URL and an endpoint path without doubling the slash.
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Send a prepared request and decode the JSON body, mapping every failure mode onto a
/// [`BackendFailure`] for `backend`.
pub async fn send_and_decode<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    backend: &str,
) -> Result<T, BackendFailure> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            log::error!(
                "trialogue::clients::common::send_and_decode(...): {} transport error: {}",
                backend,
                err
            );
            let kind = if err.is_timeout() {
                BackendFailureKind::Timeout
            } else {
                BackendFailureKind::Transport
            };
            return Err(BackendFailure::new(backend, kind, err.to_string()));
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!(
            "trialogue::clients::common::send_and_decode(...): {} returned HTTP {}: {}",
            backend,
            status.as_u16(),
            body
        );
        return Err(BackendFailure::from_status(backend, status.as_u16(), body));
    }

    let bytes = response.bytes().await.map_err(|err| {
        BackendFailure::new(backend, BackendFailureKind::Transport, err.to_string())
    })?;

    serde_json::from_slice(&bytes).map_err(|err| {
        log::error!(
            "trialogue::clients::common::send_and_decode(...): {} sent an undecodable body: {}",
            backend,
            err
        );
        BackendFailure::new(
            backend,
            BackendFailureKind::MalformedResponse,
            format!("Failed to parse response: {}", err),
        )
    })
}
