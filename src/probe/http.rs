//! HTTP(S) probe (§4.5).

use std::sync::OnceLock;
use std::time::Duration;

use super::AttemptOutcome;

fn client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .build()
            .expect("building the shared HTTP probe client")
    })
}

/// Issue a GET request under `timeout`. Success iff the response completes
/// without a transport error and the status is `< 400`. `502`/`503`/`504`
/// and connection-class transport errors are quiet; other failures are
/// loud. No redirects are followed beyond the client's default behavior.
pub(super) async fn probe_http(url: &str, timeout: Duration) -> AttemptOutcome {
    match tokio::time::timeout(timeout, client().get(url).send()).await {
        Ok(Ok(response)) => {
            let status = response.status();
            if status.as_u16() < 400 {
                AttemptOutcome::Success
            } else if matches!(status.as_u16(), 502 | 503 | 504) {
                AttemptOutcome::QuietFailure(format!("{url}: status {status}"))
            } else {
                AttemptOutcome::LoudFailure(format!("{url}: status {status}"))
            }
        }
        Ok(Err(err)) => classify(url, &err),
        Err(_) => AttemptOutcome::QuietFailure(format!("{url}: request timed out")),
    }
}

fn classify(url: &str, err: &reqwest::Error) -> AttemptOutcome {
    let detail = format!("{url}: {err}");
    if is_connection_class_error(err) {
        AttemptOutcome::QuietFailure(detail)
    } else {
        AttemptOutcome::LoudFailure(detail)
    }
}

/// Broken pipe, aborted, refused, reset, or timeout — the transport-level
/// errors §4.5 calls out as quiet regardless of their exact HTTP-layer
/// wrapping.
fn is_connection_class_error(err: &reqwest::Error) -> bool {
    use std::error::Error as _;

    if err.is_timeout() || err.is_connect() {
        return true;
    }
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
            use std::io::ErrorKind::*;
            if matches!(
                io_err.kind(),
                ConnectionRefused | ConnectionReset | ConnectionAborted | BrokenPipe | TimedOut
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_refused_is_quiet() {
        let outcome = probe_http("http://127.0.0.1:1/", Duration::from_secs(2)).await;
        assert!(matches!(outcome, AttemptOutcome::QuietFailure(_)));
    }
}
