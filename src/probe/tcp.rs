//! Raw TCP probe (§4.4).

use std::time::Duration;

use tokio::net::TcpStream;

use super::AttemptOutcome;

/// Resolve `host:port`, open a stream socket, and connect under `timeout`.
/// Success iff the connect completes. `EHOSTUNREACH`/`EHOSTDOWN`-class
/// errors are quiet; connect timeout, refused, reset, and broken-pipe are
/// quiet (they are the expected shape of "not up yet"); anything else is
/// loud.
pub(super) async fn probe_tcp(host: &str, port: u16, timeout: Duration) -> AttemptOutcome {
    let target = format!("{host}:{port}");
    match tokio::time::timeout(timeout, TcpStream::connect(&target)).await {
        Ok(Ok(_stream)) => AttemptOutcome::Success,
        Ok(Err(err)) => classify(&target, &err),
        Err(_) => AttemptOutcome::QuietFailure(format!("{target}: connect timed out")),
    }
}

fn classify(target: &str, err: &std::io::Error) -> AttemptOutcome {
    use std::io::ErrorKind::*;

    let quiet = matches!(
        err.kind(),
        ConnectionRefused | ConnectionReset | ConnectionAborted | BrokenPipe
    ) || is_host_unreachable(err)
        || is_transient_resolution_error(err);

    let detail = format!("{target}: {err}");
    if quiet {
        AttemptOutcome::QuietFailure(detail)
    } else {
        AttemptOutcome::LoudFailure(detail)
    }
}

/// `EHOSTUNREACH`/`EHOSTDOWN`, checked via the raw OS error code rather than
/// `ErrorKind` so this does not depend on which unstable `io_error_more`
/// variants a given toolchain has stabilized.
fn is_host_unreachable(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EHOSTUNREACH || code == libc::EHOSTDOWN)
}

/// `EAI_AGAIN`/`EAI_NODATA` surface through `std::io::Error` as a raw OS
/// error on platforms that route resolution through `getaddrinfo`; treat
/// those as the same quiet, "try again later" class as a refused connect.
fn is_transient_resolution_error(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EAI_AGAIN || code == libc::EAI_NODATA)
}
