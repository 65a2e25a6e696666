//! The OAuth authorization flow.
//!
//! This command is the thin transport shim around the engine's
//! callback-handling function: it mints the anti-forgery state, opens the
//! consent URL in the user's browser, hosts a one-shot HTTP listener on the
//! configured redirect URI, and hands the returned code and state straight
//! to [`Scheduler::complete_authorization`]. All verification (state match,
//! mandatory refresh token) happens inside the engine.
//!
//! [`Scheduler::complete_authorization`]: meetslot_engine::Scheduler::complete_authorization

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use meetslot_engine::{Scheduler, pkce};
use tracing::{error, info, warn};
use url::Url;

use crate::error::{CliError, CliResult};

/// Timeout for waiting for the OAuth callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300); // 5 minutes

/// Runs the full authorization flow for one user.
pub async fn run(scheduler: &Scheduler, redirect_uri: &str, user_id: &str) -> CliResult<()> {
    let pending = scheduler.authorization_request(pkce::generate_state());
    let (listener, callback_path) = bind_callback_listener(redirect_uri)?;

    println!("Open this URL in your browser to authorize:");
    println!("\n{}\n", pending.authorization_url);
    if let Err(e) = open::that(&pending.authorization_url) {
        warn!("failed to open browser: {}", e);
    }

    info!("waiting for callback at {}", redirect_uri);
    let (code, state) = wait_for_callback(listener, callback_path)?;

    scheduler
        .complete_authorization(user_id, &pending, &code, &state)
        .await?;

    println!("Authorization complete: refresh credential stored for {user_id}.");
    Ok(())
}

/// Binds the listener described by the configured redirect URI and returns
/// it with the expected callback path.
fn bind_callback_listener(redirect_uri: &str) -> CliResult<(TcpListener, String)> {
    let url = Url::parse(redirect_uri)
        .map_err(|e| CliError::Auth(format!("invalid redirect URI {redirect_uri:?}: {e}")))?;

    let host = url.host_str().unwrap_or("127.0.0.1").to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| CliError::Auth("redirect URI has no port".to_string()))?;
    let path = url.path().to_string();

    let listener = TcpListener::bind((host.as_str(), port))?;
    Ok((listener, path))
}

/// Waits for the OAuth callback and extracts the code and echoed state.
fn wait_for_callback(listener: TcpListener, path: String) -> CliResult<(String, String)> {
    listener
        .set_nonblocking(false)
        .map_err(|e| CliError::Auth(format!("failed to set blocking: {e}")))?;

    let (tx, rx) = mpsc::channel();

    // Handle the callback in a separate thread to allow timeout
    let _handle = thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = handle_callback(stream, &path) {
                        let _ = tx.send(result);
                        return;
                    }
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    });

    match rx.recv_timeout(CALLBACK_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Err(CliError::Auth("timed out waiting for the OAuth callback".to_string()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(CliError::Auth("callback channel disconnected".to_string()))
        }
    }
}

/// Handles one incoming HTTP request on the callback listener.
///
/// Returns `None` for requests that are not the callback (wrong path or
/// method) so the accept loop keeps waiting.
fn handle_callback(mut stream: TcpStream, expected_path: &str) -> Option<CliResult<(String, String)>> {
    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();

    if reader.read_line(&mut request_line).is_err() {
        return None;
    }

    // Request line: GET /oauth2/callback?code=...&state=... HTTP/1.1
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 || parts[0] != "GET" {
        return None;
    }

    let target = parts[1];
    if !target.starts_with(expected_path) {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\n\r\nNot found");
        return None;
    }

    let query_start = target.find('?').map(|i| i + 1).unwrap_or(target.len());
    let query = &target[query_start..];

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for param in query.split('&') {
        let mut kv = param.splitn(2, '=');
        if let (Some(key), Some(value)) = (kv.next(), kv.next()) {
            match key {
                "code" => code = Some(urlencoding::decode(value).unwrap_or_default().into_owned()),
                "state" => {
                    state = Some(urlencoding::decode(value).unwrap_or_default().into_owned())
                }
                "error" => {
                    error = Some(urlencoding::decode(value).unwrap_or_default().into_owned())
                }
                _ => {}
            }
        }
    }

    let response = if error.is_some() || code.is_none() {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Failed</h1>\
        <p>You can close this window.</p></body></html>"
    } else {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Successful</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    };

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    if let Some(error) = error {
        return Some(Err(CliError::Auth(format!("authorization denied: {error}"))));
    }

    match (code, state) {
        (Some(code), Some(state)) => Some(Ok((code, state))),
        (Some(code), None) => Some(Ok((code, String::new()))),
        _ => Some(Err(CliError::Auth(
            "missing authorization code in callback".to_string(),
        ))),
    }
}
