//! # Ledger RPC Client
//!
//! A minimal blocking JSON-RPC client over raw HTTP/1.1 — one POST, one
//! response, connection closed. The kiosk talks to the ledger twice at
//! most per session (anchor fetch, optional submission), so a connection
//! pool or an async client would be machinery without a payoff. In a real
//! deployment, swap this for a proper HTTP client.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use aperture_core::ledger::{Anchor, LedgerError, LedgerRpc};
use aperture_core::transaction::SignedArtifact;

/// How long a single RPC round trip may take before the session gives up.
const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// A blocking JSON-RPC ledger client.
pub struct JsonRpcLedger {
    url: String,
}

impl JsonRpcLedger {
    /// Points the client at an RPC endpoint, e.g. `http://127.0.0.1:8899`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Submits a signed transaction. Outside the session's concerns — the
    /// session ends at the rendered code — but a kiosk operator can opt in.
    pub fn submit(&self, artifact: &SignedArtifact) -> Result<String> {
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"method":"sendTransaction","params":["{}"]}}"#,
            artifact.encoded,
        );
        let response = self.post(&body)?;
        let parsed: RpcResponse<String> =
            serde_json::from_str(&response).context("malformed sendTransaction response")?;
        parsed.into_result()
    }

    /// One blocking HTTP/1.1 POST, returning the response body.
    fn post(&self, body: &str) -> Result<String> {
        let (host, port, path) = parse_url(&self.url)?;
        let addr = format!("{}:{}", host, port);

        let stream = TcpStream::connect(&addr)
            .with_context(|| format!("failed to connect to {}", addr))?;
        stream.set_read_timeout(Some(RPC_TIMEOUT))?;
        stream.set_write_timeout(Some(RPC_TIMEOUT))?;
        let mut stream = stream;

        let request = format!(
            "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            path,
            host,
            body.len(),
            body,
        );
        stream.write_all(request.as_bytes())?;

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        let response = String::from_utf8_lossy(&buf);

        // Everything after the first blank line is the body.
        response
            .split_once("\r\n\r\n")
            .map(|(_, b)| b.trim().to_string())
            .ok_or_else(|| anyhow!("response had no header/body separator"))
    }
}

impl LedgerRpc for JsonRpcLedger {
    fn recent_anchor(&self) -> Result<Anchor, LedgerError> {
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"getLatestBlockhash","params":[]}"#;
        let response = self
            .post(body)
            .map_err(|e| LedgerError::AnchorFetchFailed(e.to_string()))?;
        parse_anchor(&response).map_err(|e| LedgerError::AnchorFetchFailed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Wire Shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl<T> RpcResponse<T> {
    fn into_result(self) -> Result<T> {
        if let Some(err) = self.error {
            return Err(anyhow!("rpc error {}: {}", err.code, err.message));
        }
        self.result.ok_or_else(|| anyhow!("rpc response had neither result nor error"))
    }
}

#[derive(Deserialize)]
struct BlockhashResult {
    value: BlockhashValue,
}

#[derive(Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

fn parse_anchor(body: &str) -> Result<Anchor> {
    let parsed: RpcResponse<BlockhashResult> =
        serde_json::from_str(body).context("malformed getLatestBlockhash response")?;
    let blockhash = parsed.into_result()?.value.blockhash;
    Anchor::from_base58(&blockhash).map_err(|e| anyhow!("bad blockhash: {e}"))
}

/// Just enough URL parsing to extract host, port, and path. Avoids pulling
/// in the `url` crate for a single use.
fn parse_url(url: &str) -> Result<(String, u16, String)> {
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| anyhow!("only http:// endpoints are supported, got {url}"))?;

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.rfind(':') {
        Some(i) => {
            let port = authority[i + 1..]
                .parse::<u16>()
                .with_context(|| format!("bad port in {url}"))?;
            (&authority[..i], port)
        }
        None => (authority, 80),
    };
    if host.is_empty() {
        return Err(anyhow!("missing host in {url}"));
    }

    Ok((host.to_string(), port, path.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn url_parsing_extracts_the_pieces() {
        assert_eq!(
            parse_url("http://127.0.0.1:8899").unwrap(),
            ("127.0.0.1".to_string(), 8899, "/".to_string())
        );
        assert_eq!(
            parse_url("http://ledger.example/rpc").unwrap(),
            ("ledger.example".to_string(), 80, "/rpc".to_string())
        );
        assert!(parse_url("https://no-tls-support").is_err());
        assert!(parse_url("http://:8899").is_err());
    }

    #[test]
    fn anchor_is_parsed_from_a_blockhash_response() {
        let hash = bs58_of([7u8; 32]);
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":{{"context":{{"slot":100}},"value":{{"blockhash":"{}","lastValidBlockHeight":200}}}}}}"#,
            hash,
        );
        let anchor = parse_anchor(&body).unwrap();
        assert_eq!(anchor.to_base58(), hash);
    }

    #[test]
    fn rpc_error_response_is_surfaced() {
        let body = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#;
        let err = parse_anchor(body).unwrap_err();
        assert!(err.to_string().contains("method not found"));
    }

    #[test]
    fn short_blockhash_is_rejected() {
        let body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":{{"value":{{"blockhash":"{}"}}}}}}"#,
            aperture_core::transaction::Pubkey::from_bytes([1u8; 32]).to_base58()[..10].to_string(),
        );
        assert!(parse_anchor(&body).is_err());
    }

    #[test]
    fn recent_anchor_round_trips_over_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let hash = bs58_of([9u8; 32]);

        let response_body = format!(
            r#"{{"jsonrpc":"2.0","id":1,"result":{{"value":{{"blockhash":"{}"}}}}}}"#,
            hash,
        );
        let server = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).unwrap();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                response_body.len(),
                response_body,
            );
            socket.write_all(response.as_bytes()).unwrap();
        });

        let client = JsonRpcLedger::new(format!("http://127.0.0.1:{}", port));
        let anchor = client.recent_anchor().unwrap();
        assert_eq!(anchor.to_base58(), hash);

        server.join().unwrap();
    }

    #[test]
    fn unreachable_endpoint_is_anchor_fetch_failed() {
        // A port nothing listens on.
        let client = JsonRpcLedger::new("http://127.0.0.1:1");
        assert!(matches!(
            client.recent_anchor(),
            Err(LedgerError::AnchorFetchFailed(_))
        ));
    }

    fn bs58_of(bytes: [u8; 32]) -> String {
        aperture_core::transaction::Pubkey::from_bytes(bytes).to_base58()
    }
}
