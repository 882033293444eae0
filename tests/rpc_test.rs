//! RpcProvider failover against local HTTP endpoints

use alloy_primitives::Address;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use token_compliance::models::types::BytecodeFlag;
use token_compliance::{
    AnalysisConfig, BytecodeAnalyzer, ErrorCode, LedgerProvider, RpcConfig, RpcProvider,
};

const TIMEOUT: Duration = Duration::from_secs(1);

/// Accepts connections and never answers
async fn hanging_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    url
}

/// Answers every JSON-RPC request with `result`
async fn answering_endpoint(result: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_err() {
                    return;
                }
                let body = format!(r#"{{"jsonrpc":"2.0","id":1,"result":"{}"}}"#, result);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    url
}

/// Reads headers and a Content-Length body
async fn read_request(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return Ok(());
            }
        }
    }
}

fn provider(primary: &str, fallback: &str) -> RpcProvider {
    let config = RpcConfig::new(primary)
        .with_fallback(fallback)
        .with_timeout(TIMEOUT)
        .with_max_retries(1);
    RpcProvider::new(&config).unwrap()
}

fn analysis_config() -> AnalysisConfig {
    AnalysisConfig {
        call_timeout: TIMEOUT,
        ..AnalysisConfig::default()
    }
}

#[tokio::test]
async fn test_bytecode_fetch_reaches_fallback_when_primary_hangs() {
    let primary = hanging_endpoint().await;
    let fallback = answering_endpoint("0x6000f400").await;
    let rpc = provider(&primary, &fallback);
    assert!(rpc.call_deadline(TIMEOUT) > TIMEOUT * 2);

    let report = BytecodeAnalyzer::new(Arc::new(rpc), analysis_config())
        .analyze_bytecode(Address::repeat_byte(0x42))
        .await
        .unwrap();

    assert_eq!(report.risk_score, 70);
    assert_eq!(report.bytecode_size, 4);
    assert!(report.flags.contains(&BytecodeFlag::ProxyDetected));
}

#[tokio::test]
async fn test_both_endpoints_down_reports_no_endpoints() {
    let primary = hanging_endpoint().await;
    let fallback = hanging_endpoint().await;
    let start = Instant::now();

    let err = BytecodeAnalyzer::new(Arc::new(provider(&primary, &fallback)), analysis_config())
        .analyze_bytecode(Address::repeat_byte(0x42))
        .await
        .unwrap_err();

    // The provider's own verdict, not the engine deadline
    assert_eq!(err.code, ErrorCode::RpcNoEndpoints);
    assert!(start.elapsed() >= TIMEOUT * 2);
}
