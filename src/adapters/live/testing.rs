//! Local servers for exercising the live adapters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Serves every HTTP request with the same canned status line and body.
pub(crate) async fn http_server(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/rpc", listener.local_addr().unwrap());
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            read_request(&mut stream).await;
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(reply.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    url
}

async fn read_request(stream: &mut TcpStream) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buffer);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buffer.len() >= end + 4 + length {
                return;
            }
        }
    }
}

/// JSON-RPC WebSocket service. Every reply is preceded by a notification.
/// Method `slow` is answered after 100 ms; method `hangup` drops the
/// connection without answering.
pub(crate) struct WsServer {
    pub url: String,
    pub connections: Arc<AtomicUsize>,
    pub close_frames: Arc<AtomicUsize>,
}

pub(crate) async fn ws_server() -> WsServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/socketrpc", listener.local_addr().unwrap());
    let connections = Arc::new(AtomicUsize::new(0));
    let close_frames = Arc::new(AtomicUsize::new(0));

    let (accepted, closed) = (Arc::clone(&connections), Arc::clone(&close_frames));
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(serve_ws(stream, Arc::clone(&closed)));
        }
    });
    WsServer { url, connections, close_frames }
}

async fn serve_ws(stream: TcpStream, close_frames: Arc<AtomicUsize>) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    while let Some(Ok(message)) = ws.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => {
                close_frames.fetch_add(1, Ordering::SeqCst);
                return;
            }
            _ => continue,
        };
        let request: Value = serde_json::from_str(&text).unwrap();
        let method = request["method"].as_str().unwrap_or_default().to_string();
        match method.as_str() {
            "hangup" => return,
            "slow" => tokio::time::sleep(Duration::from_millis(100)).await,
            _ => {}
        }
        let notification = json!({"jsonrpc": "2.0", "method": "event", "params": {"Height": 7}});
        let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": {"answer_to": method}});
        for frame in [notification, reply] {
            if ws.send(Message::Text(frame.to_string())).await.is_err() {
                return;
            }
        }
    }
}
