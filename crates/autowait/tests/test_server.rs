// Test Server - Local HTTP server for the live DevTools tests
//
// Serves small fixture pages so a real browser can be driven without
// network access.

// Each test binary compiles this module separately.
#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Response, StatusCode},
    routing::get,
};
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// Test server handle
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start the test server on a random available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/", get(index_page))
            .route("/next.html", get(next_page))
            .route("/popup.html", get(popup_page));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");

        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Test server failed");
        });

        TestServer { addr, handle }
    }

    /// Base URL, with a trailing slash
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

fn html(body: &'static str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/html")
        .body(Body::from(body))
        .unwrap()
}

async fn index_page() -> Response<Body> {
    html(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>Shop</title>
  <style>
    .menu { transition: transform 200ms; transform: translateX(-100%); }
    .menu.open { transform: none; }
  </style>
</head>
<body>
  <h1 id="title">Welcome</h1>
  <ul class="items">
    <li class="item" data-test="item"><span class="name">Alpha</span> <span class="price">$1.00</span> <button class="add">Add</button></li>
    <li class="item" data-test="item"><span class="name">Beta</span> <span class="price">$2.50</span> <button class="add">Add</button></li>
    <li class="item" data-test="item"><span class="name">Gamma</span> <span class="price">$0.75</span> <button class="add">Add</button></li>
  </ul>
  <button id="counter" onclick="this.textContent = String(Number(this.textContent) + 1)">0</button>
  <button id="disabled" disabled>Disabled</button>
  <input id="name" oninput="document.getElementById('greeting').textContent = 'Hello ' + this.value">
  <p id="greeting"></p>
  <select id="sort">
    <option value="az">Name (A to Z)</option>
    <option value="lohi">Price (low to high)</option>
  </select>
  <button id="late" onclick="setTimeout(() => {
    const p = document.createElement('p');
    p.id = 'late-result';
    p.textContent = 'Arrived';
    document.body.appendChild(p);
  }, 200)">Later</button>
  <button id="open-menu" onclick="const m = document.querySelector('.menu'); m.hidden = false; requestAnimationFrame(() => m.classList.add('open'))">Menu</button>
  <nav class="menu" hidden><button id="close-menu" onclick="this.parentElement.hidden = true">Close</button></nav>
  <a id="next" href="/next.html">Next</a>
  <a id="popup" href="/popup.html" target="_blank">Popup</a>
</body>
</html>"#,
    )
}

async fn next_page() -> Response<Body> {
    html(
        r#"<!DOCTYPE html>
<html>
<head><title>Next</title></head>
<body><h1 id="title">Next page</h1></body>
</html>"#,
    )
}

async fn popup_page() -> Response<Body> {
    html(
        r#"<!DOCTYPE html>
<html>
<head><title>Popup</title></head>
<body><h1 id="title">Popup</h1></body>
</html>"#,
    )
}
