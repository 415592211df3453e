pub mod air_quality;
pub mod broadcast;
pub mod health;
pub mod realtime;

/// Serve `app` on an ephemeral local port for socket-level tests.
#[cfg(test)]
pub(crate) async fn serve(app: axum::Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
