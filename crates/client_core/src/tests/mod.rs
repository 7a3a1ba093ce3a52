use axum::Router;
use tokio::net::TcpListener;

mod table_tests;

/// Binds the given router on an ephemeral port and returns its base URL.
pub(crate) async fn spawn_relay(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}
