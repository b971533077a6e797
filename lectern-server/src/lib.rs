mod auth;
mod context;
mod docs;
mod errors;
mod gateway;
mod live_classes;
mod schemas;
mod serialized;

use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use context::ServerContext;
pub use gateway::Gateway;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

/// Starts the lectern server
pub async fn run_server(context: ServerContext) {
    let port = env::var("LECTERN_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .nest("/live-classes", live_classes::router())
        .route("/gateway", get(gateway::gateway_handler))
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    axum::serve(listener, router.into_make_service())
        .await
        .unwrap();
}
