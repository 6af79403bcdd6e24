// HTTP surface: POST /graphql behind the validity middleware

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Extension, Json, Router};
use graphql_validity::{validity_middleware, Executor, Request, Response, ValidityContext};
use tracing::{debug, info, warn};

pub fn router(executor: Executor) -> Router {
	Router::new()
		.route("/graphql", post(graphql))
		.layer(axum::middleware::from_fn(validity_middleware))
		.with_state(Arc::new(executor))
}

async fn graphql(
	State(executor): State<Arc<Executor>>,
	Extension(ctx): Extension<Arc<ValidityContext>>,
	Json(request): Json<Request>,
) -> Json<Response> {
	debug!(target: "validity::http", request_id = %ctx.request_id(), operation = ?request.operation_name, "graphql request");
	Json(executor.execute(request.with_validity(ctx)).await)
}

pub async fn serve(listen: SocketAddr, executor: Executor) -> anyhow::Result<()> {
	let listener = tokio::net::TcpListener::bind(listen).await?;
	info!(target: "validity", address = %listener.local_addr()?, "serving graphql");
	axum::serve(listener, router(executor))
		.with_graceful_shutdown(shutdown_signal())
		.await?;
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		warn!(target: "validity", error = %e, "failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
	info!(target: "validity", "shutting down");
}
