use crate::data::{Case, ScheduleSolution, SolverConfig};
use crate::solver;
use crate::verifier::{self, VerificationReport};
use axum::{Json, Router, routing::post};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SolveRequest {
    case: Case,
    #[serde(default)]
    config: SolverConfig,
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    case: Case,
    solution: ScheduleSolution,
    #[serde(default)]
    config: SolverConfig,
}

async fn solve_handler(
    Json(request): Json<SolveRequest>,
) -> Result<Json<ScheduleSolution>, (axum::http::StatusCode, String)> {
    match solver::solve(&request.case, &request.config) {
        Ok(solution) => Ok(Json(solution)),
        Err(e) => Err((axum::http::StatusCode::BAD_REQUEST, e.to_string())),
    }
}

async fn verify_handler(
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerificationReport>, (axum::http::StatusCode, String)> {
    if let Err(e) = request.case.validate() {
        return Err((axum::http::StatusCode::BAD_REQUEST, e.to_string()));
    }
    Ok(Json(verifier::verify(
        &request.case,
        &request.solution,
        &request.config,
    )))
}

pub async fn run_server() {
    let app = Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .route("/v1/schedule/verify", post(verify_handler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080")
        .await
        .unwrap();

    println!("Server running at http://{}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
