use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::dto::{
    IssueQuery, IssueResponse, LineageQuery, SubmitJobResponse, TableQualityResponse,
};
use super::{ApiErr, AppState};
use crate::engine::{ConnectionCheck, ImpactReport};
use crate::jobs::{JobKind, JobView};
use crate::lineage::LineageGraph;
use crate::quality::Severity;
use crate::store::{ConnectionStatus, QualityOverview};

const HISTORY_LIMIT: u64 = 30;

async fn submit(
    state: &AppState,
    kind: JobKind,
    target_id: Uuid,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiErr> {
    let job_id = state.jobs.submit(kind, target_id).await.map_err(|existing| {
        ApiErr::conflict(format!(
            "A {} job is already in progress for this target (job_id: {existing})",
            kind.as_str()
        ))
    })?;
    Ok((StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id })))
}

// ---------- POST /connections/{id}/sync ----------

pub async fn submit_sync(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiErr> {
    state.engine.store().find_connection(id).await?;
    submit(&state, JobKind::Sync, id).await
}

// ---------- POST /connections/{id}/discover ----------

pub async fn submit_discover(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiErr> {
    let connection = state.engine.store().find_connection(id).await?;
    if connection.status != ConnectionStatus::Connected.as_str() {
        return Err(ApiErr::bad_request(
            "Connection must be connected before discovering lineage",
        ));
    }
    submit(&state, JobKind::Discover, id).await
}

// ---------- POST /connections/{id}/assess ----------

pub async fn submit_assess_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiErr> {
    state.engine.store().find_connection(id).await?;
    submit(&state, JobKind::AssessConnection, id).await
}

// ---------- POST /connections/{id}/test ----------

pub async fn test_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConnectionCheck>, ApiErr> {
    let check = state
        .engine
        .test_connection(id, CancellationToken::new())
        .await?;
    Ok(Json(check))
}

// ---------- POST /connections/{id}/disconnect ----------

pub async fn disconnect(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiErr> {
    state.engine.disconnect(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------- POST /tables/{id}/assess ----------

pub async fn submit_assess_table(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiErr> {
    state.engine.store().find_table(id).await?;
    submit(&state, JobKind::Assess, id).await
}

// ---------- GET /jobs/{job_id} ----------

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobView>, ApiErr> {
    state
        .jobs
        .status(job_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiErr::not_found("Job not found"))
}

// ---------- DELETE /jobs/{job_id} ----------

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, ApiErr> {
    if state.jobs.cancel(job_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiErr::not_found("Job not found or not running"))
    }
}

// ---------- GET /tables/{id}/quality ----------

pub async fn table_quality(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TableQualityResponse>, ApiErr> {
    let store = state.engine.store();
    let table = store.find_table(id).await?;
    let history = store.score_history(id, HISTORY_LIMIT).await?;
    let columns = store.columns_for_table(id).await?;
    Ok(Json(TableQualityResponse::new(table, history, columns)))
}

// ---------- GET /quality/overview ----------

pub async fn quality_overview(
    State(state): State<AppState>,
) -> Result<Json<QualityOverview>, ApiErr> {
    Ok(Json(state.engine.store().quality_overview().await?))
}

// ---------- GET /issues ----------

pub async fn list_issues(
    State(state): State<AppState>,
    Query(query): Query<IssueQuery>,
) -> Result<Json<Vec<IssueResponse>>, ApiErr> {
    let severity = query
        .severity
        .as_deref()
        .map(str::parse::<Severity>)
        .transpose()
        .map_err(ApiErr::bad_request)?;

    let issues = state
        .engine
        .store()
        .list_issues(severity, query.table_id)
        .await?;
    Ok(Json(issues.into_iter().map(IssueResponse::from).collect()))
}

// ---------- POST /issues/{id}/resolve ----------

pub async fn resolve_issue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IssueResponse>, ApiErr> {
    let issue = state.engine.store().resolve_issue(id).await?;
    Ok(Json(issue.into()))
}

// ---------- GET /lineage ----------

pub async fn lineage_graph(
    State(state): State<AppState>,
    Query(query): Query<LineageQuery>,
) -> Result<Json<LineageGraph>, ApiErr> {
    let graph = match query.table_id {
        Some(table_id) => state.engine.neighborhood(table_id, query.depth).await?,
        None => {
            let filter = query
                .connection_ids
                .as_deref()
                .map(parse_id_list)
                .transpose()?;
            state.engine.global_graph(filter.as_deref()).await?
        }
    };
    Ok(Json(graph))
}

fn parse_id_list(raw: &str) -> Result<Vec<Uuid>, ApiErr> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s).map_err(|_| ApiErr::bad_request(format!("invalid connection id: {s}")))
        })
        .collect()
}

// ---------- GET /lineage/impact/{table_id} ----------

pub async fn impact(
    State(state): State<AppState>,
    Path(table_id): Path<Uuid>,
) -> Result<Json<ImpactReport>, ApiErr> {
    Ok(Json(state.engine.impact(table_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::api_router;
    use crate::engine::tests::engine_with_shop;
    use crate::jobs::JobDispatcher;
    use crate::store::catalog_table_uuid;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use std::time::Duration;
    use tower::ServiceExt;

    async fn make_router() -> (Router, AppState, Uuid) {
        let (engine, _, conn_id) = engine_with_shop().await;
        let jobs = JobDispatcher::new(engine).with_retry(1, Duration::from_millis(10));
        let state = AppState::new(jobs);
        (api_router(state.clone(), &[]), state, conn_id)
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn refreshed(state: &AppState, conn_id: Uuid) {
        state
            .engine
            .refresh_connection(conn_id, CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_health_and_security_headers() {
        let (router, _, _) = make_router().await;
        let resp = router.oneshot(request(Method::GET, "/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
        assert_eq!(resp.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_discover_requires_connected_connection() {
        let (router, state, conn_id) = make_router().await;
        let uri = format!("/api/v1/connections/{conn_id}/discover");

        let resp = router.clone().oneshot(request(Method::POST, &uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        refreshed(&state, conn_id).await;
        let resp = router.oneshot(request(Method::POST, &uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body = json_body(resp).await;
        assert!(body["job_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_unknown_targets_are_404() {
        let (router, _, _) = make_router().await;
        let missing = Uuid::new_v4();
        for (method, uri) in [
            (Method::POST, format!("/api/v1/connections/{missing}/sync")),
            (Method::POST, format!("/api/v1/connections/{missing}/test")),
            (Method::POST, format!("/api/v1/connections/{missing}/disconnect")),
            (Method::POST, format!("/api/v1/tables/{missing}/assess")),
            (Method::GET, format!("/api/v1/tables/{missing}/quality")),
            (Method::GET, format!("/api/v1/jobs/{missing}")),
            (Method::DELETE, format!("/api/v1/jobs/{missing}")),
            (Method::POST, format!("/api/v1/issues/{missing}/resolve")),
            (Method::GET, format!("/api/v1/lineage/impact/{missing}")),
        ] {
            let resp = router.clone().oneshot(request(method, &uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            let body = json_body(resp).await;
            assert!(body["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_submitted_sync_job_can_be_polled() {
        let (router, _, conn_id) = make_router().await;
        let resp = router
            .clone()
            .oneshot(request(Method::POST, &format!("/api/v1/connections/{conn_id}/sync")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let job_id = json_body(resp).await["job_id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/jobs/{job_id}");
        let mut status = String::new();
        for _ in 0..50 {
            let resp = router.clone().oneshot(request(Method::GET, &uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let body = json_body(resp).await;
            status = body["status"].as_str().unwrap().to_string();
            if status != "running" {
                assert_eq!(body["kind"], "sync");
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, "completed");
    }

    #[tokio::test]
    async fn test_quality_and_issue_endpoints() {
        let (router, state, conn_id) = make_router().await;
        refreshed(&state, conn_id).await;
        let orders = catalog_table_uuid(conn_id, "public", "orders");
        state
            .engine
            .assess(orders, CancellationToken::new())
            .await
            .unwrap();

        let resp = router
            .clone()
            .oneshot(request(Method::GET, &format!("/api/v1/tables/{orders}/quality")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["table_name"], "orders");
        assert!(body["latest"]["composite_score"].is_number());
        assert_eq!(body["history"].as_array().unwrap().len(), 0);
        assert!(!body["columns"].as_array().unwrap().is_empty());

        let resp = router
            .clone()
            .oneshot(request(Method::GET, "/api/v1/issues?severity=urgent"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = router
            .clone()
            .oneshot(request(Method::GET, &format!("/api/v1/issues?table_id={orders}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let issues = json_body(resp).await;
        let issues = issues.as_array().unwrap();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i["issue_type"] == "duplicate_ids"));

        let issue_id = issues[0]["id"].as_str().unwrap();
        let resp = router
            .clone()
            .oneshot(request(Method::POST, &format!("/api/v1/issues/{issue_id}/resolve")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["is_resolved"], true);

        let resp = router
            .oneshot(request(Method::GET, &format!("/api/v1/issues?table_id={orders}")))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_and_connection_check() {
        let (router, state, conn_id) = make_router().await;
        refreshed(&state, conn_id).await;

        let resp = router
            .clone()
            .oneshot(request(Method::POST, &format!("/api/v1/connections/{conn_id}/test")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["success"], true);

        let resp = router
            .clone()
            .oneshot(request(Method::POST, &format!("/api/v1/connections/{conn_id}/disconnect")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = router
            .clone()
            .oneshot(request(Method::GET, "/api/v1/lineage"))
            .await
            .unwrap();
        assert!(json_body(resp).await["nodes"].as_array().unwrap().is_empty());

        // discovery needs the connection back
        let resp = router
            .oneshot(request(Method::POST, &format!("/api/v1/connections/{conn_id}/discover")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_quality_overview_endpoint() {
        let (router, state, conn_id) = make_router().await;
        let resp = router
            .clone()
            .oneshot(request(Method::GET, "/api/v1/quality/overview"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let empty = json_body(resp).await;
        assert_eq!(empty["overall_score"], 0.0);
        assert_eq!(empty["total_issues"], 0);

        refreshed(&state, conn_id).await;
        let orders = catalog_table_uuid(conn_id, "public", "orders");
        let assessment = state
            .engine
            .assess(orders, CancellationToken::new())
            .await
            .unwrap();

        let resp = router
            .oneshot(request(Method::GET, "/api/v1/quality/overview"))
            .await
            .unwrap();
        let overview = json_body(resp).await;
        assert_eq!(overview["scored_tables"], 1);
        assert_eq!(overview["total_issues"], 2);
        assert_eq!(overview["high_issues"], 2);
        let expected = (assessment.report.composite_score * 10.0).round() / 10.0;
        assert_eq!(overview["overall_score"].as_f64().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_lineage_endpoints() {
        let (router, state, conn_id) = make_router().await;
        refreshed(&state, conn_id).await;
        let orders = catalog_table_uuid(conn_id, "public", "orders");

        let resp = router
            .clone()
            .oneshot(request(Method::GET, &format!("/api/v1/lineage?table_id={orders}&depth=1")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let graph = json_body(resp).await;
        assert_eq!(graph["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(graph["edges"].as_array().unwrap().len(), 1);

        let resp = router
            .clone()
            .oneshot(request(Method::GET, &format!("/api/v1/lineage?connection_ids={conn_id}")))
            .await
            .unwrap();
        let graph = json_body(resp).await;
        assert_eq!(graph["nodes"].as_array().unwrap().len(), 4);
        assert_eq!(graph["edges"].as_array().unwrap().len(), 2);

        let resp = router
            .clone()
            .oneshot(request(Method::GET, "/api/v1/lineage?connection_ids=nope"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = router
            .oneshot(request(Method::GET, &format!("/api/v1/lineage/impact/{orders}")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let impact = json_body(resp).await;
        assert_eq!(impact["total_impacted"], 1);
        assert_eq!(impact["downstream_tables"][0]["table_name"], "customers");
    }
}
