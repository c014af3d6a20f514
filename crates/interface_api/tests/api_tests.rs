//! Read API tests against an in-memory snapshot

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

use app_pipeline::adapters::InMemoryPipelineStore;
use app_pipeline::{AuditReader, AuditView, PipelineRunner, RunReport};
use core_kernel::{ClaimId, Currency, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_audit::{AuditQuery, ClaimAudit};
use domain_claims::{Payer, RawClaimRecord};
use domain_billing::ports::mock::MockTransactionSource;
use domain_claims::ports::mock::{MockClaimSource, MockPayerSource};
use domain_claims::UNKNOWN_PAYER_NAME;
use test_utils::{PayerFixtures, ScenarioFixtures};

use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};

fn scenario_runner(
    store: Arc<InMemoryPipelineStore>,
    claims: Vec<RawClaimRecord>,
) -> PipelineRunner {
    PipelineRunner::new(
        Arc::new(MockClaimSource::new(claims)),
        Arc::new(MockTransactionSource::new(ScenarioFixtures::transactions())),
        Arc::new(MockPayerSource::new(PayerFixtures::standard())),
        store,
        Currency::USD,
    )
}

/// Runs the pipeline once over the scenario extract and serves its snapshot
async fn app() -> Router {
    let store = Arc::new(InMemoryPipelineStore::new());
    scenario_runner(store.clone(), ScenarioFixtures::claims())
        .run()
        .await
        .unwrap();
    create_router(AppState::new(store, ApiConfig::default()))
}

/// Serves a store and lands one more pipeline run right after the first read
struct CommitAfterFirstRead {
    store: Arc<InMemoryPipelineStore>,
    pending: Mutex<Option<PipelineRunner>>,
}

impl CommitAfterFirstRead {
    async fn after_read<T>(&self, result: Result<T, PortError>) -> Result<T, PortError> {
        if let Some(runner) = self.pending.lock().await.take() {
            runner.run().await.unwrap();
        }
        result
    }
}

impl DomainPort for CommitAfterFirstRead {}

#[async_trait]
impl HealthCheckable for CommitAfterFirstRead {
    async fn health_check(&self) -> HealthCheckResult {
        self.store.health_check().await
    }
}

#[async_trait]
impl AuditReader for CommitAfterFirstRead {
    async fn audits(&self, query: &AuditQuery) -> Result<Vec<ClaimAudit>, PortError> {
        self.after_read(self.store.audits(query).await).await
    }

    async fn audit(&self, claim_id: &ClaimId) -> Result<Option<ClaimAudit>, PortError> {
        self.after_read(self.store.audit(claim_id).await).await
    }

    async fn payers(&self) -> Result<Vec<Payer>, PortError> {
        self.after_read(self.store.payers().await).await
    }

    async fn latest_run(&self) -> Result<Option<RunReport>, PortError> {
        self.after_read(self.store.latest_run().await).await
    }

    async fn view(&self, query: &AuditQuery) -> Result<AuditView, PortError> {
        self.after_read(self.store.view(query).await).await
    }
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn decimal(value: &Value) -> rust_decimal::Decimal {
    value.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_health_endpoints() {
    let (status, body) = get(app().await, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(app().await, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_lists_every_audit_row() {
    let (status, body) = get(app().await, "/api/v1/audits").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 5);
    assert_eq!(body["rows"][0]["claim_id"], "C1");
    assert_eq!(body["rows"][0]["exception_flag"], "UNDERPAID");
}

#[tokio::test]
async fn test_filters_by_payer_and_flag() {
    let (_, body) = get(app().await, "/api/v1/audits?payer=Aetna").await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["rows"][0]["claim_id"], "C2");
    assert_eq!(body["rows"][1]["claim_id"], "C5");

    let (_, body) = get(app().await, "/api/v1/audits?exception_flag=no_charge").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["rows"][0]["claim_id"], "C3");

    let encoded = UNKNOWN_PAYER_NAME.replace(' ', "%20").replace('/', "%2F");
    let (_, body) = get(app().await, &format!("/api/v1/audits?payer={encoded}")).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["rows"][0]["claim_id"], "C3");
}

#[tokio::test]
async fn test_filters_by_service_window() {
    let (status, body) = get(
        app().await,
        "/api/v1/audits?date_basis=service&start=2021-02-01",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["rows"][0]["claim_id"], "C3");
}

#[tokio::test]
async fn test_rejects_bad_filters() {
    let (status, body) = get(app().await, "/api/v1/audits?exception_flag=LATE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = get(app().await, "/api/v1/audits?start=2021-03-01&end=2021-01-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_single_audit_row() {
    let (status, body) = get(app().await, "/api/v1/audits/C1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["net_variance"]["amount"]), dec!(-20));
    assert_eq!(body["settlement_days"], 14);

    let (status, body) = get(app().await, "/api/v1/audits/C404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_payers_and_latest_run() {
    let (status, body) = get(app().await, "/api/v1/payers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = get(app().await, "/api/v1/runs/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["audit"]["audited_claims"], 5);
}

#[tokio::test]
async fn test_latest_run_missing_before_first_run() {
    let store = Arc::new(InMemoryPipelineStore::new());
    let app = create_router(AppState::new(store, ApiConfig::default()));
    let (status, _) = get(app, "/api/v1/runs/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_overview_report() {
    let (status, body) = get(app().await, "/api/v1/reports/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["data"]["claim_count"], 5);
    assert_eq!(body["data"]["underpaid_claims"], 1);
    assert_eq!(decimal(&body["data"]["total_charges"]["amount"]), dec!(425));
}

#[tokio::test]
async fn test_payer_scorecard_report() {
    let (status, body) = get(app().await, "/api/v1/reports/payers").await;
    assert_eq!(status, StatusCode::OK);
    let scores = body["data"].as_array().unwrap();
    assert_eq!(scores.len(), 3);
    assert_eq!(scores[0]["payer_name"], "Aetna");
    assert_eq!(scores[0]["risk_level"], "Strong");
    assert_eq!(scores[2]["payer_name"], "Medicare");
    assert_eq!(decimal(&scores[2]["net_variance"]["amount"]), dec!(-70));
}

#[tokio::test]
async fn test_scorecard_by_absolute_variance() {
    let (status, body) = get(
        app().await,
        "/api/v1/reports/payers?order=abs_net_variance&top=2",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let scores = body["data"].as_array().unwrap();
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0]["payer_name"], "Medicare");
    assert_eq!(scores[1]["payer_name"], "Aetna");

    let (status, _) = get(app().await, "/api/v1/reports/payers?order=loudest").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_report_never_mixes_two_runs() {
    let store = Arc::new(InMemoryPipelineStore::new());
    let first = scenario_runner(store.clone(), ScenarioFixtures::claims())
        .run()
        .await
        .unwrap();

    let late_claim = test_utils::RawClaimBuilder::new("C6").payer("MCR").build();
    let reader = Arc::new(CommitAfterFirstRead {
        store: store.clone(),
        pending: Mutex::new(Some(scenario_runner(store.clone(), vec![late_claim]))),
    });
    let app = create_router(AppState::new(reader, ApiConfig::default()));

    let (status, body) = get(app.clone(), "/api/v1/reports/overview").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["run_id"], first.run_id.to_string());
    assert_eq!(body["data"]["claim_count"], 5);

    // The second run landed after that read; the next report is all new.
    let second = store.latest_run().await.unwrap().unwrap();
    assert_ne!(second.run_id, first.run_id);
    let (_, body) = get(app, "/api/v1/reports/overview").await;
    assert_eq!(body["run_id"], second.run_id.to_string());
    assert_eq!(body["data"]["claim_count"], 6);
}

#[tokio::test]
async fn test_exception_and_monthly_reports() {
    let (status, body) = get(app().await, "/api/v1/reports/exceptions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);

    let (status, body) = get(app().await, "/api/v1/reports/monthly-payments?payer=Medicare").await;
    assert_eq!(status, StatusCode::OK);
    let trend = body["data"].as_array().unwrap();
    assert_eq!(trend.len(), 1);
    assert_eq!(trend[0]["month"], "2021-01");
    assert_eq!(decimal(&trend[0]["total_payments"]["amount"]), dec!(80));
}
