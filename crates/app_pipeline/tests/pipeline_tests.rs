//! End-to-end pipeline runs against in-memory and file adapters

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{ClaimId, Currency, PayerId, RunId};
use domain_audit::{AuditQuery, ExceptionFlag};
use domain_billing::ports::mock::MockTransactionSource;
use domain_billing::RawTransactionRecord;
use domain_claims::ports::mock::{MockClaimSource, MockPayerSource};
use domain_claims::{Payer, RawClaimRecord};

use app_pipeline::adapters::{InMemoryPipelineStore, JsonLinesClaimSource, JsonSnapshotStore};
use app_pipeline::{
    execute, AuditReader, FactState, PipelineError, PipelineRunner, PipelineStore, RunCommit,
    RunReport, SourceBatch,
};

fn claim(id: &str, payer: &str, service_date: &str) -> RawClaimRecord {
    RawClaimRecord {
        primary_payer_id: Some(payer.into()),
        service_date: Some(service_date.into()),
        claim_status: Some("BILLED".into()),
        ..RawClaimRecord::with_claim_id(id)
    }
}

fn tx(id: &str, claim: &str, kind: &str, amount: &str, date: &str) -> RawTransactionRecord {
    RawTransactionRecord {
        transaction_id: Some(id.into()),
        claim_id: Some(claim.into()),
        transaction_type: Some(kind.into()),
        amount: Some(amount.into()),
        effective_date: Some(date.into()),
        ..RawTransactionRecord::default()
    }
}

fn payers() -> Vec<Payer> {
    vec![
        Payer::new(PayerId::new("MCR").unwrap(), "Medicare"),
        Payer::new(PayerId::new("AET").unwrap(), "Aetna"),
    ]
}

struct Harness {
    claims: MockClaimSource,
    transactions: MockTransactionSource,
    store: Arc<InMemoryPipelineStore>,
    runner: PipelineRunner,
}

fn harness(claims: Vec<RawClaimRecord>, transactions: Vec<RawTransactionRecord>) -> Harness {
    let claim_source = MockClaimSource::new(claims);
    let transaction_source = MockTransactionSource::new(transactions);
    let store = Arc::new(InMemoryPipelineStore::new());
    let runner = PipelineRunner::new(
        Arc::new(claim_source.clone()),
        Arc::new(transaction_source.clone()),
        Arc::new(MockPayerSource::new(payers())),
        store.clone(),
        Currency::USD,
    );
    Harness {
        claims: claim_source,
        transactions: transaction_source,
        store,
        runner,
    }
}

fn id(value: &str) -> ClaimId {
    ClaimId::new(value).unwrap()
}

#[tokio::test]
async fn test_run_publishes_one_audit_row_per_claim() {
    let h = harness(
        vec![
            claim("C1", "MCR", "2021-01-01"),
            claim("C2", "AET", "2021-01-01"),
            claim("C3", "NOPE", "2021-01-01"),
        ],
        vec![
            tx("T1", "C1", "CHARGE", "100", "2021-01-02"),
            tx("T2", "C1", "PAYMENT", "60", "2021-01-10"),
            tx("T3", "C1", "PAYMENT", "20", "2021-01-15"),
            tx("T4", "C2", "CHARGE", "500", "2021-01-02"),
            tx("T5", "C2", "PAYMENT", "500", "2021-01-05"),
        ],
    );

    let report = h.runner.run().await.unwrap();
    assert_eq!(report.audit.audited_claims, 3);
    assert_eq!(report.claims.unresolved_primary_payers, 1);

    let c1 = h.store.audit(&id("C1")).await.unwrap().unwrap();
    assert_eq!(c1.net_variance.amount(), dec!(-20));
    assert_eq!(c1.exception_flag, ExceptionFlag::Underpaid);
    assert_eq!(c1.settlement_days, Some(14));

    let c2 = h.store.audit(&id("C2")).await.unwrap().unwrap();
    assert_eq!(c2.exception_flag, ExceptionFlag::Matched);

    let c3 = h.store.audit(&id("C3")).await.unwrap().unwrap();
    assert_eq!(c3.primary_payer_id, None);
    assert_eq!(c3.exception_flag, ExceptionFlag::NoCharge);

    let latest = h.store.latest_run().await.unwrap().unwrap();
    assert_eq!(latest.run_id, report.run_id);
}

#[tokio::test]
async fn test_rerun_on_unchanged_input_is_idempotent() {
    let h = harness(
        vec![claim("C1", "MCR", "2021-01-01")],
        vec![
            tx("T1", "C1", "CHARGE", "200", "2021-01-02"),
            tx("T2", "C1", "PAYMENT", "250", "2021-01-09"),
        ],
    );

    h.runner.run().await.unwrap();
    let first = h.store.snapshot().await;
    let second_report = h.runner.run().await.unwrap();
    let second = h.store.snapshot().await;

    assert_eq!(first.summaries, second.summaries);
    assert_eq!(first.audits, second.audits);
    assert_eq!(first.facts, second.facts);
    assert_eq!(second_report.transactions.appended, 0);
    assert_eq!(second_report.transactions.duplicates, 2);
}

#[tokio::test]
async fn test_orphan_included_once_claim_arrives() {
    let h = harness(
        vec![claim("C1", "MCR", "2021-01-01")],
        vec![tx("T9", "C2", "CHARGE", "75", "2021-01-03")],
    );

    let first = h.runner.run().await.unwrap();
    assert_eq!(first.orphans, 1);
    assert!(h.store.audit(&id("C2")).await.unwrap().is_none());

    // Incremental feed: the transaction is not re-delivered.
    h.transactions.set_records(vec![]).await;
    h.claims
        .set_records(vec![
            claim("C1", "MCR", "2021-01-01"),
            claim("C2", "AET", "2021-01-01"),
        ])
        .await;

    let second = h.runner.run().await.unwrap();
    assert_eq!(second.transactions.orphans_promoted, 1);
    assert_eq!(second.orphans, 0);

    let c2 = h.store.audit(&id("C2")).await.unwrap().unwrap();
    assert_eq!(c2.total_charges.amount(), dec!(75));
    assert_eq!(c2.exception_flag, ExceptionFlag::ZeroPay);
}

#[tokio::test]
async fn test_incremental_claim_batch_keeps_earlier_claims() {
    let h = harness(
        vec![claim("C1", "MCR", "2021-01-01"), claim("C2", "AET", "2021-01-01")],
        vec![
            tx("T1", "C1", "CHARGE", "100", "2021-01-02"),
            tx("T2", "C2", "CHARGE", "50", "2021-01-02"),
        ],
    );
    h.runner.run().await.unwrap();

    // Only C3 is new; C1 gets a payment without being re-delivered.
    h.claims.set_records(vec![claim("C3", "AET", "2021-02-01")]).await;
    h.transactions
        .set_records(vec![tx("T3", "C1", "PAYMENT", "100", "2021-01-20")])
        .await;
    let second = h.runner.run().await.unwrap();

    assert_eq!(second.claims.input_records, 1);
    assert_eq!(second.claims.carried_records, 2);
    assert_eq!(second.audit.audited_claims, 3);
    assert_eq!(second.audit.summaries_without_claim, 0);
    assert_eq!(second.orphans, 0);

    let c1 = h.store.audit(&id("C1")).await.unwrap().unwrap();
    assert_eq!(c1.exception_flag, ExceptionFlag::Matched);
    let c2 = h.store.audit(&id("C2")).await.unwrap().unwrap();
    assert_eq!(c2.primary_payer_id, Some(PayerId::new("AET").unwrap()));
    assert!(h.store.audit(&id("C3")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_newer_claim_record_replaces_carried_one() {
    let mut first = claim("C1", "MCR", "2021-01-01");
    first.updated_at = Some("2021-01-05T00:00:00Z".into());
    let h = harness(vec![first.clone()], vec![]);
    h.runner.run().await.unwrap();

    let mut moved = claim("C1", "AET", "2021-01-01");
    moved.updated_at = Some("2021-02-05T00:00:00Z".into());
    h.claims.set_records(vec![moved]).await;
    let second = h.runner.run().await.unwrap();
    assert_eq!(second.claims.updated_claims, 1);

    let c1 = h.store.audit(&id("C1")).await.unwrap().unwrap();
    assert_eq!(c1.primary_payer_id, Some(PayerId::new("AET").unwrap()));

    // Redelivering the older record does not roll the claim back.
    h.claims.set_records(vec![first]).await;
    h.runner.run().await.unwrap();
    let c1 = h.store.audit(&id("C1")).await.unwrap().unwrap();
    assert_eq!(c1.primary_payer_id, Some(PayerId::new("AET").unwrap()));
}

/// Computes a commit for one claim and the given transactions on top of `state`
fn commit_on(state: FactState, transactions: Vec<RawTransactionRecord>) -> RunCommit {
    let base_run = state.base_run;
    let batch = SourceBatch {
        claims: vec![claim("C1", "MCR", "2021-01-01")],
        transactions,
        payers: payers(),
    };
    let output = execute(batch, state, Currency::USD).unwrap();
    let report = RunReport::new(RunId::new_v7(), Utc::now(), Utc::now(), Currency::USD, &output);
    RunCommit {
        report,
        output,
        base_run,
    }
}

/// Two runs load the same state; the one that commits second must lose
async fn assert_overlapping_runs_keep_facts(store: &dyn PipelineStore) {
    let state_a = store.load_state().await.unwrap();
    let state_b = store.load_state().await.unwrap();

    let run_a = commit_on(state_a, vec![tx("T1", "C1", "CHARGE", "100", "2021-01-02")]);
    let run_a_id = run_a.report.run_id;
    store.commit(run_a).await.unwrap();

    let run_b = commit_on(state_b, vec![tx("T2", "C1", "PAYMENT", "40", "2021-01-09")]);
    let err = store.commit(run_b).await.unwrap_err();
    assert!(err.is_conflict());

    let state = store.load_state().await.unwrap();
    assert_eq!(state.base_run, Some(run_a_id));
    assert_eq!(state.facts.len(), 1);

    // Recomputed on the fresh state, the second run goes through and keeps T1.
    let retried = commit_on(state, vec![tx("T2", "C1", "PAYMENT", "40", "2021-01-09")]);
    store.commit(retried).await.unwrap();
    assert_eq!(store.load_state().await.unwrap().facts.len(), 2);
}

#[tokio::test]
async fn test_overlapping_runs_on_memory_store() {
    assert_overlapping_runs_keep_facts(&InMemoryPipelineStore::new()).await;
}

#[tokio::test]
async fn test_overlapping_runs_on_snapshot_file() {
    let dir = std::env::temp_dir().join(format!("claims-pipeline-{}", RunId::new_v7()));
    assert_overlapping_runs_keep_facts(&JsonSnapshotStore::new(dir.join("snapshot.json"))).await;
    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_view_reads_rows_payers_and_run_together() {
    let h = harness(
        vec![claim("C1", "MCR", "2021-01-01"), claim("C2", "AET", "2021-01-01")],
        vec![tx("T1", "C2", "CHARGE", "10", "2021-01-02")],
    );
    let report = h.runner.run().await.unwrap();

    let view = h
        .store
        .view(&AuditQuery::all().with_payer_name("Aetna"))
        .await
        .unwrap();
    assert_eq!(view.audits.len(), 1);
    assert_eq!(view.audits[0].claim_id, id("C2"));
    assert_eq!(view.payers.len(), 2);
    assert_eq!(view.latest_run.map(|run| run.run_id), Some(report.run_id));
}

#[tokio::test]
async fn test_failed_source_keeps_previous_snapshot() {
    let h = harness(
        vec![claim("C1", "MCR", "2021-01-01")],
        vec![tx("T1", "C1", "CHARGE", "10", "2021-01-02")],
    );
    let committed = h.runner.run().await.unwrap();

    h.claims.set_unavailable(true).await;
    let err = h.runner.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::Source { source_name: "claims", .. }));
    assert!(err.is_transient());

    let latest = h.store.latest_run().await.unwrap().unwrap();
    assert_eq!(latest.run_id, committed.run_id);
}

#[tokio::test]
async fn test_failed_commit_keeps_previous_snapshot() {
    let h = harness(
        vec![claim("C1", "MCR", "2021-01-01")],
        vec![tx("T1", "C1", "CHARGE", "10", "2021-01-02")],
    );
    h.runner.run().await.unwrap();
    let before = h.store.snapshot().await;

    h.transactions
        .push(tx("T2", "C1", "PAYMENT", "10", "2021-01-04"))
        .await;
    h.store.set_fail_commits(true);
    assert!(matches!(h.runner.run().await, Err(PipelineError::Store(_))));
    assert_eq!(h.store.snapshot().await, before);

    h.store.set_fail_commits(false);
    h.runner.run().await.unwrap();
    let c1 = h.store.audit(&id("C1")).await.unwrap().unwrap();
    assert_eq!(c1.exception_flag, ExceptionFlag::Matched);
}

#[tokio::test]
async fn test_reader_filters_by_payer_name() {
    let h = harness(
        vec![claim("C1", "MCR", "2021-01-01"), claim("C2", "AET", "2021-01-01")],
        vec![],
    );
    h.runner.run().await.unwrap();

    let rows = h
        .store
        .audits(&AuditQuery::all().with_payer_name("Aetna"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].claim_id, id("C2"));
}

#[tokio::test]
async fn test_json_lines_sources_and_snapshot_file() {
    let dir = std::env::temp_dir().join(format!("claims-pipeline-{}", RunId::new_v7()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let claims_path = dir.join("claims.jsonl");
    tokio::fs::write(
        &claims_path,
        concat!(
            "{\"claim_id\": \"C1\", \"primary_payer_id\": \"MCR\", \"service_date\": \"2021-01-01\"}\n",
            "\n",
            "not json\n",
            "{\"claim_id\": \"C2\"}\n",
        ),
    )
    .await
    .unwrap();

    let store = Arc::new(JsonSnapshotStore::new(dir.join("state/snapshot.json")));
    let runner = PipelineRunner::new(
        Arc::new(JsonLinesClaimSource::new(&claims_path)),
        Arc::new(MockTransactionSource::new(vec![tx(
            "T1", "C1", "CHARGE", "40", "2021-01-05",
        )])),
        Arc::new(MockPayerSource::new(payers())),
        store.clone(),
        Currency::USD,
    );

    let report = runner.run().await.unwrap();
    assert_eq!(report.claims.input_records, 2);
    assert_eq!(report.audit.audited_claims, 2);

    let reopened = JsonSnapshotStore::new(store.path());
    let state = reopened.load_state().await.unwrap();
    assert_eq!(state.facts.len(), 1);
    let c1 = reopened.audit(&id("C1")).await.unwrap().unwrap();
    assert_eq!(c1.exception_flag, ExceptionFlag::ZeroPay);
    assert_eq!(reopened.payers().await.unwrap().len(), 2);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_missing_source_file_fails_the_run() {
    let store = Arc::new(InMemoryPipelineStore::new());
    let runner = PipelineRunner::new(
        Arc::new(JsonLinesClaimSource::new("/nonexistent/claims.jsonl")),
        Arc::new(MockTransactionSource::default()),
        Arc::new(MockPayerSource::new(payers())),
        store.clone(),
        Currency::USD,
    );
    assert!(runner.run().await.is_err());
    assert!(store.latest_run().await.unwrap().is_none());
}

#[tokio::test]
async fn test_scenario_covers_every_exception_flag() {
    use test_utils::{
        assert_audit_row, assert_money_eq, assert_money_zero, assert_sorted_by_claim,
        assert_transfers_reconcile, PayerFixtures, ScenarioFixtures,
    };

    let store = Arc::new(InMemoryPipelineStore::new());
    let runner = PipelineRunner::new(
        Arc::new(MockClaimSource::new(ScenarioFixtures::claims())),
        Arc::new(MockTransactionSource::new(ScenarioFixtures::transactions())),
        Arc::new(MockPayerSource::new(PayerFixtures::standard())),
        store.clone(),
        Currency::USD,
    );
    let report = runner.run().await.unwrap();
    assert_eq!(report.facts, 8);

    let snapshot = store.snapshot().await;
    assert_sorted_by_claim(&snapshot.audits);
    for summary in &snapshot.summaries {
        assert_transfers_reconcile(summary);
    }

    let expected = [
        ExceptionFlag::Underpaid,
        ExceptionFlag::Overpaid,
        ExceptionFlag::NoCharge,
        ExceptionFlag::ZeroPay,
        ExceptionFlag::Matched,
    ];
    for (row, flag) in snapshot.audits.iter().zip(expected) {
        assert_audit_row(row, flag);
    }
    assert_money_eq(&snapshot.audits[1].net_variance, dec!(50));
    assert_money_zero(&snapshot.audits[2].total_charges);
    assert_eq!(snapshot.audits[2].settlement_days, None);
}
