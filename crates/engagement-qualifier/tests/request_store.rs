use chrono::NaiveDate;
use engagement_qualifier::store::{InMemoryRequestStore, RecordQuery};
use engagement_qualifier::workflows::qualification::{
    calculate_total_score, OperatingUnit, RecordDraft, RepositoryError, RequestId, RequestRecord,
    RequestRepository, RequestSubmission,
};

fn created_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid created date")
}

fn submission(title: &str, units: Vec<OperatingUnit>, hours: u32) -> RequestSubmission {
    RequestSubmission {
        request_title: title.to_string(),
        requester: "Ari Jones".to_string(),
        requester_email: "ari@example.com".to_string(),
        partner: false,
        projected_work_hours: hours,
        expected_start_date: NaiveDate::from_ymd_opt(2024, 5, 20),
        msx_id: "MSX-7".to_string(),
        tpid: "TP-7".to_string(),
        primary_solution_areas: vec!["AI Apps".to_string()],
        secondary_solution_areas: vec!["Infra".to_string()],
        customer_name: "Fabrikam".to_string(),
        operating_units: units,
        problem_description: "Document intelligence for invoices".to_string(),
        projected_acr: 20_000,
        necessary_skills: Vec::new(),
        azure_ai_services: vec!["Document Intelligence".to_string()],
        engagement_country: "Canada".to_string(),
        engagement_region: "Americas".to_string(),
        monthly_usage: 4_000,
        attachment: None,
    }
}

fn record(id: &str, title: &str, units: Vec<OperatingUnit>, approved: bool) -> RequestRecord {
    let submission = submission(title, units, 24);
    let score = calculate_total_score(20_000.0, 24.0, 0.0, 4_000.0);
    RequestRecord::from_draft(RecordDraft {
        request_id: &RequestId(id.to_string()),
        submission: &submission,
        expected_start_date: NaiveDate::from_ymd_opt(2024, 5, 20).expect("valid start date"),
        attachment: None,
        created_on: created_on(),
        score: &score,
        approved,
        assigned_to: Vec::new(),
        evaluation: if approved { "**Approved**" } else { "**Rejected**" },
    })
}

#[test]
fn snapshot_round_trips_records_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state").join("requests.json");

    let store = InMemoryRequestStore::with_snapshot(&path).expect("store opens");
    assert!(store.is_empty());
    store
        .insert(record("Req00001", "Invoice extraction", vec![OperatingUnit::Canada], true))
        .expect("insert first");
    store
        .insert(record("Req00002", "Call summaries", vec![OperatingUnit::Latam], false))
        .expect("insert second");
    assert!(path.exists(), "snapshot written on insert");

    let reopened = InMemoryRequestStore::with_snapshot(&path).expect("store reopens");
    assert_eq!(reopened.len(), 2);
    let fetched = reopened
        .fetch(&RequestId("Req00002".to_string()))
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(fetched.request_title, "Call summaries");
    assert!(!fetched.approved);
    assert_eq!(fetched.status.label(), "Blocked due to Rejection");
}

#[test]
fn duplicate_ids_conflict() {
    let store = InMemoryRequestStore::new();
    store
        .insert(record("Dup00001", "First", vec![OperatingUnit::Fsi], true))
        .expect("first insert");

    let err = store
        .insert(record("Dup00001", "Second", vec![OperatingUnit::Fsi], true))
        .expect_err("same id");
    assert!(matches!(err, RepositoryError::Conflict));
    assert_eq!(store.len(), 1);
}

#[test]
fn corrupt_snapshot_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("requests.json");
    std::fs::write(&path, "{ not json").expect("write corrupt snapshot");

    let err = InMemoryRequestStore::with_snapshot(&path).expect_err("corrupt file");
    assert!(matches!(err, RepositoryError::Unavailable(_)));
}

#[test]
fn queries_use_persisted_field_names() {
    let store = InMemoryRequestStore::new();
    for entry in [
        record("Q0000001", "Invoice extraction", vec![OperatingUnit::Canada], true),
        record("Q0000002", "Fraud signals", vec![OperatingUnit::Fsi, OperatingUnit::South], true),
        record("Q0000003", "Call summaries", vec![OperatingUnit::Fsi], false),
    ] {
        store.insert(entry).expect("insert");
    }

    let query = RecordQuery::parse(
        "SELECT c.RequestId, c.RequestTitle FROM c WHERE ARRAY_CONTAINS(c.OperatingUnit, 'FSI') AND c.Status = 'In progress'",
    )
    .expect("query parses");
    let rows = store.query(&query).expect("query runs");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["RequestId"], "Q0000002");
    assert_eq!(rows[0]["RequestTitle"], "Fraud signals");

    let query = RecordQuery::parse(
        "SELECT * FROM c WHERE c.Partner = 'No' AND c.CreatedDate = '2024-03-01' ORDER BY c.RequestId DESC",
    )
    .expect("query parses");
    let rows = store.query(&query).expect("query runs");
    let ids: Vec<_> = rows
        .iter()
        .filter_map(|row| row["RequestId"].as_str())
        .collect();
    assert_eq!(ids, vec!["Q0000003", "Q0000002", "Q0000001"]);
    assert_eq!(rows[0]["ApprovedBy"], "QualiFiction.ai");
    assert!(rows[0]["TotalScore"].is_number());
    assert!(rows[0]["WeightedProjectedACR"].is_number());
}
