use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;
use tempfile::TempDir;

use crate::store::query::RecordQuery;
use crate::workflows::qualification::domain::{
    OperatingUnit, RequestId, RequestRecord, RequestSubmission,
};
use crate::workflows::qualification::model::{LanguageModel, ModelError, ModelRequest};
use crate::workflows::qualification::notify::{
    EmailMessage, Notifier, NotifyError, OperatingUnitDirectory,
};
use crate::workflows::qualification::repository::{RepositoryError, RequestRepository};
use crate::workflows::qualification::service::{QualificationService, QualificationSettings};

pub(super) const APPROVED_RESPONSE: &str = "### ❗Final Decision:\n\n- >**Approved** 👍\n- >Tracking ID for monitoring purposes\n\n### 🤔 Evaluation Criteria:\n\n- **Request Analysis**: strong GenAI use case.";

pub(super) const REJECTED_RESPONSE: &str = "### ❗Final Decision:\n\n- >**Rejected** 👎\n\n- **Score Interpretation**: the score is below 0.1.";

pub(super) const UNDECIDED_RESPONSE: &str =
    "I need more information before I can decide on this request.";

pub(super) const SENDER: &str = "qualification@example.com";

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
}

pub(super) fn submission() -> RequestSubmission {
    RequestSubmission {
        request_title: "Claims triage copilot".to_string(),
        requester: "Dana Smith".to_string(),
        requester_email: "dana@example.com".to_string(),
        partner: true,
        projected_work_hours: 10,
        expected_start_date: NaiveDate::from_ymd_opt(2024, 4, 15),
        msx_id: "MSX-1001".to_string(),
        tpid: "TP-42".to_string(),
        primary_solution_areas: vec!["AI Apps".to_string()],
        secondary_solution_areas: vec!["Data".to_string()],
        customer_name: "Contoso Insurance".to_string(),
        operating_units: vec![OperatingUnit::Fsi, OperatingUnit::Hls],
        problem_description: "Summarize claims documents with Azure OpenAI and route them."
            .to_string(),
        projected_acr: 10_000,
        necessary_skills: vec!["Prompt engineering".to_string()],
        azure_ai_services: vec!["AOAI".to_string(), "AI Search".to_string()],
        engagement_country: "United States".to_string(),
        engagement_region: "Americas".to_string(),
        monthly_usage: 10_000,
        attachment: None,
    }
}

pub(super) fn directory() -> OperatingUnitDirectory {
    let mut directory = OperatingUnitDirectory::new();
    directory.insert(OperatingUnit::Fsi, "fsi@example.com");
    directory.insert(OperatingUnit::Fsi, "fsi-arch@example.com");
    directory.insert(OperatingUnit::Hls, "hls@example.com");
    directory
}

pub(super) fn settings(upload_dir: &TempDir) -> QualificationSettings {
    QualificationSettings {
        directory: directory(),
        from_address: SENDER.to_string(),
        upload_dir: upload_dir.path().to_path_buf(),
    }
}

pub(super) struct ServiceHarness {
    pub(super) service: QualificationService<ScriptedModel, MemoryRepository, MemoryNotifier>,
    pub(super) model: Arc<ScriptedModel>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) notifier: Arc<MemoryNotifier>,
    pub(super) uploads: TempDir,
}

pub(super) fn build_service(responses: &[&str]) -> ServiceHarness {
    let uploads = tempfile::tempdir().expect("tempdir");
    let model = Arc::new(ScriptedModel::new(responses));
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = QualificationService::new(
        model.clone(),
        repository.clone(),
        notifier.clone(),
        settings(&uploads),
    );
    ServiceHarness {
        service,
        model,
        repository,
        notifier,
        uploads,
    }
}

/// Model stub replaying canned completions in order and recording every request.
#[derive(Default)]
pub(super) struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub(super) fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .iter()
                    .map(|response| Ok(response.to_string()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn failing(error: ModelError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(error)])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().expect("model mutex poisoned").clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError> {
        self.requests
            .lock()
            .expect("model mutex poisoned")
            .push(request);
        self.responses
            .lock()
            .expect("model mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Api("no scripted response left".to_string())))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<RequestId, RequestRecord>>>,
}

impl MemoryRepository {
    pub(super) fn with_records(records: Vec<RequestRecord>) -> Self {
        let repository = Self::default();
        for record in records {
            repository.insert(record).expect("seed record");
        }
        repository
    }

    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl RequestRepository for MemoryRepository {
    fn insert(&self, record: RequestRecord) -> Result<RequestRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.request_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.request_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn query(&self, query: &RecordQuery) -> Result<Vec<Value>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut documents: Vec<Value> = guard
            .values()
            .map(|record| serde_json::to_value(record).expect("record serializes"))
            .collect();
        documents.sort_by(|a, b| a["RequestId"].as_str().cmp(&b["RequestId"].as_str()));
        Ok(query.execute(&documents))
    }
}

pub(super) struct ConflictRepository;

impl RequestRepository for ConflictRepository {
    fn insert(&self, _record: RequestRecord) -> Result<RequestRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError> {
        Ok(None)
    }

    fn query(&self, _query: &RecordQuery) -> Result<Vec<Value>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl RequestRepository for UnavailableRepository {
    fn insert(&self, _record: RequestRecord) -> Result<RequestRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn query(&self, _query: &RecordQuery) -> Result<Vec<Value>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Accepts lookups but fails every write, as a full disk would.
pub(super) struct FailingInsertRepository;

impl RequestRepository for FailingInsertRepository {
    fn insert(&self, _record: RequestRecord) -> Result<RequestRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn fetch(&self, _id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError> {
        Ok(None)
    }

    fn query(&self, _query: &RecordQuery) -> Result<Vec<Value>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// Reports the first `taken` looked-up ids as already stored.
pub(super) struct CrowdedRepository {
    pub(super) inner: MemoryRepository,
    taken: AtomicUsize,
    pub(super) lookups: AtomicUsize,
    occupant: RequestRecord,
}

impl CrowdedRepository {
    pub(super) fn new(taken: usize, occupant: RequestRecord) -> Self {
        Self {
            inner: MemoryRepository::default(),
            taken: AtomicUsize::new(taken),
            lookups: AtomicUsize::new(0),
            occupant,
        }
    }
}

impl RequestRepository for CrowdedRepository {
    fn insert(&self, record: RequestRecord) -> Result<RequestRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn fetch(&self, id: &RequestId) -> Result<Option<RequestRecord>, RepositoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let remaining = self.taken.load(Ordering::SeqCst);
        if remaining > 0 {
            self.taken.store(remaining - 1, Ordering::SeqCst);
            return Ok(Some(self.occupant.clone()));
        }
        self.inner.fetch(id)
    }

    fn query(&self, query: &RecordQuery) -> Result<Vec<Value>, RepositoryError> {
        self.inner.query(query)
    }
}

/// Notifier capturing messages; recipients listed in `reject` fail delivery.
#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    reject: Arc<Mutex<Vec<String>>>,
}

impl MemoryNotifier {
    pub(super) fn rejecting(recipient: &str) -> Self {
        let notifier = Self::default();
        notifier
            .reject
            .lock()
            .expect("notifier mutex poisoned")
            .push(recipient.to_string());
        notifier
    }

    pub(super) fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let rejected = self.reject.lock().expect("notifier mutex poisoned");
        if message.to.iter().any(|to| rejected.contains(to)) {
            return Err(NotifyError::Transport("mailbox unavailable".to_string()));
        }
        drop(rejected);
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(message.clone());
        Ok(())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
