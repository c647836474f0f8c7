//! Scripted training host for tests and local development.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::storage::ByteStream;
use crate::training::{
    domain::{HostUrl, RemoteJobId, TrainingStatus},
    ports::{TrainingHost, TrainingHostError, TrainingHostResult, TrainingSubmission},
};

/// One `train` call observed by [`ScriptedTrainingHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainCall {
    /// Host the call targeted.
    pub host: HostUrl,
    /// Submitted request.
    pub submission: TrainingSubmission,
}

#[derive(Debug)]
struct ScriptState {
    alive: bool,
    job_ids: VecDeque<RemoteJobId>,
    issued: usize,
    statuses: HashMap<RemoteJobId, VecDeque<TrainingStatus>>,
    logs: HashMap<RemoteJobId, String>,
    results: HashMap<RemoteJobId, Bytes>,
    cancel_answer: bool,
    train_failure: Option<TrainingHostError>,
    status_failure: Option<TrainingHostError>,
    train_calls: Vec<TrainCall>,
    cancels: Vec<(HostUrl, RemoteJobId)>,
    remote_calls: usize,
}

impl Default for ScriptState {
    fn default() -> Self {
        Self {
            alive: true,
            job_ids: VecDeque::new(),
            issued: 0,
            statuses: HashMap::new(),
            logs: HashMap::new(),
            results: HashMap::new(),
            cancel_answer: true,
            train_failure: None,
            status_failure: None,
            train_calls: Vec::new(),
            cancels: Vec::new(),
            remote_calls: 0,
        }
    }
}

/// Training host whose answers are scripted per remote job.
///
/// Status scripts are consumed one entry per `status` call; the final entry
/// repeats. Unscripted jobs report `training`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTrainingHost {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTrainingHost {
    /// Creates a live host with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues identifiers returned by subsequent `train` calls.
    pub fn assign_job_ids(&self, ids: impl IntoIterator<Item = RemoteJobId>) {
        self.state().job_ids.extend(ids);
    }

    /// Scripts the statuses reported for a job.
    pub fn script_statuses(
        &self,
        job: &RemoteJobId,
        statuses: impl IntoIterator<Item = TrainingStatus>,
    ) {
        self.state()
            .statuses
            .insert(job.clone(), statuses.into_iter().collect());
    }

    /// Sets the logs reported for a job.
    pub fn set_logs(&self, job: &RemoteJobId, logs: impl Into<String>) {
        self.state().logs.insert(job.clone(), logs.into());
    }

    /// Sets the result artifact served for a job.
    pub fn set_result(&self, job: &RemoteJobId, contents: Bytes) {
        self.state().results.insert(job.clone(), contents);
    }

    /// Sets the answer to subsequent cancel requests.
    pub fn set_cancel_answer(&self, accepted: bool) {
        self.state().cancel_answer = accepted;
    }

    /// Sets the liveness reported by `ping`.
    pub fn set_alive(&self, alive: bool) {
        self.state().alive = alive;
    }

    /// Makes subsequent `train` calls fail.
    pub fn fail_training(&self, err: TrainingHostError) {
        self.state().train_failure = Some(err);
    }

    /// Makes subsequent `status` calls fail.
    pub fn fail_status(&self, err: Option<TrainingHostError>) {
        self.state().status_failure = err;
    }

    /// Returns every `train` call observed.
    #[must_use]
    pub fn train_calls(&self) -> Vec<TrainCall> {
        self.state().train_calls.clone()
    }

    /// Returns every `cancel` call observed.
    #[must_use]
    pub fn cancels(&self) -> Vec<(HostUrl, RemoteJobId)> {
        self.state().cancels.clone()
    }

    /// Returns how many calls other than `ping` reached the host.
    #[must_use]
    pub fn remote_calls(&self) -> usize {
        self.state().remote_calls
    }
}

#[async_trait]
impl TrainingHost for ScriptedTrainingHost {
    async fn ping(&self, _host: &HostUrl) -> bool {
        self.state().alive
    }

    async fn train(
        &self,
        host: &HostUrl,
        submission: TrainingSubmission,
    ) -> TrainingHostResult<RemoteJobId> {
        let mut state = self.state();
        state.remote_calls += 1;
        state.train_calls.push(TrainCall {
            host: host.clone(),
            submission,
        });
        if let Some(err) = state.train_failure.clone() {
            return Err(err);
        }
        if let Some(id) = state.job_ids.pop_front() {
            return Ok(id);
        }
        state.issued += 1;
        RemoteJobId::new(format!("job-{}", state.issued))
            .map_err(|err| TrainingHostError::UnexpectedResponse(err.to_string()))
    }

    async fn cancel(&self, host: &HostUrl, job: &RemoteJobId) -> TrainingHostResult<bool> {
        let mut state = self.state();
        state.remote_calls += 1;
        state.cancels.push((host.clone(), job.clone()));
        Ok(state.cancel_answer)
    }

    async fn status(
        &self,
        _host: &HostUrl,
        job: &RemoteJobId,
    ) -> TrainingHostResult<TrainingStatus> {
        let mut state = self.state();
        state.remote_calls += 1;
        if let Some(err) = state.status_failure.clone() {
            return Err(err);
        }
        let Some(script) = state.statuses.get_mut(job) else {
            return Ok(TrainingStatus::Training);
        };
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().copied()
        };
        Ok(next.unwrap_or(TrainingStatus::Training))
    }

    async fn logs(&self, _host: &HostUrl, job: &RemoteJobId) -> TrainingHostResult<String> {
        let mut state = self.state();
        state.remote_calls += 1;
        Ok(state.logs.get(job).cloned().unwrap_or_default())
    }

    async fn result(&self, _host: &HostUrl, job: &RemoteJobId) -> TrainingHostResult<ByteStream> {
        let mut state = self.state();
        state.remote_calls += 1;
        let contents = state.results.get(job).cloned().ok_or_else(|| TrainingHostError::Http {
            status: 404,
            body: format!("no result for {job}"),
        })?;
        Ok(Box::pin(futures::stream::once(async move { Ok(contents) })))
    }
}
