use crate::application::notification::{PendingNotification, WaitOutcome};
use crate::config::SagaConfig;
use crate::domain::graph::StateGraph;
use crate::domain::ports::KeyValueStore;
use crate::domain::saga::{SagaData, SagaState, TerminalError};
use crate::error::{Result, SagaError};
use std::time::Duration;
use tracing::{Instrument, Span, debug, info, info_span, warn};

pub type Record<G> = SagaData<<G as StateGraph>::Args, <G as StateGraph>::Response>;

/// One persisted saga instance driven through the shared state graph.
///
/// Instances are only obtained through [`Saga::create`], [`Saga::create_superseding`] or
/// [`Saga::load_from_kvs`]. Every transition is written to the key-value store before the
/// in-memory record changes, so a failed write leaves both sides at the previous state.
pub struct Saga<G: StateGraph> {
    config: SagaConfig<G>,
    data: Record<G>,
    span: Span,
}

impl<G: StateGraph> Saga<G> {
    fn bind(config: SagaConfig<G>, data: Record<G>) -> Self {
        let span = info_span!("saga", saga_type = G::NAME, key = %config.key);
        Self { config, data, span }
    }

    /// Whether any record (in flight or terminal) exists for `key`.
    pub async fn exists_in_kvs(kvs: &dyn KeyValueStore, key: &str) -> Result<bool> {
        kvs.exists(key).await.map_err(into_persistence)
    }

    /// Creates a saga in state `start` and persists it.
    ///
    /// Fails with `ConflictError` when the key already holds a record.
    pub async fn create(config: SagaConfig<G>) -> Result<Self> {
        if Self::exists_in_kvs(&*config.kvs, &config.key).await? {
            warn!(key = %config.key, saga_type = G::NAME, "Refusing to create saga for existing key");
            return Err(SagaError::ConflictError {
                key: config.key.clone(),
            });
        }

        let data = SagaData::new(config.key.clone(), G::NAME);
        let mut saga = Self::bind(config, data.clone());
        saga.commit(data).await?;
        info!(parent: &saga.span, "Saga created");
        Ok(saga)
    }

    /// Like [`create`](Self::create), but replaces a terminal record for the same key.
    ///
    /// A record that is still in flight keeps the key and yields `ConflictError`.
    pub async fn create_superseding(config: SagaConfig<G>) -> Result<Self> {
        match Self::read_record(&config).await? {
            Some(existing) if !existing.is_terminal() => Err(SagaError::ConflictError {
                key: config.key.clone(),
            }),
            Some(existing) => {
                info!(
                    key = %config.key,
                    previous_state = %existing.current_state,
                    "Superseding terminal saga"
                );
                config
                    .kvs
                    .delete(&config.key)
                    .await
                    .map_err(into_persistence)?;
                Self::create(config).await
            }
            None => Self::create(config).await,
        }
    }

    /// Rebuilds an instance from its persisted record without replaying any transition.
    pub async fn load_from_kvs(config: SagaConfig<G>) -> Result<Self> {
        let data = Self::read_record(&config)
            .await?
            .ok_or_else(|| SagaError::NotFoundError {
                key: config.key.clone(),
            })?;
        let saga = Self::bind(config, data);
        debug!(parent: &saga.span, state = %saga.data.current_state, "Saga loaded");
        Ok(saga)
    }

    async fn read_record(config: &SagaConfig<G>) -> Result<Option<Record<G>>> {
        let Some(bytes) = config.kvs.get(&config.key).await.map_err(into_persistence)? else {
            return Ok(None);
        };

        let data: Record<G> = serde_json::from_slice(&bytes)?;
        if data.saga_type != G::NAME {
            return Err(SagaError::PersistenceError(format!(
                "Record '{}' belongs to saga type '{}', not '{}'",
                config.key,
                data.saga_type,
                G::NAME
            )));
        }
        if data.key != config.key {
            return Err(SagaError::PersistenceError(format!(
                "Record stored under '{}' carries key '{}'",
                config.key, data.key
            )));
        }
        Ok(Some(data))
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn current_state(&self) -> SagaState {
        self.data.current_state
    }

    pub fn data(&self) -> &Record<G> {
        &self.data
    }

    /// The stored response of a succeeded saga.
    pub fn response(&self) -> Option<&G::Response> {
        match self.data.current_state {
            SagaState::Succeeded => self.data.response.as_ref(),
            _ => None,
        }
    }

    /// Why an errored saga failed.
    pub fn terminal_error(&self) -> Option<&TerminalError> {
        match self.data.current_state {
            SagaState::Errored => self.data.error.as_ref(),
            _ => None,
        }
    }

    /// The stored outcome once terminal; `None` while in flight.
    pub fn result(&self) -> Option<Result<G::Response>> {
        self.data.result()
    }

    /// Drives the saga to a terminal state.
    ///
    /// On a terminal instance this returns the stored result without any I/O. On an instance
    /// recovered in `requestSent` it resumes waiting instead of sending again.
    pub async fn run(&mut self, args: G::Args) -> Result<G::Response> {
        if let Some(result) = self.data.result() {
            debug!(parent: &self.span, state = %self.data.current_state, "Saga already terminal");
            return result;
        }
        if self.data.current_state == SagaState::RequestSent {
            return self.resume().await;
        }

        self.config
            .graph
            .validate(&args)
            .map_err(SagaError::ValidationError)?;
        let correlation_key = self.config.graph.correlation_key(&args);
        if correlation_key != self.config.key {
            return Err(SagaError::ValidationError(format!(
                "Arguments correlate to '{}', not to saga '{}'",
                correlation_key, self.config.key
            )));
        }

        let span = self.span.clone();
        async {
            self.commit(self.data.with_args(args)).await?;
            self.drive().await
        }
        .instrument(span)
        .await
    }

    /// Continues a saga loaded after a restart.
    ///
    /// A `requestSent` record re-subscribes with a fresh deadline and never re-issues the
    /// outbound action. A `start` record with stored arguments had not sent anything yet and is
    /// driven from the beginning.
    pub async fn resume(&mut self) -> Result<G::Response> {
        if let Some(result) = self.data.result() {
            return result;
        }
        if self.data.args.is_none() {
            return Err(SagaError::ValidationError(format!(
                "Saga '{}' has no recorded arguments; call run first",
                self.config.key
            )));
        }

        let span = self.span.clone();
        async {
            info!(state = %self.data.current_state, "Resuming saga");
            self.drive().await
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self) -> Result<G::Response> {
        let args = self.data.args.clone().ok_or_else(|| {
            SagaError::ValidationError(format!("Saga '{}' has no arguments", self.config.key))
        })?;

        let channel = self.config.graph.channel(&args);
        let mut pending = Some(
            PendingNotification::subscribe(
                self.config.pubsub.clone(),
                channel,
                self.config.request_processing_timeout,
            )
            .await
            .map_err(|e| match e {
                SagaError::PubSubError(_) => e,
                other => SagaError::PubSubError(other.to_string()),
            })?,
        );

        while let Some(transition) = self.data.current_state.transition() {
            match transition.from {
                SagaState::Start => {
                    let before = self.data.clone();
                    if let Err(e) = self.commit(before.apply(transition, Ok(None))?).await {
                        cancel(&mut pending).await;
                        return Err(e);
                    }

                    info!(transition = transition.name, "Issuing outbound action");
                    if let Err(e) = self.config.graph.act(&args).await {
                        warn!(error = %e, "Outbound action failed");
                        cancel(&mut pending).await;
                        let errored = before.apply(
                            transition,
                            Err(TerminalError::OutboundAction {
                                reason: e.to_string(),
                            }),
                        )?;
                        self.commit(errored).await?;
                    }
                }
                SagaState::RequestSent => {
                    let waiting = pending.take().ok_or_else(|| {
                        SagaError::PubSubError("No subscription to await".to_string())
                    })?;
                    let channel = waiting.channel().to_string();
                    let subscription_id = waiting.subscription_id();
                    let outcome = match waiting.wait().await {
                        WaitOutcome::Notified(message) => {
                            info!(channel = %channel, subscription_id, "Notification received");
                            self.config
                                .graph
                                .on_notification(&message)
                                .map(Some)
                                .map_err(|error_information| TerminalError::Callback {
                                    error_information,
                                })
                        }
                        WaitOutcome::TimedOut => {
                            warn!(channel = %channel, subscription_id, "Timed out awaiting notification");
                            Err(TerminalError::Timeout {
                                seconds: whole_seconds(self.config.request_processing_timeout),
                            })
                        }
                    };
                    let next = self.data.apply(transition, outcome)?;
                    self.commit(next).await?;
                }
                SagaState::Succeeded | SagaState::Errored => break,
            }
        }

        cancel(&mut pending).await;
        info!(state = %self.data.current_state, "Saga finished");
        self.data.result().unwrap_or_else(|| {
            Err(SagaError::PersistenceError(format!(
                "Saga '{}' stopped in non-terminal state '{}'",
                self.config.key, self.data.current_state
            )))
        })
    }

    /// Persists `next` and only then makes it the in-memory record.
    async fn commit(&mut self, next: Record<G>) -> Result<()> {
        let bytes = serde_json::to_vec(&next)?;
        self.config
            .kvs
            .set(&self.config.key, bytes)
            .await
            .map_err(into_persistence)?;
        debug!(state = %next.current_state, "State persisted");
        self.data = next;
        Ok(())
    }
}

async fn cancel(pending: &mut Option<PendingNotification>) {
    if let Some(waiting) = pending.take() {
        waiting.cancel().await;
    }
}

/// Seconds in `timeout`, rounded up so sub-second deadlines never report zero.
fn whole_seconds(timeout: Duration) -> u64 {
    timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
}

fn into_persistence(e: SagaError) -> SagaError {
    match e {
        SagaError::PersistenceError(_) => e,
        other => SagaError::PersistenceError(other.to_string()),
    }
}
