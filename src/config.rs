use crate::domain::graph::StateGraph;
use crate::domain::ports::{KeyValueStoreHandle, PubSubHandle};
use crate::infrastructure::in_memory::{InMemoryKeyValueStore, InMemoryPubSub};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REQUEST_PROCESSING_TIMEOUT_SECONDS: u64 = 30;

/// Process-wide settings, read from the command line or the environment.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// Seconds a saga waits for its callback before failing with a timeout.
    #[arg(
        long,
        env = "REQUEST_PROCESSING_TIMEOUT_SECONDS",
        default_value_t = DEFAULT_REQUEST_PROCESSING_TIMEOUT_SECONDS
    )]
    pub request_processing_timeout_seconds: u64,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "SAGA_DB_PATH")]
    pub db_path: Option<PathBuf>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            request_processing_timeout_seconds: DEFAULT_REQUEST_PROCESSING_TIMEOUT_SECONDS,
            db_path: None,
        }
    }
}

impl AdapterConfig {
    pub fn request_processing_timeout(&self) -> Duration {
        Duration::from_secs(self.request_processing_timeout_seconds)
    }
}

/// Immutable configuration bound to one saga instance. Never persisted.
pub struct SagaConfig<G: StateGraph> {
    pub key: String,
    pub kvs: KeyValueStoreHandle,
    pub pubsub: PubSubHandle,
    pub graph: Arc<G>,
    pub request_processing_timeout: Duration,
}

impl<G: StateGraph> Clone for SagaConfig<G> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            kvs: self.kvs.clone(),
            pubsub: self.pubsub.clone(),
            graph: self.graph.clone(),
            request_processing_timeout: self.request_processing_timeout,
        }
    }
}

/// Collaborators shared by every saga in the process.
///
/// Built once at start-up; [`saga_config`](Self::saga_config) derives the per-saga configuration
/// both for new sagas and for recovery.
#[derive(Clone)]
pub struct AdapterContext {
    pub kvs: KeyValueStoreHandle,
    pub pubsub: PubSubHandle,
    pub request_processing_timeout: Duration,
}

impl AdapterContext {
    pub fn new(
        kvs: KeyValueStoreHandle,
        pubsub: PubSubHandle,
        request_processing_timeout: Duration,
    ) -> Self {
        Self {
            kvs,
            pubsub,
            request_processing_timeout,
        }
    }

    /// Context backed by fresh in-memory store and pub/sub.
    pub fn in_memory(request_processing_timeout: Duration) -> Self {
        Self::new(
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(InMemoryPubSub::new()),
            request_processing_timeout,
        )
    }

    pub fn saga_config<G: StateGraph>(&self, key: impl Into<String>, graph: Arc<G>) -> SagaConfig<G> {
        SagaConfig {
            key: key.into(),
            kvs: self.kvs.clone(),
            pubsub: self.pubsub.clone(),
            graph,
            request_processing_timeout: self.request_processing_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches, Parser};

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: AdapterConfig,
    }

    // Parses as the binary would, minus the environment, so ambient variables cannot leak in.
    fn parse(args: &[&str]) -> AdapterConfig {
        let command = TestCli::command()
            .mut_arg("request_processing_timeout_seconds", |arg| {
                arg.env(None::<&'static str>)
            })
            .mut_arg("db_path", |arg| arg.env(None::<&'static str>));
        let matches = command.try_get_matches_from(args.iter().copied()).unwrap();
        TestCli::from_arg_matches(&matches).unwrap().config
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["test"]);
        assert_eq!(config, AdapterConfig::default());
        assert_eq!(
            config.request_processing_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_PROCESSING_TIMEOUT_SECONDS)
        );
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "test",
            "--request-processing-timeout-seconds",
            "5",
            "--db-path",
            "/tmp/sagas",
        ]);
        assert_eq!(config.request_processing_timeout_seconds, 5);
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/sagas")));
    }

    #[test]
    fn test_declares_environment_variables() {
        let command = TestCli::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(|env| env.to_string_lossy().into_owned())
        };
        assert_eq!(
            env_of("request_processing_timeout_seconds").as_deref(),
            Some("REQUEST_PROCESSING_TIMEOUT_SECONDS")
        );
        assert_eq!(env_of("db_path").as_deref(), Some("SAGA_DB_PATH"));
    }
}
