// Connection manager: liveness probe with bounded retries
use crate::config::MongoConfig;
use crate::error::MigrationError;
use crate::store::retry::{retry_with_fixed_delay, RetryError, RetryPolicy, Sleeper, TokioSleeper};
use crate::store::DocumentStore;
use tracing::{debug, error, info};

/// Opens a handle to the target collection after a successful liveness probe
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Store: DocumentStore;

    async fn open(&self, config: &MongoConfig) -> Result<Self::Store, MigrationError>;
}

/// Connects through a [`Connector`], retrying connectivity and configuration
/// failures with a fixed delay.
pub struct ConnectionManager<C, S = TokioSleeper> {
    connector: C,
    sleeper: S,
    policy: RetryPolicy,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self {
            connector,
            sleeper: TokioSleeper,
            policy,
        }
    }
}

impl<C: Connector, S: Sleeper> ConnectionManager<C, S> {
    /// Create a manager with a custom pause between attempts
    pub fn with_sleeper(connector: C, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            connector,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Connect to the configured collection.
    ///
    /// Fails with `ConnectionExhausted` once `policy.attempts` probes have failed,
    /// or immediately with the underlying error if it is not retryable.
    pub async fn connect(&self, config: &MongoConfig) -> Result<C::Store, MigrationError> {
        info!(
            "Connecting to MongoDB at {} (up to {} attempts, {:?} apart)",
            config.redacted_uri(),
            self.policy.attempts,
            self.policy.delay
        );

        let result = retry_with_fixed_delay(
            &self.policy,
            &self.sleeper,
            "mongodb connect",
            MigrationError::is_retryable,
            |attempt| {
                debug!(attempt = attempt, namespace = %config.namespace(), "Probing MongoDB");
                self.connector.open(config)
            },
        )
        .await;

        match result {
            Ok(store) => {
                info!("Connected to MongoDB on {}:{}", config.host, config.port);
                Ok(store)
            }
            Err(RetryError::Exhausted {
                attempts,
                last_error,
            }) => {
                error!(
                    attempts = attempts,
                    "Unable to connect to MongoDB after {} attempts: {}", attempts, last_error
                );
                Err(MigrationError::ConnectionExhausted {
                    attempts,
                    last_error: last_error.to_string(),
                })
            }
            Err(RetryError::Aborted { attempt, error }) => {
                error!(attempt = attempt, "MongoDB connection failed: {}", error);
                Err(error)
            }
        }
    }
}
