#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use director_engine::models::ObservationInput;
use director_engine::{DirectorConfig, DirectorEngine, GenerativeBackend, MemoryStore};

pub const LEARNER: &str = "learner-7";

/// Pipe engine logs through the usual subscriber when RUST_LOG is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub async fn engine() -> DirectorEngine {
    init_tracing();
    DirectorEngine::load(
        LEARNER,
        DirectorConfig::default(),
        Arc::new(MemoryStore::new()),
        None,
    )
    .await
}

pub async fn engine_with(
    config: DirectorConfig,
    store: Arc<MemoryStore>,
    backend: Option<Arc<dyn GenerativeBackend>>,
) -> DirectorEngine {
    init_tracing();
    DirectorEngine::load(LEARNER, config, store, backend).await
}

/// Builder for observation inputs; defaults to a clean failure on three
/// tests by the shared test learner.
pub struct ObsBuilder {
    input: ObservationInput,
}

impl ObsBuilder {
    pub fn new(challenge_id: &str) -> Self {
        Self {
            input: ObservationInput {
                learner_id: LEARNER.to_string(),
                challenge_id: challenge_id.to_string(),
                code: String::new(),
                success: false,
                error_output: None,
                stdout: None,
                tests_passed: 0,
                tests_total: 3,
                elapsed_seconds: 30.0,
                attempt_number: 1,
                concept_tags: vec![],
            },
        }
    }

    pub fn learner(mut self, learner_id: &str) -> Self {
        self.input.learner_id = learner_id.to_string();
        self
    }

    pub fn success(mut self) -> Self {
        self.input.success = true;
        self.input.tests_passed = self.input.tests_total;
        self
    }

    pub fn code(mut self, code: &str) -> Self {
        self.input.code = code.to_string();
        self
    }

    pub fn error(mut self, error: &str) -> Self {
        self.input.error_output = Some(error.to_string());
        self
    }

    pub fn stdout(mut self, stdout: &str) -> Self {
        self.input.stdout = Some(stdout.to_string());
        self
    }

    pub fn tests(mut self, passed: u32, total: u32) -> Self {
        self.input.tests_passed = passed;
        self.input.tests_total = total;
        self
    }

    pub fn elapsed(mut self, seconds: f64) -> Self {
        self.input.elapsed_seconds = seconds;
        self
    }

    pub fn attempt(mut self, number: u32) -> Self {
        self.input.attempt_number = number;
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.input.concept_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn build(self) -> ObservationInput {
        self.input
    }
}

/// Generative backend with canned behavior for policy tests.
pub struct ScriptedBackend {
    pub response: String,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl ScriptedBackend {
    pub fn replying(response: &str) -> Self {
        Self {
            response: response.to_string(),
            delay: None,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: String::new(),
            delay: None,
            fail: true,
        }
    }

    pub fn slow(response: &str, delay: Duration) -> Self {
        Self {
            response: response.to_string(),
            delay: Some(delay),
            fail: false,
        }
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, _prompt: &str, _system_instructions: &str) -> anyhow::Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("scripted backend failure");
        }
        Ok(self.response.clone())
    }
}
