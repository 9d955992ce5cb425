mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ObsBuilder, ScriptedBackend};
use director_engine::models::{InterventionKind, InterventionSource};
use director_engine::{DirectorConfig, EngineRegistry, MemoryStore};

const GENERATED: &str = r#"{
    "intervention_type": "micro_lesson",
    "content": "print() hands back None; return the value instead.",
    "reason": "The same return-vs-print mixup keeps recurring",
    "confidence": 0.9,
    "new_challenge": {"title": "Return it", "description": "Write a function that returns its input doubled."}
}"#;

async fn engine_with_backend(
    backend: Option<Arc<dyn director_engine::GenerativeBackend>>,
    config: DirectorConfig,
) -> director_engine::DirectorEngine {
    common::engine_with(config, Arc::new(MemoryStore::new()), backend).await
}

/// Drive the same print-vs-return mistake until the frequency threshold.
async fn accumulate_struggles(engine: &mut director_engine::DirectorEngine) {
    for attempt in 1..=3 {
        engine
            .observe(
                ObsBuilder::new("doubler_01")
                    .attempt(attempt)
                    .code("def double(x):\n    return print(x * 2)")
                    .error("TypeError: unsupported operand type(s): 'NoneType'")
                    .tags(&["functions"])
                    .build(),
            )
            .unwrap();
    }
}

#[tokio::test]
async fn no_intervention_while_calm() {
    let engine = common::engine().await;
    assert!(!engine.should_intervene());
    assert!(engine.get_intervention().await.is_none());
}

#[tokio::test]
async fn catalog_intervention_without_backend() {
    let mut engine = engine_with_backend(None, DirectorConfig::default()).await;
    accumulate_struggles(&mut engine).await;

    assert!(engine.should_intervene());
    let intervention = engine.get_intervention().await.unwrap();
    assert_eq!(intervention.source, InterventionSource::Catalog);
    assert!(intervention.confidence > 0.0);
    assert!(!intervention.content.is_empty());
}

#[tokio::test]
async fn generative_backend_response_is_used_when_valid() {
    let backend: Arc<dyn director_engine::GenerativeBackend> =
        Arc::new(ScriptedBackend::replying(GENERATED));
    let mut engine = engine_with_backend(Some(backend), DirectorConfig::default()).await;
    accumulate_struggles(&mut engine).await;

    let intervention = engine.get_intervention().await.unwrap();
    assert_eq!(intervention.source, InterventionSource::Generative);
    assert_eq!(intervention.kind, InterventionKind::MicroLesson);
    assert!((intervention.confidence - 0.9).abs() < 1e-9);
    assert!(intervention.generated_challenge.is_some());
}

#[tokio::test]
async fn malformed_generative_response_falls_back_to_catalog() {
    let backend: Arc<dyn director_engine::GenerativeBackend> =
        Arc::new(ScriptedBackend::replying("here is my advice, no JSON though"));
    let mut engine = engine_with_backend(Some(backend), DirectorConfig::default()).await;
    accumulate_struggles(&mut engine).await;

    let intervention = engine.get_intervention().await.unwrap();
    assert_eq!(intervention.source, InterventionSource::Catalog);
}

#[tokio::test]
async fn erroring_backend_falls_back_to_catalog() {
    let backend: Arc<dyn director_engine::GenerativeBackend> = Arc::new(ScriptedBackend::failing());
    let mut engine = engine_with_backend(Some(backend), DirectorConfig::default()).await;
    accumulate_struggles(&mut engine).await;

    let intervention = engine.get_intervention().await.unwrap();
    assert_eq!(intervention.source, InterventionSource::Catalog);
}

#[tokio::test(start_paused = true)]
async fn slow_backend_hits_the_deadline_and_falls_back() {
    let backend: Arc<dyn director_engine::GenerativeBackend> = Arc::new(ScriptedBackend::slow(
        GENERATED,
        Duration::from_secs(120),
    ));
    let config = DirectorConfig {
        generative_timeout_secs: 1,
        ..DirectorConfig::default()
    };
    let mut engine = engine_with_backend(Some(backend), config).await;
    accumulate_struggles(&mut engine).await;

    let intervention = engine.get_intervention().await.unwrap();
    assert_eq!(intervention.source, InterventionSource::Catalog);
}

#[tokio::test]
async fn registry_shares_one_engine_per_learner() {
    let registry = EngineRegistry::new(
        DirectorConfig::default(),
        Arc::new(MemoryStore::new()),
        None,
    );

    let first = registry.get_or_create("learner-a").await;
    let again = registry.get_or_create("learner-a").await;
    let other = registry.get_or_create("learner-b").await;

    assert!(Arc::ptr_eq(&first, &again));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(registry.len().await, 2);

    {
        let mut engine = first.lock().await;
        engine
            .observe(
                ObsBuilder::new("ch")
                    .learner("learner-a")
                    .success()
                    .build(),
            )
            .unwrap();
    }
    let engine = again.lock().await;
    assert_eq!(engine.get_state().observation_count, 1);

    drop(engine);
    assert!(registry.evict("learner-a").await);
    assert!(!registry.evict("learner-a").await);
}
