//! End-to-end tests for the broker facade against a scripted provider.
//!
//! The stub provider plays back a queue of outcomes per operation and
//! records every call, so cache idempotence, retry, fallback, and
//! circuit behaviour are all observable without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use showreel::{
    AspectRatio, CacheConfig, FallbackConfig, KeyValueStore, MediaBroker, MediaCache,
    MediaGateway, MediaProvider, MemoryStore, QueueConfig, RetryConfig, Showreel, ShowreelError,
};
use tokio::time::Instant;

type Script = Mutex<VecDeque<Result<String, ShowreelError>>>;

#[derive(Default)]
struct StubProvider {
    image_calls: AtomicU32,
    speech_calls: AtomicU32,
    image_script: Script,
    speech_script: Script,
    image_prompts: Mutex<Vec<String>>,
    image_call_times: Mutex<Vec<Instant>>,
}

impl StubProvider {
    fn with_image_script(outcomes: Vec<Result<String, ShowreelError>>) -> Arc<Self> {
        let stub = Self::default();
        *stub.image_script.lock().unwrap() = outcomes.into();
        Arc::new(stub)
    }

    fn with_speech_script(outcomes: Vec<Result<String, ShowreelError>>) -> Arc<Self> {
        let stub = Self::default();
        *stub.speech_script.lock().unwrap() = outcomes.into();
        Arc::new(stub)
    }

    fn rate_limited() -> ShowreelError {
        ShowreelError::RateLimited { retry_after: None }
    }

    fn filtered() -> ShowreelError {
        ShowreelError::ContentFiltered {
            reason: "blocked".to_owned(),
        }
    }
}

#[async_trait]
impl MediaProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate_image(&self, prompt: &str, _aspect: AspectRatio) -> showreel::Result<String> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.image_prompts.lock().unwrap().push(prompt.to_owned());
        self.image_call_times.lock().unwrap().push(Instant::now());
        match self.image_script.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok("data:image/png;base64,QUJD".to_owned()),
        }
    }

    async fn generate_speech(&self, _text: &str) -> showreel::Result<String> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        match self.speech_script.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => Ok("UklGRg==".to_owned()),
        }
    }
}

fn broker_over(stub: Arc<StubProvider>, store: Arc<MemoryStore>) -> MediaBroker {
    Showreel::builder()
        .provider(stub)
        .store(store)
        .queue(
            QueueConfig::new()
                .min_interval(Duration::from_millis(10))
                .cooldown(Duration::from_millis(500)),
        )
        .retry(
            RetryConfig::new()
                .max_attempts(3)
                .initial_delay(Duration::from_millis(100)),
        )
        .build()
}

#[tokio::test(start_paused = true)]
async fn repeated_prompt_issues_one_remote_call() {
    let stub = Arc::new(StubProvider::default());
    let store = Arc::new(MemoryStore::new());
    let broker = broker_over(stub.clone(), store.clone());

    let first = broker
        .generate_cinematic_image("noir gallery", AspectRatio::Widescreen, false)
        .await
        .unwrap();
    let second = broker
        .generate_cinematic_image("noir gallery", AspectRatio::Widescreen, false)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(stub.image_calls.load(Ordering::SeqCst), 1);

    // A persisted entry exists under the derived key.
    let probe = MediaCache::new(store.clone(), CacheConfig::default());
    let key = probe.image_key("noir gallery", AspectRatio::Widescreen);
    assert_eq!(store.get(&key).as_deref(), Some(first.as_str()));

    // A fresh broker over the same store serves from cache too.
    let rebuilt = broker_over(stub.clone(), store);
    let third = rebuilt
        .generate_cinematic_image("noir gallery", AspectRatio::Widescreen, false)
        .await
        .unwrap();
    assert_eq!(third, first);
    assert_eq!(stub.image_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_retries_with_growing_delays() {
    let stub = StubProvider::with_image_script(vec![
        Err(StubProvider::rate_limited()),
        Err(StubProvider::rate_limited()),
        Ok("data:image/png;base64,T0s=".to_owned()),
    ]);
    let broker = broker_over(stub.clone(), Arc::new(MemoryStore::new()));

    let result = broker
        .generate_cinematic_image("rooftop chase", AspectRatio::Widescreen, false)
        .await;

    assert_eq!(result.as_deref(), Some("data:image/png;base64,T0s="));
    assert_eq!(stub.image_calls.load(Ordering::SeqCst), 3);

    let times = stub.image_call_times.lock().unwrap();
    let first_gap = times[1] - times[0];
    let second_gap = times[2] - times[1];
    assert!(first_gap >= Duration::from_millis(100));
    assert!(second_gap > first_gap);
}

#[tokio::test(start_paused = true)]
async fn filtered_prompt_degrades_to_generic_tier() {
    let stub = StubProvider::with_image_script(vec![
        Err(StubProvider::filtered()),
        Ok("data:image/png;base64,R0VO".to_owned()),
    ]);
    let broker = broker_over(stub.clone(), Arc::new(MemoryStore::new()));

    let result = broker
        .generate_cinematic_image("something contentious", AspectRatio::Square, false)
        .await;

    assert_eq!(result.as_deref(), Some("data:image/png;base64,R0VO"));
    assert_eq!(stub.image_calls.load(Ordering::SeqCst), 2);

    // The second call used the generic fallback prompt, not the original.
    let prompts = stub.image_prompts.lock().unwrap();
    assert_eq!(prompts[0], "something contentious");
    assert_eq!(prompts[1], FallbackConfig::default().generic_prompt);
}

#[tokio::test(start_paused = true)]
async fn exhausted_ladder_resolves_to_none() {
    let stub = StubProvider::with_image_script(vec![
        Err(StubProvider::filtered()),
        Err(StubProvider::filtered()),
        Err(ShowreelError::Api {
            status: 500,
            message: "server error".to_owned(),
        }),
    ]);
    let broker = broker_over(stub.clone(), Arc::new(MemoryStore::new()));

    let result = broker
        .generate_cinematic_image("doomed prompt", AspectRatio::Widescreen, false)
        .await;

    assert!(result.is_none());
    // One attempt per tier: filtered errors are never retried in place.
    assert_eq!(stub.image_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn missing_credentials_short_circuits_to_none() {
    let broker = Showreel::builder().in_memory().build();
    let result = broker
        .generate_cinematic_image("anything", AspectRatio::Widescreen, false)
        .await;
    assert!(result.is_none());
}

#[tokio::test(start_paused = true)]
async fn open_circuit_fails_fast_without_remote_calls() {
    // Every tier rate-limits with retries disabled: three calls, then
    // the queue opens its circuit.
    let stub = StubProvider::with_image_script(vec![
        Err(StubProvider::rate_limited()),
        Err(StubProvider::rate_limited()),
        Err(StubProvider::rate_limited()),
    ]);
    let store = Arc::new(MemoryStore::new());
    let broker = Showreel::builder()
        .provider(stub.clone())
        .store(store)
        .queue(
            QueueConfig::new()
                .min_interval(Duration::from_millis(10))
                .cooldown(Duration::from_millis(500)),
        )
        .retry(RetryConfig::disabled())
        .fallback(FallbackConfig::new().generic_max_attempts(1))
        .build();

    let first = broker
        .generate_cinematic_image("quota burner", AspectRatio::Widescreen, false)
        .await;
    assert!(first.is_none());
    assert_eq!(stub.image_calls.load(Ordering::SeqCst), 3);

    // Let the queue observe the rate-limit outcome.
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(broker.queue().is_cooling_down());

    let second = broker
        .generate_cinematic_image("different prompt", AspectRatio::Widescreen, false)
        .await;
    assert!(second.is_none());
    assert_eq!(stub.image_calls.load(Ordering::SeqCst), 3);

    // After the cooldown the broker recovers.
    tokio::time::sleep(Duration::from_millis(600)).await;
    let third = broker
        .generate_cinematic_image("different prompt", AspectRatio::Widescreen, false)
        .await;
    assert!(third.is_some());
    assert_eq!(stub.image_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn voiceover_is_cached_and_has_no_fallback() {
    let stub = Arc::new(StubProvider::default());
    let broker = broker_over(stub.clone(), Arc::new(MemoryStore::new()));

    let first = broker.generate_trailer_voiceover("In a world...").await;
    let second = broker.generate_trailer_voiceover("In a world...").await;
    assert_eq!(first.as_deref(), Some("UklGRg=="));
    assert_eq!(first, second);
    assert_eq!(stub.speech_calls.load(Ordering::SeqCst), 1);
    assert_eq!(stub.image_calls.load(Ordering::SeqCst), 0);

    // A filtered narration is omitted, not degraded.
    let muted = StubProvider::with_speech_script(vec![Err(StubProvider::filtered())]);
    let broker = broker_over(muted.clone(), Arc::new(MemoryStore::new()));
    let result = broker.generate_trailer_voiceover("Also in a world...").await;
    assert!(result.is_none());
    assert_eq!(muted.speech_calls.load(Ordering::SeqCst), 1);
    assert_eq!(muted.image_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn priority_request_jumps_waiting_requests() {
    let stub = Arc::new(StubProvider::default());
    let broker = broker_over(stub.clone(), Arc::new(MemoryStore::new()));

    let head = broker.request_cinematic_image("head", AspectRatio::Widescreen, false);
    // Let the head request start so the rest genuinely wait.
    tokio::time::sleep(Duration::from_millis(1)).await;

    let steady = broker.request_cinematic_image("steady", AspectRatio::Widescreen, false);
    let rush = broker.request_cinematic_image("rush", AspectRatio::Widescreen, true);

    assert!(head.resolve().await.is_some());
    assert!(rush.resolve().await.is_some());
    assert!(steady.resolve().await.is_some());

    let prompts = stub.image_prompts.lock().unwrap();
    assert_eq!(*prompts, vec!["head", "rush", "steady"]);
}

#[tokio::test(start_paused = true)]
async fn canceled_request_resolves_to_none_without_a_call() {
    let stub = Arc::new(StubProvider::default());
    let broker = broker_over(stub.clone(), Arc::new(MemoryStore::new()));

    let head = broker.request_cinematic_image("head", AspectRatio::Widescreen, false);
    tokio::time::sleep(Duration::from_millis(1)).await;

    let abandoned = broker.request_cinematic_image("abandoned", AspectRatio::Widescreen, false);
    abandoned.cancel();

    assert!(abandoned.resolve().await.is_none());
    assert!(head.resolve().await.is_some());

    let prompts = stub.image_prompts.lock().unwrap();
    assert!(!prompts.iter().any(|p| p == "abandoned"));
}
