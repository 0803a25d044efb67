use super::*;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

struct StubDirectory {
    outcome: Result<WatchedProfile, LookupError>,
    calls: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl StubDirectory {
    fn ok(profile: WatchedProfile) -> Self {
        Self {
            outcome: Ok(profile),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            outcome: Err(LookupError::new(message)),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl ProfileDirectory for StubDirectory {
    async fn lookup_profile(&self, username: &str) -> Result<WatchedProfile, LookupError> {
        self.calls.lock().await.push(username.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcome.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    applied: Mutex<Vec<WatchedProfile>>,
    fail_with: Option<String>,
}

#[async_trait]
impl ResolutionSink for RecordingSink {
    async fn apply(&self, profile: &WatchedProfile) -> anyhow::Result<()> {
        if let Some(message) = &self.fail_with {
            return Err(anyhow::anyhow!(message.clone()));
        }
        self.applied.lock().await.push(profile.clone());
        Ok(())
    }
}

async fn wait_until_loading(resolver: &ProfileResolver) {
    for _ in 0..400 {
        if resolver.status().is_loading() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("resolver never entered Loading");
}

#[tokio::test]
async fn success_walks_idle_loading_success_and_applies_once() {
    let directory = Arc::new(StubDirectory::ok(WatchedProfile::new("1", "alice")));
    let resolver = ProfileResolver::new(directory.clone());
    let sink = RecordingSink::default();
    let mut transitions = resolver.subscribe();

    assert_eq!(resolver.status(), ResolverStatus::Idle);
    let profile = resolver.trigger("alice", &sink).await.expect("resolve");

    assert_eq!(profile, WatchedProfile::new("1", "alice"));
    assert_eq!(*sink.applied.lock().await, vec![profile.clone()]);
    assert_eq!(*directory.calls.lock().await, vec!["alice".to_string()]);
    assert_eq!(
        transitions.try_recv().expect("loading"),
        ResolverStatus::Loading {
            query: "alice".to_string()
        }
    );
    assert_eq!(
        transitions.try_recv().expect("success"),
        ResolverStatus::Success(profile)
    );
}

#[tokio::test]
async fn failed_lookup_settles_in_error_without_applying() {
    let directory = Arc::new(StubDirectory::failing("user not found"));
    let resolver = ProfileResolver::new(directory.clone());
    let sink = RecordingSink::default();

    let err = resolver.trigger("ghost", &sink).await.expect_err("must fail");

    assert!(matches!(err, ResolveError::Lookup(_)));
    assert_eq!(err.to_string(), "user not found");
    assert_eq!(
        resolver.status(),
        ResolverStatus::Error("user not found".to_string())
    );
    assert!(sink.applied.lock().await.is_empty());
    assert_eq!(directory.calls.lock().await.len(), 1, "no retry");
}

#[tokio::test]
async fn failing_sink_turns_success_into_error() {
    let directory = Arc::new(StubDirectory::ok(WatchedProfile::new("1", "alice")));
    let resolver = ProfileResolver::new(directory);
    let sink = RecordingSink {
        fail_with: Some("disk full".to_string()),
        ..RecordingSink::default()
    };

    let err = resolver.trigger("alice", &sink).await.expect_err("must fail");

    assert!(matches!(err, ResolveError::Apply(_)));
    assert_eq!(
        resolver.status().error_message(),
        Some("disk full")
    );
}

#[tokio::test]
async fn trigger_while_loading_is_rejected_without_a_second_lookup() {
    let gate = Arc::new(Notify::new());
    let directory =
        Arc::new(StubDirectory::ok(WatchedProfile::new("1", "alice")).gated(gate.clone()));
    let resolver = Arc::new(ProfileResolver::new(directory.clone()));
    let sink = Arc::new(RecordingSink::default());

    let first = {
        let resolver = resolver.clone();
        let sink = sink.clone();
        tokio::spawn(async move { resolver.trigger("alice", sink.as_ref()).await })
    };
    wait_until_loading(&resolver).await;

    let second = resolver.trigger("bob", sink.as_ref()).await;
    assert!(matches!(second, Err(ResolveError::Busy)));
    assert_eq!(*directory.calls.lock().await, vec!["alice".to_string()]);

    gate.notify_one();
    let profile = first.await.expect("join").expect("first resolves");
    assert_eq!(profile.username, "alice");
    assert_eq!(sink.applied.lock().await.len(), 1);
}

#[tokio::test]
async fn blank_query_still_reaches_the_directory() {
    let directory = Arc::new(StubDirectory::failing("username required"));
    let resolver = ProfileResolver::new(directory.clone());
    let sink = RecordingSink::default();

    let _ = resolver.trigger("", &sink).await;

    assert_eq!(*directory.calls.lock().await, vec![String::new()]);
}

#[tokio::test]
async fn settled_resolver_rearms_on_next_trigger_and_reset() {
    let resolver = ProfileResolver::new(Arc::new(StubDirectory::failing("offline")));
    let sink = RecordingSink::default();

    let _ = resolver.trigger("alice", &sink).await;
    assert!(resolver.status().error_message().is_some());

    let retry = resolver.trigger("alice", &sink).await;
    assert!(matches!(retry, Err(ResolveError::Lookup(_))));

    resolver.reset();
    assert_eq!(resolver.status(), ResolverStatus::Idle);
}

#[tokio::test]
async fn dropping_a_loading_trigger_settles_in_error_and_rearms() {
    let gate = Arc::new(Notify::new());
    let directory =
        Arc::new(StubDirectory::ok(WatchedProfile::new("1", "alice")).gated(gate.clone()));
    let resolver = ProfileResolver::new(directory.clone());
    let sink = RecordingSink::default();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), resolver.trigger("alice", &sink)).await;
    assert!(abandoned.is_err(), "lookup is held open by the gate");

    assert_eq!(
        resolver.status(),
        ResolverStatus::Error(ABANDONED_MESSAGE.to_string())
    );
    assert!(sink.applied.lock().await.is_empty());

    gate.notify_one();
    let profile = resolver
        .trigger("alice", &sink)
        .await
        .expect("next trigger resolves");
    assert_eq!(profile.username, "alice");
    assert_eq!(resolver.status(), ResolverStatus::Success(profile));
    assert_eq!(directory.calls.lock().await.len(), 2);
}
