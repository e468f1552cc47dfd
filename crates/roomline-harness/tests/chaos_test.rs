//! Random backend failures must never break client invariants.
//!
//! A fixed user journey runs against a backend that fails a seeded fraction
//! of calls. Whatever fails, every rendered view must satisfy the standard
//! invariants and the runtime must shut down cleanly.

use std::time::Duration;

use proptest::prelude::*;
use roomline_app::{Runtime, RuntimeConfig};
use roomline_client::{
    CredentialStore, DEFAULT_TOKEN_LIFETIME, MemoryBackend, MemoryCredentialStore, MemoryRoom,
};
use roomline_harness::{FaultyBackend, Recording, Script, ScriptedDriver};
use roomline_proto::Collection;

fn journey(room: &MemoryRoom) -> Script {
    let (offline, online, expiring, writer) = (room.clone(), room.clone(), room.clone(), room.clone());
    let pause = Duration::from_millis(500);

    Script::new()
        .sleep(pause)
        .send("first")
        .run(move || {
            let _ = writer.insert_message(&Collection::messages(), "bob", "hello");
        })
        .sleep(pause)
        .run(move || offline.disconnect())
        .sleep(pause)
        .send("while offline")
        .run(move || online.reconnect())
        .sleep(pause)
        .send("second")
        .sleep(pause)
        .run(move || expiring.expire_tokens())
        .sleep(pause)
        .login("alice", "secret")
        .sleep(pause)
        .send("after login")
        .sleep(pause)
}

async fn run_chaos(seed: u64, failure_rate: f64) -> Recording {
    let room = MemoryRoom::new();
    room.add_account("alice", "secret");
    room.issue_token("abc123", "alice", DEFAULT_TOKEN_LIFETIME);
    room.insert_message(&Collection::messages(), "bob", "earlier").unwrap();
    let store = MemoryCredentialStore::new();
    store.store("jwt", "abc123").unwrap();

    let backend = FaultyBackend::new(MemoryBackend::new(room.clone()));
    backend.handle().chaos(failure_rate, seed);
    let driver = ScriptedDriver::new(journey(&room)).check_invariants();
    let recording = driver.recording();

    let config = RuntimeConfig { call_timeout: Duration::from_secs(1), ..RuntimeConfig::default() };
    Runtime::new(backend, store, driver, config).run().await.unwrap();
    recording
}

#[tokio::test(start_paused = true)]
async fn journey_without_faults_ends_on_chat_screen() {
    let recording = run_chaos(0, 0.0).await;

    assert!(recording.violations().is_empty(), "violations: {:?}", recording.violations());
    let view = recording.last_view().unwrap();
    assert!(view.logged_in);
    let texts: Vec<_> = view.messages.iter().map(|m| m.text.as_str()).collect();
    assert!(texts.contains(&"earlier"));
    assert!(texts.contains(&"hello"));
    assert!(texts.contains(&"after login"));
}

#[tokio::test(start_paused = true)]
async fn seeded_failures_keep_invariants() {
    for seed in 0..8 {
        let recording = run_chaos(seed, 0.2).await;
        assert!(
            recording.violations().is_empty(),
            "seed {seed} violations: {:?}",
            recording.violations()
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_chaos_keeps_invariants(seed in any::<u64>(), failure_rate in 0.0f64..0.6) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        let recording = runtime.block_on(run_chaos(seed, failure_rate));

        prop_assert!(recording.violations().is_empty(), "violations: {:?}", recording.violations());
        prop_assert!(!recording.renders().is_empty());
    }
}
