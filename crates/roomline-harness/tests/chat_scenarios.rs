//! End-to-end chat scenarios: history, realtime delivery and sending.

use std::time::Duration;

use roomline_app::{Runtime, RuntimeConfig, ViewState};
use roomline_client::{
    BackendError, CredentialStore, DEFAULT_TOKEN_LIFETIME, MemoryBackend, MemoryCredentialStore,
    MemoryRoom,
};
use roomline_core::{Connectivity, DATE_FORMAT};
use roomline_harness::{Call, FaultHandle, FaultyBackend, Operation, Recording, Script, ScriptedDriver};
use roomline_proto::{Collection, SearchQuery};

/// Room where alice is already signed in from an earlier run.
fn signed_in_alice() -> (MemoryRoom, MemoryCredentialStore) {
    let room = MemoryRoom::new();
    room.add_account("alice", "secret");
    room.issue_token("abc123", "alice", DEFAULT_TOKEN_LIFETIME);
    let store = MemoryCredentialStore::new();
    store.store("jwt", "abc123").unwrap();
    (room, store)
}

async fn run(
    room: &MemoryRoom,
    store: MemoryCredentialStore,
    script: Script,
    config: RuntimeConfig,
    setup: impl FnOnce(&FaultHandle),
) -> (Recording, FaultHandle) {
    let backend = FaultyBackend::new(MemoryBackend::new(room.clone()));
    let faults = backend.handle();
    setup(&faults);

    let driver = ScriptedDriver::new(script).check_invariants();
    let recording = driver.recording();
    Runtime::new(backend, store, driver, config).run().await.unwrap();

    assert!(recording.violations().is_empty(), "violations: {:?}", recording.violations());
    (recording, faults)
}

fn in_chat(v: &ViewState) -> bool {
    v.logged_in && v.username.as_deref() == Some("alice")
}

fn last_chat_view(recording: &Recording) -> ViewState {
    recording.renders().into_iter().rev().find(|v| v.logged_in).unwrap()
}

#[tokio::test(start_paused = true)]
async fn history_is_loaded_oldest_first() {
    let (room, store) = signed_in_alice();
    let collection = Collection::messages();
    for text in ["one", "two", "three"] {
        room.insert_message(&collection, "bob", text).unwrap();
    }
    let script = Script::new().wait_for("history", |v| in_chat(v) && v.messages.len() == 3);

    let (recording, faults) = run(&room, store, script, RuntimeConfig::default(), |_| {}).await;

    let texts: Vec<_> = last_chat_view(&recording).messages.into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);
    assert_eq!(faults.calls().iter().find(|c| c.operation() == Operation::Search), Some(
        &Call::Search(SearchQuery::by_creation_asc())
    ));
}

#[tokio::test(start_paused = true)]
async fn catch_up_continues_past_first_page() {
    let (room, store) = signed_in_alice();
    let collection = Collection::messages();
    for i in 0..5 {
        room.insert_message(&collection, "bob", format!("m{i}")).unwrap();
    }
    let config = RuntimeConfig { history_page_size: 3, ..RuntimeConfig::default() };
    let script = Script::new().wait_for("chat screen", in_chat);

    let (recording, faults) = run(&room, store, script, config, |_| {}).await;

    // The first page stops at m2; catching up from m2 brings the rest.
    let texts: Vec<_> = last_chat_view(&recording).messages.into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["m0", "m1", "m2", "m3", "m4"]);
    // The catch-up page from m2 is full, so one more read confirms the end.
    assert_eq!(faults.count(Operation::Search), 3);
}

#[tokio::test(start_paused = true)]
async fn catch_up_reads_every_remaining_page() {
    let (room, store) = signed_in_alice();
    let collection = Collection::messages();
    for i in 0..7 {
        room.insert_message(&collection, "bob", format!("m{i}")).unwrap();
    }
    let config = RuntimeConfig { history_page_size: 3, ..RuntimeConfig::default() };
    let script = Script::new().wait_for("chat screen", in_chat).sleep(Duration::from_secs(1));

    let (recording, faults) = run(&room, store, script, config, |_| {}).await;

    let texts: Vec<_> = last_chat_view(&recording).messages.into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["m0", "m1", "m2", "m3", "m4", "m5", "m6"]);
    // History, then catch-up from m2, m4 and m6. The last page is short.
    assert_eq!(faults.count(Operation::Search), 4);
}

#[tokio::test(start_paused = true)]
async fn failed_history_is_retried_after_reconnect() {
    let (room, store) = signed_in_alice();
    room.insert_message(&Collection::messages(), "bob", "earlier").unwrap();
    let (offline, online) = (room.clone(), room.clone());
    let script = Script::new()
        .wait_for("history error", |v| in_chat(v) && !v.notices.is_empty())
        .run(move || offline.disconnect())
        .wait_for("offline", |v| v.connectivity == Connectivity::Disconnected)
        .run(move || online.reconnect())
        .wait_for("history", |v| in_chat(v) && v.messages.len() == 1);

    let (_, faults) = run(&room, store, script, RuntimeConfig::default(), |faults| {
        faults.fail_next(Operation::Search, BackendError::Unavailable("busy".into()));
    })
    .await;

    assert_eq!(faults.count(Operation::Subscribe), 1);
}

#[tokio::test(start_paused = true)]
async fn notification_adds_one_entry_with_date() {
    let (room, store) = signed_in_alice();
    let server = room.clone();
    let script = Script::new()
        .wait_for("chat screen", in_chat)
        .run(move || {
            server.insert_message(&Collection::messages(), "bob", "hello").unwrap();
        })
        .wait_for("bob's message", |v| v.messages.iter().any(|m| m.author == "bob"));

    let (recording, _) = run(&room, store, script, RuntimeConfig::default(), |_| {}).await;

    let view = last_chat_view(&recording);
    assert_eq!(view.messages.len(), 1);
    let message = &view.messages[0];
    assert_eq!(message.text, "hello");
    assert!(!message.is_from(view.username.as_deref()));

    let document = &room.documents(&Collection::messages())[0];
    assert_eq!(message.id, document.id);
    assert_eq!(Some(message.created_at_millis()), document.created_at_millis());
    assert_eq!(message.date(), message.created_at.format(DATE_FORMAT).to_string());
}

#[tokio::test(start_paused = true)]
async fn sent_message_arrives_through_subscription() {
    let (room, store) = signed_in_alice();
    let script = Script::new()
        .wait_for("chat screen", in_chat)
        .send("hi all")
        .wait_for("own message", |v| v.messages.iter().any(|m| m.text == "hi all"));

    let (recording, faults) = run(&room, store, script, RuntimeConfig::default(), |_| {}).await;

    assert!(faults.calls().contains(&Call::Create { text: "hi all".into() }));
    let view = last_chat_view(&recording);
    assert_eq!(view.compose_text, "");
    assert_eq!(view.messages.len(), 1);
    assert!(view.messages[0].is_from(Some("alice")));
    assert_eq!(room.documents(&Collection::messages())[0].source.author, "alice");
}

#[tokio::test(start_paused = true)]
async fn failed_send_keeps_compose_and_list() {
    let (room, store) = signed_in_alice();
    room.insert_message(&Collection::messages(), "bob", "earlier").unwrap();
    let script = Script::new()
        .wait_for("history", |v| in_chat(v) && v.messages.len() == 1)
        .send("hello")
        .wait_for("send error", |v| !v.notices.is_empty());

    let (recording, faults) = run(&room, store, script, RuntimeConfig::default(), |faults| {
        faults.fail_next(Operation::Create, BackendError::Unavailable("connection lost".into()));
    })
    .await;

    assert_eq!(faults.count(Operation::Create), 1);
    let view = last_chat_view(&recording);
    assert_eq!(view.compose_text, "hello");
    assert_eq!(view.messages.len(), 1);
    assert_eq!(recording.notice_messages(), vec![
        "Sorry, your message could not be sent: backend unavailable: connection lost".to_string()
    ]);
}

#[tokio::test(start_paused = true)]
async fn blank_message_is_not_sent() {
    let (room, store) = signed_in_alice();
    let script = Script::new()
        .wait_for("chat screen", in_chat)
        .send("   ")
        .sleep(Duration::from_secs(1));

    let (_, faults) = run(&room, store, script, RuntimeConfig::default(), |_| {}).await;

    assert_eq!(faults.count(Operation::Create), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_history_times_out_with_notice() {
    let (room, store) = signed_in_alice();
    let script = Script::new().wait_for("history error", |v| !v.notices.is_empty());
    let config = RuntimeConfig { call_timeout: Duration::from_secs(10), ..RuntimeConfig::default() };

    let (recording, _) = run(&room, store, script, config, |faults| {
        faults.delay(Operation::Search, Duration::from_secs(30));
    })
    .await;

    assert_eq!(recording.notice_messages(), vec![
        "Sorry, the message history could not be loaded: request timed out after 10s".to_string()
    ]);
    assert!(last_chat_view(&recording).messages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn message_created_between_fetch_and_subscribe_is_not_lost() {
    let (room, store) = signed_in_alice();
    let collection = Collection::messages();
    let first = room.insert_message(&collection, "bob", "before").unwrap();
    let server = room.clone();
    let script = Script::new().wait_for("both messages", |v| in_chat(v) && v.messages.len() == 2);

    let (recording, faults) = run(&room, store, script, RuntimeConfig::default(), |faults| {
        // Lands after the history page and before the subscription exists.
        faults.before(Operation::Subscribe, move || {
            server.insert_message(&Collection::messages(), "bob", "in the gap").unwrap();
        });
    })
    .await;

    let texts: Vec<_> = last_chat_view(&recording).messages.into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["before", "in the gap"]);

    let since = first.created_at_millis().unwrap();
    let searches: Vec<_> = faults
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Search(query) => Some(query),
            _ => None,
        })
        .collect();
    assert_eq!(searches, vec![SearchQuery::by_creation_asc(), SearchQuery::created_since(since)]);
}

#[tokio::test(start_paused = true)]
async fn quitting_releases_subscription() {
    let (room, store) = signed_in_alice();
    let script = Script::new().wait_for("chat screen", in_chat);

    let (_, faults) = run(&room, store.clone(), script, RuntimeConfig::default(), |_| {}).await;

    assert_eq!(faults.count(Operation::Subscribe), 1);
    assert_eq!(faults.count(Operation::Unsubscribe), 1);
    assert_eq!(faults.count(Operation::Disconnect), 1);
    assert_eq!(room.subscription_count(), 0);
    assert!(store.load("jwt").unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_failure_is_a_warning() {
    let (room, store) = signed_in_alice();
    let expiring = room.clone();
    let script = Script::new()
        .wait_for("chat screen", in_chat)
        .run(move || expiring.expire_tokens())
        .wait_for("leave warning", |v| v.notices.iter().any(|n| n.message.contains("leaving")));

    let (recording, _) = run(&room, store, script, RuntimeConfig::default(), |faults| {
        faults.fail_next(Operation::Unsubscribe, BackendError::NotFound("subscription".into()));
    })
    .await;

    assert!(recording.notice_messages().contains(
        &"Sorry, an error occurred while leaving the chat: not found: subscription".to_string()
    ));
}
