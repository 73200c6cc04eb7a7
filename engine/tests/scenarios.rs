//! End-to-end scenarios and black-box invariants for the game-instance
//! lifecycle engine, run against the public `Host`/`GameInstance` API with
//! an in-memory `Player` standing in for a real transport.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use engine::callbacks::BoxFuture;
use engine::{EngineError, GameCompletedCallback, GameInit, GameTick, Host, Player, PlayerError, TickOutcome};
use protocol::Message;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// An in-memory duplex connection: frames pushed in via `inbound_tx` are
/// returned from `read`; frames written via `write` land on `outbound_rx`.
struct TestPlayer {
    id: String,
    ctx: CancellationToken,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Message>>,
    outbound: mpsc::UnboundedSender<Message>,
}

impl TestPlayer {
    fn new(id: &str) -> (Arc<Self>, mpsc::UnboundedSender<Message>, mpsc::UnboundedReceiver<Message>) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let player = TestPlayer {
            id: id.to_string(),
            ctx: CancellationToken::new(),
            inbound: tokio::sync::Mutex::new(in_rx),
            outbound: out_tx,
        };
        (Arc::new(player), in_tx, out_rx)
    }
}

#[async_trait]
impl Player for TestPlayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn ctx(&self) -> &CancellationToken {
        &self.ctx
    }

    async fn read(&self) -> Result<Message, PlayerError> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = self.ctx.cancelled() => Err(PlayerError::ContextCancelled),
            msg = inbound.recv() => msg.ok_or(PlayerError::ConnectionClosed),
        }
    }

    async fn write(&self, msg: Message) -> Result<(), PlayerError> {
        self.outbound
            .send(msg)
            .map_err(|_| PlayerError::BadMessage("outbound channel closed".into()))
    }

    async fn close(&self) {
        self.ctx.cancel();
    }

    async fn close_with_error(&self, _err: &EngineError) {
        self.ctx.cancel();
    }
}

fn recorder() -> (GameCompletedCallback<usize>, Arc<Mutex<Vec<Option<EngineError>>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    let cb: GameCompletedCallback<usize> =
        Arc::new(move |err, _handle| events_clone.lock().unwrap().push(err));
    (cb, events)
}

async fn wait_until<F: Fn() -> bool>(pred: F, timeout: Duration) -> bool {
    let start = tokio::time::Instant::now();
    loop {
        if pred() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn s1_happy_path_two_players() {
    let init: GameInit<usize> = Arc::new(|_handle, quorum| {
        Box::pin(async move {
            let set: HashSet<String> = quorum.into_iter().collect();
            assert_eq!(set, HashSet::from(["p1".to_string(), "p2".to_string()]));
            let mut out = HashMap::new();
            out.insert("p1".to_string(), vec![Message::new(100, serde_json::json!("hello1"))]);
            out.insert("p2".to_string(), vec![Message::new(100, serde_json::json!("hello2"))]);
            Ok(out)
        }) as BoxFuture<_>
    });

    let tick_calls = Arc::new(AtomicUsize::new(0));
    let tick_calls_clone = tick_calls.clone();
    let tick: GameTick<usize> = Arc::new(move |handle, _batch| {
        let tick_calls = tick_calls_clone.clone();
        Box::pin(async move {
            tick_calls.fetch_add(1, Ordering::SeqCst);
            let mut counter = handle.user_data().await;
            *counter += 1;
            if *counter == 11 {
                Ok(TickOutcome::finished(HashMap::new()))
            } else {
                Ok(TickOutcome::continuing(HashMap::new()))
            }
        }) as BoxFuture<_>
    });

    let host = Host::new(init, tick, Duration::from_millis(15));
    let (on_complete, events) = recorder();
    let instance = host.create_game(2, Duration::from_secs(5), 0usize, on_complete).await;

    let (p1, _in1, mut out1) = TestPlayer::new("p1");
    let (p2, _in2, mut out2) = TestPlayer::new("p2");
    host.join_game(instance.id(), p1).await.unwrap();
    host.join_game(instance.id(), p2).await.unwrap();

    let hello1 = tokio::time::timeout(Duration::from_secs(1), out1.recv()).await.unwrap().unwrap();
    assert_eq!(hello1.data, serde_json::json!("hello1"));
    let hello2 = tokio::time::timeout(Duration::from_secs(1), out2.recv()).await.unwrap().unwrap();
    assert_eq!(hello2.data, serde_json::json!("hello2"));

    assert!(wait_until(|| !events.lock().unwrap().is_empty(), Duration::from_secs(3)).await);
    assert_eq!(events.lock().unwrap().len(), 1);
    assert_eq!(events.lock().unwrap()[0], None);
    assert_eq!(tick_calls.load(Ordering::SeqCst), 11);

    let mut deregistered = false;
    for _ in 0..100 {
        if host.active_game_count().await == 0 {
            deregistered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(deregistered, "completed game was not removed from the registry");
}

#[tokio::test]
async fn s2_wait_timeout() {
    let init_calls = Arc::new(AtomicUsize::new(0));
    let tick_calls = Arc::new(AtomicUsize::new(0));
    let init_calls_clone = init_calls.clone();
    let init: GameInit<usize> = Arc::new(move |_handle, _quorum| {
        init_calls_clone.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(HashMap::new()) }) as BoxFuture<_>
    });
    let tick_calls_clone = tick_calls.clone();
    let tick: GameTick<usize> = Arc::new(move |_handle, _batch| {
        tick_calls_clone.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(TickOutcome::finished(HashMap::new())) }) as BoxFuture<_>
    });

    let host = Host::new(init, tick, Duration::from_millis(20));
    let (on_complete, events) = recorder();
    let _instance = host.create_game(2, Duration::from_millis(200), 0usize, on_complete).await;

    assert!(wait_until(|| !events.lock().unwrap().is_empty(), Duration::from_secs(2)).await);
    assert_eq!(events.lock().unwrap().len(), 1);
    assert_eq!(events.lock().unwrap()[0], Some(EngineError::TimedOutWaitingForPlayers));
    assert_eq!(init_calls.load(Ordering::SeqCst), 0);
    assert_eq!(tick_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn s3_join_then_leave_during_wait_reaches_correct_quorum() {
    let observed_quorum: Arc<Mutex<Option<HashSet<String>>>> = Arc::new(Mutex::new(None));
    let observed_clone = observed_quorum.clone();
    let init: GameInit<usize> = Arc::new(move |_handle, quorum| {
        let observed_clone = observed_clone.clone();
        Box::pin(async move {
            *observed_clone.lock().unwrap() = Some(quorum.into_iter().collect());
            Ok(HashMap::new())
        }) as BoxFuture<_>
    });
    let tick: GameTick<usize> = Arc::new(|_handle, _batch| {
        Box::pin(async move { Ok(TickOutcome::finished(HashMap::new())) }) as BoxFuture<_>
    });

    let host = Host::new(init, tick, Duration::from_millis(20));
    let (on_complete, events) = recorder();
    let instance = host.create_game(4, Duration::from_secs(5), 0usize, on_complete).await;

    let (p1a, _in1a, _out1a) = TestPlayer::new("p1");
    host.join_game(instance.id(), p1a).await.unwrap();
    instance.remove_player("p1").await;

    let (p1b, _in1b, _out1b) = TestPlayer::new("p1");
    let (p2, _in2, _out2) = TestPlayer::new("p2");
    let (p3, _in3, _out3) = TestPlayer::new("p3");
    let (p4, _in4, _out4) = TestPlayer::new("p4");
    host.join_game(instance.id(), p1b).await.unwrap();
    host.join_game(instance.id(), p2).await.unwrap();
    host.join_game(instance.id(), p3).await.unwrap();
    host.join_game(instance.id(), p4).await.unwrap();

    assert!(wait_until(|| observed_quorum.lock().unwrap().is_some(), Duration::from_secs(2)).await);
    let expected: HashSet<String> =
        ["p1", "p2", "p3", "p4"].into_iter().map(String::from).collect();
    assert_eq!(observed_quorum.lock().unwrap().clone().unwrap(), expected);
    let _ = events;
}

#[tokio::test]
async fn s4_init_failure_skips_tick_and_completes_with_error() {
    let tick_calls = Arc::new(AtomicUsize::new(0));
    let init: GameInit<usize> = Arc::new(|_handle, _quorum| {
        Box::pin(async move { Err(EngineError::Init("boom".into())) }) as BoxFuture<_>
    });
    let tick_calls_clone = tick_calls.clone();
    let tick: GameTick<usize> = Arc::new(move |_handle, _batch| {
        tick_calls_clone.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(TickOutcome::finished(HashMap::new())) }) as BoxFuture<_>
    });

    let host = Host::new(init, tick, Duration::from_millis(10));
    let (on_complete, events) = recorder();
    let instance = host.create_game(1, Duration::from_secs(5), 0usize, on_complete).await;

    let (p1, _in1, _out1) = TestPlayer::new("p1");
    host.join_game(instance.id(), p1).await.unwrap();

    assert!(wait_until(|| !events.lock().unwrap().is_empty(), Duration::from_secs(2)).await);
    assert_eq!(events.lock().unwrap().len(), 1);
    assert_eq!(events.lock().unwrap()[0], Some(EngineError::Init("boom".into())));
    assert_eq!(tick_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn s5_join_on_unknown_game_fails_without_closing_player() {
    let init: GameInit<usize> =
        Arc::new(|_h, _q| Box::pin(async move { Ok(HashMap::new()) }) as BoxFuture<_>);
    let tick: GameTick<usize> = Arc::new(|_h, _b| {
        Box::pin(async move { Ok(TickOutcome::finished(HashMap::new())) }) as BoxFuture<_>
    });
    let host = Host::new(init, tick, Duration::from_millis(10));

    let (p1, _in1, _out1) = TestPlayer::new("p1");
    let result = host.join_game(uuid::Uuid::new_v4(), p1.clone()).await;
    assert_eq!(result, Err(EngineError::GameNotFound));
    assert!(!p1.ctx.is_cancelled());
}

#[tokio::test]
async fn s6_join_when_full_does_not_mutate_registry() {
    let init: GameInit<usize> =
        Arc::new(|_h, _q| Box::pin(async move { Ok(HashMap::new()) }) as BoxFuture<_>);
    let tick: GameTick<usize> = Arc::new(|_h, _b| {
        Box::pin(async move { Ok(TickOutcome::continuing(HashMap::new())) }) as BoxFuture<_>
    });
    let host = Host::new(init, tick, Duration::from_millis(20));
    let (on_complete, _events) = recorder();
    let instance = host.create_game(1, Duration::from_secs(5), 0usize, on_complete).await;

    let (p1, _in1, _out1) = TestPlayer::new("p1");
    host.join_game(instance.id(), p1).await.unwrap();

    let (p2, _in2, _out2) = TestPlayer::new("p2");
    let result = host.join_game(instance.id(), p2).await;
    assert_eq!(result, Err(EngineError::GameFull));
    assert_eq!(instance.player_count().await, 1);

    instance.cancel();
}
