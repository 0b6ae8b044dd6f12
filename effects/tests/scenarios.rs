use futures::{StreamExt, stream};
use quell::{CancellationRegistry, Effect, EffectEvents, EffectId, Error};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::Poll,
    time::Duration,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn ticker(start: u32) -> Effect<u32> {
    Effect::from_stream(stream::unfold(start, |n| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Some((Ok(n), n + 1))
    }))
}

#[tokio::test]
async fn cancel_unknown_id() {
    init_logging();
    let registry = CancellationRegistry::new();

    assert_eq!(registry.cancel(&"nothing".into()), 0);
    assert!(
        Effect::<u32>::cancel("nothing", &registry)
            .collect::<Vec<_>>()
            .await
            .is_empty()
    );
    assert!(registry.is_empty());
}

#[tokio::test]
async fn dropping_consumer_unregisters() {
    init_logging();
    let registry = CancellationRegistry::new();
    let id = EffectId::from("x");

    let mut first = Effect::<u32>::from_stream(stream::pending()).cancellable(id.clone(), false, &registry);
    let mut second = Effect::<u32>::from_stream(stream::pending()).cancellable(id.clone(), false, &registry);

    // Subscribing happens on first poll
    assert!(futures::poll!(first.next()).is_pending());
    assert!(futures::poll!(second.next()).is_pending());
    assert_eq!(registry.in_flight(&id), 2);

    drop(first);
    assert_eq!(registry.in_flight(&id), 1);

    drop(second);
    assert!(!registry.contains(&id));
}

#[tokio::test]
async fn cancel_in_flight_silences_previous() {
    init_logging();
    let registry = CancellationRegistry::new();
    let id = EffectId::from("x");

    let mut first = ticker(0).cancellable(id.clone(), true, &registry);
    assert!(matches!(first.next().await, Some(Ok(0))));
    assert!(matches!(first.next().await, Some(Ok(1))));

    let mut second = ticker(100).cancellable(id.clone(), true, &registry);
    assert!(matches!(second.next().await, Some(Ok(100))));

    assert!(first.next().await.is_none());
    assert_eq!(registry.in_flight(&id), 1);

    assert!(matches!(second.next().await, Some(Ok(101))));
}

#[tokio::test]
async fn values_before_attach_are_replayed() {
    init_logging();
    let registry = CancellationRegistry::new();
    let (release_tx, release_rx) = futures::channel::oneshot::channel::<()>();

    // Emits 1 and 2 straight away, 3 only once released
    let upstream = Effect::<u32>::sequence([1, 2]).concat(Effect::future(async move {
        let _ = release_rx.await;
        Ok(3)
    }));

    let replay = registry.subscribe(upstream, "x", false);
    while (&replay).buffered() < 2 {
        tokio::task::yield_now().await;
    }

    release_tx.send(()).unwrap();

    let values = replay.collect::<Vec<_>>().await;
    assert!(matches!(&values[..], [Ok(1), Ok(2), Ok(3)]));
    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn synchronous_values_arrive_in_order() {
    init_logging();
    let registry = CancellationRegistry::new();

    for _ in 0..50 {
        let values = Effect::<u32>::sequence(0..100)
            .cancellable("burst", false, &registry)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect::<Vec<_>>();
        assert_eq!(values, (0..100).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn cancel_stops_ticking() {
    init_logging();
    let registry = CancellationRegistry::new();

    let mut ticks = ticker(0).cancellable("x", false, &registry);
    assert!(matches!(ticks.next().await, Some(Ok(0))));
    assert!(matches!(ticks.next().await, Some(Ok(1))));

    assert_eq!(registry.cancel(&"x".into()), 1);

    assert!(ticks.next().await.is_none());
    assert!(ticks.next().await.is_none());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn cancellation_is_distinguishable_on_replay() {
    init_logging();
    let registry = CancellationRegistry::new();

    let mut replay = registry.subscribe(ticker(0), "x", false);
    assert!(matches!(replay.next().await, Some(Ok(0))));

    registry.cancel(&"x".into());
    assert!(replay.next().await.is_none());
    assert!(replay.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn teardown_runs_once() {
    init_logging();
    let registry = CancellationRegistry::new();

    for _ in 0..20 {
        let teardowns = Arc::new(AtomicUsize::new(0));
        let upstream = {
            let teardowns = teardowns.clone();
            ticker(0).handle_events(EffectEvents::new().on_disposed(move || {
                teardowns.fetch_add(1, Ordering::SeqCst);
            }))
        };

        let mut ticks = upstream.cancellable("x", false, &registry);
        assert!(ticks.next().await.is_some());

        // Consumer disposal racing an external cancel
        let canceller = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.cancel(&"x".into()) })
        };
        drop(ticks);
        canceller.await.unwrap();

        assert!(registry.is_empty());

        // Let the pump unwind
        while teardowns.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn errors_propagate_and_unregister() {
    init_logging();
    let registry = CancellationRegistry::new();

    let values = Effect::<u32>::just(1)
        .concat(Effect::fail(Error::Message("boom".to_string())))
        .cancellable("x", false, &registry)
        .collect::<Vec<_>>()
        .await;

    assert_eq!(values.len(), 2);
    assert!(matches!(values[0], Ok(1)));
    assert!(matches!(&values[1], Err(Error::Message(m)) if m == "boom"));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn panicking_upstream_ends_consumer() {
    init_logging();
    let registry = CancellationRegistry::new();

    let exploding = || {
        Effect::<u32>::from_stream(stream::poll_fn(|_| -> Poll<Option<quell::Result<u32>>> {
            panic!("upstream failure")
        }))
    };

    let values = exploding()
        .cancellable("p", false, &registry)
        .collect::<Vec<_>>()
        .await;
    assert!(values.is_empty());
    assert!(registry.is_empty());

    // The pump's unwinding is reported as a cancellation
    let mut replay = registry.subscribe(exploding(), "p", false);
    assert_eq!(registry.in_flight(&"p".into()), 1);

    assert!(replay.next().await.is_none());
    assert!(replay.is_cancelled());
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn timeout_fires_unless_cancelled() {
    init_logging();
    let registry = CancellationRegistry::new();

    let fired = Effect::<&str>::timeout("t", false, time::Duration::seconds(5), "fire", &registry)
        .collect::<Vec<_>>()
        .await;
    assert!(matches!(&fired[..], [Ok("fire")]));

    let mut pending = Effect::<&str>::timeout("t", false, time::Duration::seconds(5), "fire", &registry);
    assert!(futures::poll!(pending.next()).is_pending());
    assert_eq!(registry.in_flight(&"t".into()), 1);

    // Restarting the timer replaces the pending one
    let restarted = Effect::<&str>::timeout("t", true, time::Duration::seconds(5), "again", &registry);
    let restarted = restarted.collect::<Vec<_>>();

    let (first, second) = tokio::join!(pending.next(), restarted);
    assert!(first.is_none());
    assert!(matches!(&second[..], [Ok("again")]));
    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancel_and_subscribe() {
    init_logging();
    let registry = CancellationRegistry::new();
    let id = EffectId::from("shared");

    let subscribers = (0..8)
        .map(|_| {
            let registry = registry.clone();
            let id = id.clone();
            tokio::spawn(async move {
                for _ in 0..25 {
                    let mut ticks = ticker(0).cancellable(id.clone(), false, &registry);
                    // Either a tick or a silent end if cancelled first
                    let _ = ticks.next().await;
                }
            })
        })
        .collect::<Vec<_>>();

    let cancellers = (0..4)
        .map(|_| {
            let registry = registry.clone();
            let id = id.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    registry.cancel(&id);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect::<Vec<_>>();

    for task in subscribers.into_iter().chain(cancellers) {
        task.await.unwrap();
    }

    // Every consumer was dropped, so nothing may remain registered
    assert!(registry.is_empty());

    registry.shutdown().await;
}
