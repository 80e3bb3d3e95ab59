use crate::event::EventDispatcher;
use static_assertions::assert_impl_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

assert_impl_all!(EventDispatcher: Send, Sync);

struct Ping(usize);
struct Pong;

#[test]
fn listeners_receive_their_event_type() {
    let dispatcher = EventDispatcher::new();
    let total = Arc::new(AtomicUsize::new(0));

    let sum = total.clone();
    dispatcher.subscribe(move |ping: &Ping| {
        sum.fetch_add(ping.0, Ordering::Relaxed);
    });

    dispatcher.dispatch(&Ping(3));
    dispatcher.dispatch(&Ping(4));
    assert_eq!(total.load(Ordering::Relaxed), 7);
}

#[test]
fn events_route_by_type() {
    let dispatcher = EventDispatcher::new();
    let pings = Arc::new(AtomicUsize::new(0));
    let pongs = Arc::new(AtomicUsize::new(0));

    let count = pings.clone();
    dispatcher.subscribe(move |_: &Ping| {
        count.fetch_add(1, Ordering::Relaxed);
    });
    let count = pongs.clone();
    dispatcher.subscribe(move |_: &Pong| {
        count.fetch_add(1, Ordering::Relaxed);
    });

    dispatcher.dispatch(&Ping(1));
    dispatcher.dispatch(&Ping(2));
    dispatcher.dispatch(&Pong);

    assert_eq!(pings.load(Ordering::Relaxed), 2);
    assert_eq!(pongs.load(Ordering::Relaxed), 1);
    assert_eq!(dispatcher.num_listeners::<Ping>(), 1);
    assert_eq!(dispatcher.num_listeners::<Pong>(), 1);
}

#[test]
fn dispatch_without_listeners_is_a_noop() {
    let dispatcher = EventDispatcher::new();
    dispatcher.dispatch(&Ping(1));
    assert_eq!(dispatcher.num_listeners::<Ping>(), 0);
}

#[test]
fn unsubscribe_stops_delivery() {
    let dispatcher = EventDispatcher::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let count = calls.clone();
    let listener = dispatcher.subscribe(move |_: &Ping| {
        count.fetch_add(1, Ordering::Relaxed);
    });

    dispatcher.dispatch(&Ping(1));
    assert!(dispatcher.unsubscribe(listener));
    dispatcher.dispatch(&Ping(2));

    assert_eq!(calls.load(Ordering::Relaxed), 1);
    assert_eq!(dispatcher.num_listeners::<Ping>(), 0);

    // A second unsubscribe finds nothing to remove.
    assert!(!dispatcher.unsubscribe(listener));
}

#[test]
fn every_listener_sees_every_event() {
    const LISTENERS: usize = 10;
    const EVENTS: usize = 5;
    let dispatcher = EventDispatcher::new();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..LISTENERS {
        let count = calls.clone();
        dispatcher.subscribe(move |_: &Ping| {
            count.fetch_add(1, Ordering::Relaxed);
        });
    }

    for i in 0..EVENTS {
        dispatcher.dispatch(&Ping(i));
    }
    assert_eq!(calls.load(Ordering::Relaxed), LISTENERS * EVENTS);
}

#[test]
fn subscribing_while_dispatching_is_safe() {
    const EVENTS: usize = 1_000;
    let dispatcher = EventDispatcher::new();
    let calls = Arc::new(AtomicUsize::new(0));

    thread::scope(|s| {
        let subscriber = &dispatcher;
        let count = calls.clone();
        s.spawn(move || {
            for _ in 0..50 {
                let count = count.clone();
                let listener = subscriber.subscribe(move |_: &Ping| {
                    count.fetch_add(1, Ordering::Relaxed);
                });
                assert!(subscriber.unsubscribe(listener));
            }
        });

        let publisher = &dispatcher;
        s.spawn(move || {
            for i in 0..EVENTS {
                publisher.dispatch(&Ping(i));
            }
        });
    });

    // No delivery count to promise here; the point is that racing
    // subscribe/unsubscribe with dispatch neither crashes nor leaves
    // listeners behind.
    assert_eq!(dispatcher.num_listeners::<Ping>(), 0);
}

#[test]
fn concurrent_dispatchers_all_deliver() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 1_000;
    let dispatcher = EventDispatcher::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let count = calls.clone();
    dispatcher.subscribe(move |_: &Ping| {
        count.fetch_add(1, Ordering::Relaxed);
    });

    thread::scope(|s| {
        for _ in 0..THREADS {
            let dispatcher = &dispatcher;
            s.spawn(move || {
                for i in 0..PER_THREAD {
                    dispatcher.dispatch(&Ping(i));
                }
            });
        }
    });

    assert_eq!(calls.load(Ordering::Relaxed), THREADS * PER_THREAD);
}
