//! Non-blocking delivery through callbacks.

use skein::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(1);

#[test]
fn callback_receives_messages() {
    let ctx = Context::new();
    let ep1 = ctx.endpoint().unwrap();
    let ep2 = ctx.endpoint().unwrap();

    let (tx, rx) = flume::unbounded();
    ep1.subscribe("/cb", move |msg: Message| {
        let _ = tx.send(msg.get::<i64>().unwrap());
    })
    .unwrap();
    let port = ep1.listen("127.0.0.1", 0).unwrap();
    assert!(ep2.peer("127.0.0.1", port, TIMEOUT).unwrap());

    for i in 0..5i64 {
        ep2.publish("/cb/n", i).unwrap();
    }
    let got: Vec<i64> = (0..5).map(|_| rx.recv_timeout(TIMEOUT).unwrap()).collect();
    assert_eq!(got, [0, 1, 2, 3, 4]);
}

#[test]
fn unsubscribe_stops_callbacks() {
    let ctx = Context::new();
    let ep1 = ctx.endpoint().unwrap();
    let ep2 = ctx.endpoint().unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    ep1.subscribe("/cb", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    // a blocking subscriber on the same topic acts as a barrier
    let barrier = ep1.make_subscriber(["/cb"]).unwrap();
    let port = ep1.listen("127.0.0.1", 0).unwrap();
    assert!(ep2.peer("127.0.0.1", port, TIMEOUT).unwrap());

    ep2.publish("/cb", 1u64).unwrap();
    barrier.get().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    ep1.unsubscribe("/cb").unwrap();
    ep2.publish("/cb", 2u64).unwrap();
    barrier.get().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_callback_does_not_stop_the_endpoint() {
    let ctx = Context::new();
    let ep1 = ctx.endpoint().unwrap();
    let ep2 = ctx.endpoint().unwrap();

    ep1.subscribe("/boom", |_| panic!("callback failure")).unwrap();
    let sub = ep1.make_subscriber(["/boom"]).unwrap();
    let port = ep1.listen("127.0.0.1", 0).unwrap();
    assert!(ep2.peer("127.0.0.1", port, TIMEOUT).unwrap());

    ep2.publish("/boom", "a").unwrap();
    ep2.publish("/boom", "b").unwrap();
    assert_eq!(sub.get_n(2).unwrap().len(), 2);
}

#[test]
fn status_callback() {
    let ctx = Context::new();
    let ep1 = ctx.endpoint().unwrap();
    let ep2 = ctx.endpoint().unwrap();

    let (tx, rx) = flume::unbounded();
    ep2.on_status(true, move |status: Status| {
        let _ = tx.send(status.code());
    })
    .unwrap();
    let port = ep1.listen("127.0.0.1", 0).unwrap();
    assert!(ep2.peer("127.0.0.1", port, TIMEOUT).unwrap());
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), StatusCode::PeerAdded);

    ep2.unpeer("127.0.0.1", port + 1).unwrap();
    assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), ErrorCode::PeerInvalid);
}
