//! Receiving from async code.

use futures::StreamExt;
use skein::prelude::*;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::test]
async fn recv_async_and_stream() {
    let ctx = Context::new();
    let ep1 = ctx.endpoint().unwrap();
    let ep2 = ctx.endpoint().unwrap();
    let sub = ep1.make_subscriber(["/async"]).unwrap();
    let port = ep1.listen("127.0.0.1", 0).unwrap();
    assert!(ep2.peer("127.0.0.1", port, TIMEOUT).unwrap());

    ep2.publish_batch((0..4u64).map(|i| ("/async", i))).unwrap();

    let first = tokio::time::timeout(TIMEOUT, sub.recv_async())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.get::<u64>().unwrap(), 0);

    let rest: Vec<u64> = sub
        .stream()
        .take(3)
        .map(|m| m.get::<u64>().unwrap())
        .collect()
        .await;
    assert_eq!(rest, [1, 2, 3]);
}

#[tokio::test]
async fn stream_ends_on_shutdown() {
    let ctx = Context::new();
    let ep = ctx.endpoint().unwrap();
    let statuses = ep.make_status_subscriber(true).unwrap();
    ep.shutdown();
    let mut stream = Box::pin(statuses.stream());
    assert!(stream.next().await.is_none());
    assert!(matches!(statuses.recv_async().await, Err(Error::Closed)));
}

#[cfg(unix)]
#[test]
fn descriptor_tracks_queue() {
    let ctx = Context::new();
    let ep1 = ctx.endpoint().unwrap();
    let ep2 = ctx.endpoint().unwrap();
    let sub = ep1.make_subscriber(["/fd"]).unwrap();
    assert!(sub.descriptor().is_some());

    let port = ep1.listen("127.0.0.1", 0).unwrap();
    assert!(ep2.peer("127.0.0.1", port, TIMEOUT).unwrap());
    ep2.publish("/fd", 1u64).unwrap();
    ep2.publish("/fd", 2u64).unwrap();

    let first = sub.get().unwrap();
    assert_eq!(first.get::<u64>().unwrap(), 1);
    let second = sub.get().unwrap();
    assert_eq!(second.get::<u64>().unwrap(), 2);
    assert!(!sub.available());
    assert!(sub.poll().is_empty());

    let no_flare = Context::with_config(EndpointConfig::default().with_flare(false));
    let ep3 = no_flare.endpoint().unwrap();
    assert!(ep3.make_subscriber(["/fd"]).unwrap().descriptor().is_none());
}

#[test]
fn bounded_mailbox_drops_overflow() {
    let cfg = EndpointConfig::default().with_mailbox_capacity(2);
    let ctx = Context::with_config(cfg);
    let ep1 = ctx.endpoint().unwrap();
    let ep2 = ctx.endpoint().unwrap();
    let small = ep1.make_subscriber(["/flood"]).unwrap();
    // delivered after the flood, so it marks its end
    let marker = ep1.make_subscriber(["/end"]).unwrap();
    let port = ep1.listen("127.0.0.1", 0).unwrap();
    assert!(ep2.peer("127.0.0.1", port, TIMEOUT).unwrap());

    ep2.publish_batch((0..10u64).map(|i| ("/flood", i))).unwrap();
    ep2.publish("/end", true).unwrap();
    marker.get().unwrap();

    let got: Vec<u64> = small.poll().iter().map(|m| m.get().unwrap()).collect();
    assert_eq!(got, [0, 1]);
}
