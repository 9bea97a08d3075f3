//! Master and clone stores across peered endpoints.

use skein::prelude::*;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(1);

fn peered() -> (Context, Endpoint, Endpoint) {
    let cfg = EndpointConfig::default().with_store_timeout(Duration::from_millis(200));
    let ctx = Context::with_config(cfg);
    let ep1 = ctx.endpoint().unwrap();
    let ep2 = ctx.endpoint().unwrap();
    let port = ep1.listen("127.0.0.1", 0).unwrap();
    assert!(ep2.peer("127.0.0.1", port, TIMEOUT).unwrap());
    (ctx, ep1, ep2)
}

#[test]
fn clone_reads_and_writes_through_master() {
    let (_ctx, ep1, ep2) = peered();
    let master = ep1
        .attach_master("kv", Backend::Memory, BackendOptions::new())
        .unwrap();
    assert_eq!(master.frontend(), Frontend::Master);
    master.put("answer", 42u64).unwrap();

    let clone = ep2.attach(Frontend::Clone, "kv", Backend::Memory, BackendOptions::new())
        .unwrap();
    assert_eq!(clone.name(), "kv");
    assert_eq!(clone.get("answer").unwrap(), Some(Data::Count(42)));

    clone.put(vector![1i64, 2i64], "composite").unwrap();
    assert!(master.exists(vector![1i64, 2i64]).unwrap());
    assert_eq!(master.size().unwrap(), 2);

    assert!(clone.erase("answer").unwrap());
    assert!(!clone.erase("answer").unwrap());
    assert_eq!(master.keys().unwrap().len(), 1);

    master.clear().unwrap();
    assert_eq!(clone.size().unwrap(), 0);
}

#[test]
fn master_names_are_unique_across_peers() {
    let (_ctx, ep1, ep2) = peered();
    let _master = ep1
        .attach_master("unique", Backend::Memory, BackendOptions::new())
        .unwrap();

    for ep in [&ep1, &ep2] {
        let err = ep
            .attach_master("unique", Backend::Memory, BackendOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::Store(ErrorCode::MasterExists)));
    }
}

#[test]
fn clone_without_master_fails() {
    let (_ctx, _ep1, ep2) = peered();
    let err = ep2.attach_clone("missing").unwrap_err();
    assert!(matches!(err, Error::Store(ErrorCode::NoSuchMaster)));
    assert!(err.is_recoverable());
}

#[test]
fn clone_goes_stale_when_master_endpoint_stops() {
    let (_ctx, ep1, ep2) = peered();
    let master = ep1
        .attach_master("ephemeral", Backend::Memory, BackendOptions::new())
        .unwrap();
    let clone = ep2.attach_clone("ephemeral").unwrap();
    clone.put("k", "v").unwrap();

    ep1.shutdown();
    assert!(matches!(clone.get("k"), Err(Error::Store(ErrorCode::StaleData))));
    assert!(matches!(master.get("k"), Err(Error::Closed)));

    // the name is free again
    let fresh = ep2
        .attach_master("ephemeral", Backend::Memory, BackendOptions::new())
        .unwrap();
    assert_eq!(fresh.size().unwrap(), 0);
}
