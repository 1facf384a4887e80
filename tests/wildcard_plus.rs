use pubsub_bus::{fetch, publish, Channel};

#[test]
fn wildcard_plus_spans_multiple_topic_segments() {
    let mut channel = Channel::open("test.e2e.svc.+").expect("open channel");
    channel.open_for_reading().expect("open for reading");

    let delivered = publish("test.e2e.svc.users.created", b"u", None).expect("publish matching");
    assert!(delivered >= 1);
    let message = fetch(&channel).expect("fetch").expect("a message");
    assert_eq!(message.content, b"u");

    let delivered = publish("test.e2e.other.users.created", b"u", None).expect("publish non-matching");
    assert_eq!(delivered, 0);

    channel.close().expect("close");
}
