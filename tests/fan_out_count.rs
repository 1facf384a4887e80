use pubsub_bus::{fetch, publish, Channel};

#[test]
fn fan_out_count() {
    let mut channels: Vec<Channel> = (0..3)
        .map(|_| {
            let mut c = Channel::open("test.e2e.fan").expect("open channel");
            c.open_for_reading().expect("open for reading");
            c
        })
        .collect();

    let delivered = publish("test.e2e.fan", b"x", None).expect("publish");
    assert_eq!(delivered, 3);

    for channel in &channels {
        let message = fetch(channel).expect("fetch").expect("a message");
        assert_eq!(message.content, b"x");
    }

    for channel in &mut channels {
        channel.close().expect("close");
    }
}
