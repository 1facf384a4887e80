//! Minimal publish smoke-test binary: `pubsub-pub <topic> <content>`.

use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: pubsub-pub <topic> <content>");
        return ExitCode::FAILURE;
    }
    let topic = &args[1];
    let content = args[2].as_bytes();

    match pubsub_bus::publish(topic, content, None) {
        Ok(delivered) => {
            println!("delivered to {delivered} channel(s)");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("publish failed: {e}");
            ExitCode::FAILURE
        }
    }
}
