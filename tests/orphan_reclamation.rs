use std::fs;
use std::process::{Command, Stdio};
use std::time::Duration;

use pubsub_bus::{sweep_orphans, Channel};

/// Spawns a short-lived child that opens a channel and exits without
/// closing it, then confirms the bus can find and reclaim the leftovers.
#[test]
fn sweep_reclaims_a_channel_left_by_a_dead_subscriber() {
    let bin = env!("CARGO_BIN_EXE_pubsub-sub");
    let mut child = Command::new(bin)
        .args(["test.e2e.orphan", "5"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn pubsub-sub");

    // Give the child time to open its channel, then kill it uncleanly.
    std::thread::sleep(Duration::from_millis(200));
    child.kill().expect("kill child");
    child.wait().expect("wait for child");
    std::thread::sleep(Duration::from_millis(100));

    let base = pubsub_bus::base_dir::base_dir();
    let leftover: Vec<_> = fs::read_dir(base)
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("test.e2e.orphan_"))
        .map(|e| e.path())
        .collect();
    assert!(!leftover.is_empty(), "expected the dead subscriber's channel directory to remain");
    assert!(Channel::inactive_paths().iter().any(|p| leftover.contains(p)));

    sweep_orphans();

    for path in leftover {
        assert!(!path.exists(), "sweep_orphans should have removed {}", path.display());
    }
}
