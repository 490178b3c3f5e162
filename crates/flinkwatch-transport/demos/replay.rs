//! Offline replay
//!
//! Pushes a generated event stream through the frame parser, the decoder
//! and the snapshot store in uneven chunks, the way a slow network would
//! deliver it, and reports the throughput.
//!
//! Run with: cargo run -p flinkwatch-transport --example replay --release

use std::time::Instant;

use flinkwatch_core::SnapshotStore;
use flinkwatch_protocol::{decode, Disposition, FrameParser};

const DEPLOYMENTS: usize = 2_000;
const ROUNDS: usize = 20;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let stream = generate();
    println!("Stream: {} bytes, {} events", stream.len(), DEPLOYMENTS * ROUNDS);

    let store = SnapshotStore::new();
    let mut parser = FrameParser::new();
    let mut frames = 0u64;
    let mut errors = 0u64;

    let start = Instant::now();
    let mut offset = 0;
    let mut chunk = 1;
    while offset < stream.len() {
        let end = (offset + chunk).min(stream.len());
        parser.feed(&stream[offset..end]);
        offset = end;
        chunk = chunk * 7 % 4093 + 1;

        while let Some(frame) = parser.parse()? {
            frames += 1;
            match decode(&frame) {
                Disposition::Apply(event) => {
                    store.apply(event);
                }
                Disposition::Error(_) => errors += 1,
                Disposition::Ignore => {}
            }
        }
    }
    let elapsed = start.elapsed();

    println!("Frames:      {}", frames);
    println!("Heartbeats:  {}", parser.heartbeats());
    println!("Errors:      {}", errors);
    println!("Resources:   {}", store.len());
    println!("Revision:    {}", store.revision());
    println!("Duration:    {:.2?}", elapsed);
    println!(
        "Throughput:  {:.0} frames/sec",
        frames as f64 / elapsed.as_secs_f64()
    );

    Ok(())
}

fn generate() -> Vec<u8> {
    let mut out = String::new();
    for round in 0..ROUNDS {
        for i in 0..DEPLOYMENTS {
            let kind = if round == 0 { "ADDED" } else { "MODIFIED" };
            let event = serde_json::json!({
                "type": kind,
                "deployment": {
                    "metadata": {
                        "uid": format!("uid-{}", i),
                        "name": format!("job-{}", i),
                        "namespace": format!("team-{}", i % 8),
                        "resourceVersion": (round * DEPLOYMENTS + i).to_string()
                    },
                    "spec": { "flinkVersion": "v1_18" },
                    "status": { "lifecycleState": "STABLE", "jobStatus": { "state": "RUNNING" } }
                }
            });
            out.push_str(&format!("id: uid-{}-{}\ndata: {}\n\n", i, round, event));
        }
        out.push_str(": heartbeat\n\n");
    }
    out.into_bytes()
}
