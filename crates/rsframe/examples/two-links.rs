//! Two framing instances fed from two threads.
//!
//! Run with:
//!   cargo run -p rsframe --example two-links

use std::sync::mpsc;
use std::thread;

use rsframe::{PacketEvent, ProtocolConfig, Registry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::channel::<String>();
    let mut registry: Registry<str> = Registry::new(ProtocolConfig::default());

    let mut handles = Vec::new();
    for (p1, p2) in [(0xAA, 0x55), (0x7E, 0x81)] {
        let tx = tx.clone();
        let handle = registry.create_instance(
            move |event: PacketEvent, link: &str| {
                if let PacketEvent::ValidData(packet) = event {
                    let text = String::from_utf8_lossy(&packet.payload).into_owned();
                    let _ = tx.send(format!("{link}: {text}"));
                }
            },
            p1,
            p2,
        )?;
        handles.push(handle);
    }
    drop(tx);

    // Each link carries a few frames, delivered in awkward slices.
    let mut streams = Vec::new();
    for (index, handle) in handles.iter().enumerate() {
        let mut wire = Vec::new();
        for n in 0..3 {
            let frame = registry.build_single_param(format!("message {n}").as_bytes(), *handle)?;
            wire.extend_from_slice(&frame);
        }
        streams.push((format!("link{index}"), wire));
    }

    thread::scope(|scope| {
        for (instance, (link, wire)) in registry.instances_mut().zip(&streams) {
            scope.spawn(move || {
                for chunk in wire.chunks(5) {
                    instance.feed_bytes(chunk, link.as_str());
                }
            });
        }
    });

    // The handlers own the remaining senders; dropping the registry closes the channel.
    drop(registry);
    let mut lines: Vec<String> = rx.into_iter().collect();
    lines.sort();
    for line in lines {
        println!("{line}");
    }
    Ok(())
}
