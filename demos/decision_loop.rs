//! Decision Loop Example
//!
//! Drives a small unlicensed-spectrum scenario: three sub-bands with light,
//! moderate and heavy coexisting traffic, eight terminals, and the LCA
//! heuristic rebalancing them every decision window while a simple MAC loop
//! keeps probing the channel.
//!
//! Run: cargo run --example decision_loop --release

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use airtime_rs::{AccessOutcome, AirtimeBuilder, SimPhy, SubBandId, TerminalId};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let phy = Rc::new(RefCell::new(SimPhy::new()));
    for (band, bits) in [(0u16, 24.0), (1, 20.0), (2, 16.0)] {
        phy.borrow_mut().set_band_bits_per_rb(SubBandId(band), bits);
    }
    for t in 0..8u16 {
        phy.borrow_mut()
            .set_terminal_stats(TerminalId(t), 6, 0.003, 120.0, 18.0);
    }

    let sim = AirtimeBuilder::new()
        .phy(phy.clone())
        .env_prefix("AIRTIME")
        .time_window_slots(200)
        .seed(42)
        .build()?;

    // Light, moderate and heavy coexisting traffic (arrivals per second).
    sim.add_sub_band(SubBandId(0), 12, 40.0)?;
    sim.add_sub_band(SubBandId(1), 10, 400.0)?;
    sim.add_sub_band(SubBandId(2), 10, 1600.0)?;
    for t in 0..8 {
        sim.add_terminal(TerminalId(t))?;
    }

    sim.start()?;

    // Ten simulated seconds: a simple MAC loop requests the channel on every
    // band each millisecond, feeding the failure statistics the scheduler
    // decides on.
    let mut grants = [0u32; 3];
    let mut denials = [0u32; 3];
    for _ in 0..10_000 {
        for band in 0..3u16 {
            match sim.lbt().request_access(SubBandId(band))? {
                AccessOutcome::Granted => grants[band as usize] += 1,
                AccessOutcome::Denied(_) => denials[band as usize] += 1,
            }
        }
        sim.run_for(Duration::from_millis(1));
    }

    println!("\n=== After {} simulated seconds ===", 10);
    println!(
        "decision windows completed: {}",
        sim.scheduler().windows_completed()
    );

    let stats = sim.scheduler().last_statistics().expect("windows ran");
    println!("\nper sub-band:");
    for band in &stats.sub_bands {
        let idx = band.id.0 as usize;
        println!(
            "  sub-band {}: failure rate {:.3}, occupancy {:.3}, cw {:>3}, \
             bits/RB {:.1}, grants {}, denials {}",
            band.id,
            band.failure_rate,
            band.occupancy,
            band.contention_window,
            band.avg_bits_per_rb,
            grants[idx],
            denials[idx],
        );
    }

    println!("\nassignments:");
    for (terminal, band) in sim.registry().terminal_map() {
        println!("  terminal {terminal} -> sub-band {band}");
    }
    println!(
        "\nPHY heard {} switch notifications",
        phy.borrow().switch_log().len()
    );

    Ok(())
}
