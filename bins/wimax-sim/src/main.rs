use clap::Parser;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use as_any::AsAny;
use wimax_config::{SharedConfig, toml_config};
use wimax_core::{Sfid, SfDirection, debug};
use wimax_entities::bs::BsNetDevice;
use wimax_entities::sflow::ServiceFlowRecord;
use wimax_entities::ss::SsNetDevice;
use wimax_entities::{EntityId, MessageRouter};

/// Load configuration file
fn load_config_from_toml(cfg_path: &str) -> SharedConfig {
    match toml_config::from_file(cfg_path) {
        Ok(c) => c,
        Err(e) => {
            println!("Failed to load configuration from {}: {}", cfg_path, e);
            std::process::exit(1);
        }
    }
}

/// Registers the BS and one subscriber station per configured subscriber
fn build_stack(cfg: &SharedConfig) -> MessageRouter {
    let mut router = MessageRouter::new(cfg.clone());
    router.register_entity(Box::new(BsNetDevice::new(cfg.clone())));
    for subscriber in cfg.config().subscribers.iter() {
        router.register_entity(Box::new(SsNetDevice::new(cfg.clone(), subscriber.clone())));
    }
    eprintln!(" -> BS {} with {} subscriber(s)", cfg.config().mac.bs_id, cfg.config().subscribers.len());
    router
}

/// Prints one line per service flow. Uplink flows are counted as sent by the station and
/// received by the BS, downlink flows the other way around.
fn print_flow_stats(router: &mut MessageRouter, cfg: &SharedConfig) {
    let bs_records: HashMap<Sfid, ServiceFlowRecord> = match router
        .get_entity(EntityId::Bs)
        .and_then(|e| e.as_any_mut().downcast_mut::<BsNetDevice>())
    {
        Some(bs) => {
            let stats = bs.stats();
            println!(
                "BS: {} frames, {} stations ranged, {} UL bursts ({} undecodable), {} bandwidth requests",
                stats.frames, stats.stations_ranged, stats.ul_bursts, stats.ul_parse_errors, stats.bw_requests
            );
            bs.service_flows().flows().map(|sf| (sf.sfid(), sf.record().clone())).collect()
        }
        None => HashMap::new(),
    };

    println!(
        "{:<19} {:>6} {:>6} {:<5} {:<6} {:<11} {:>8} {:>10} {:>8} {:>10}",
        "station", "sfid", "cid", "dir", "type", "state", "tx pkts", "tx bytes", "rx pkts", "rx bytes"
    );
    for subscriber in cfg.config().subscribers.iter() {
        let mac = subscriber.mac_address;
        let Some(ss) = router
            .get_entity(EntityId::Ss(mac))
            .and_then(|e| e.as_any_mut().downcast_mut::<SsNetDevice>())
        else {
            continue;
        };
        if ss.service_flows().is_empty() {
            println!("{:<19} no service flows ({})", mac.to_string(), ss.link_state());
            continue;
        }
        for sf in ss.service_flows().flows() {
            let ss_rec = sf.record();
            let Some(bs_rec) = bs_records.get(&sf.sfid()) else {
                println!(
                    "{:<19} {:>6} {:>6} {:<5} {:<6} {:<11}",
                    mac.to_string(),
                    "-",
                    "-",
                    format!("{:?}", sf.direction()),
                    format!("{:?}", sf.scheduling_type()),
                    sf.state().to_string()
                );
                continue;
            };
            let (tx, rx) = match sf.direction() {
                SfDirection::Up => (ss_rec, bs_rec),
                SfDirection::Down => (bs_rec, ss_rec),
            };
            println!(
                "{:<19} {:>6} {:>6} {:<5} {:<6} {:<11} {:>8} {:>10} {:>8} {:>10}",
                mac.to_string(),
                sf.sfid(),
                sf.cid().to_string(),
                format!("{:?}", sf.direction()),
                format!("{:?}", sf.scheduling_type()),
                sf.state().to_string(),
                tx.pkts_sent,
                tx.bytes_sent,
                rx.pkts_rcvd,
                rx.bytes_rcvd
            );
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "WiMAX MAC simulator",
    long_about = "Runs a WiMAX base station and its subscriber stations using the provided TOML configuration file"
)]
struct Args {
    /// Config file (required)
    #[arg(help = "TOML config with PHY, MAC, scheduler and subscriber parameters")]
    config: String,

    /// Number of frames to run, runs until Ctrl+C if omitted
    #[arg(short = 'n', long = "frames")]
    frames: Option<usize>,
}

fn main() {
    eprintln!("[+] WiMAX MAC simulator");

    let args = Args::parse();
    let cfg = load_config_from_toml(&args.config);
    let _log_guard = debug::setup_logging_default(cfg.config().debug_log.clone());

    let mut router = build_stack(&cfg);

    // Set up Ctrl+C handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("failed to set Ctrl+C handler");

    router.run_stack(args.frames, Some(running));
    tracing::info!("Stopped after {} frames", router.frame_time().frame);

    print_flow_stats(&mut router, &cfg);
}
