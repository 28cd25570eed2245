use std::time::{Duration, Instant};

use heatpanel_core::{Prober, TcpProber, local_ip};

pub fn run(config_path: Option<&str>) {
    let config = super::load_config(config_path);
    let prober = TcpProber::new(
        config.probe_targets.clone(),
        Duration::from_millis(config.probe_timeout_ms),
    );

    println!("Probing: {}", config.probe_targets.join(", "));
    let t0 = Instant::now();
    let reachable = prober.probe();
    let elapsed = t0.elapsed();

    println!(
        "  Network:   {}",
        if reachable { "reachable" } else { "unreachable" }
    );
    println!("  Time:      {:.3}s", elapsed.as_secs_f64());
    match local_ip() {
        Some(ip) => println!("  Address:   http://{ip}:{}", config.port),
        None => println!("  Address:   none"),
    }

    if !reachable {
        std::process::exit(1);
    }
}
