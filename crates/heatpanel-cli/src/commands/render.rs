use heatpanel_core::{FrameRenderer, Mode, NetworkStatus, SimulationParameters};

pub fn run(
    mode: &str,
    length: f64,
    amplitude: f64,
    diffusivity: f64,
    t: f64,
    config_path: Option<&str>,
    output: &str,
) {
    let config = super::load_config(config_path);

    let Some(mode) = Mode::parse(mode) else {
        eprintln!("Error: unknown mode '{mode}' (expected 1D or 2D)");
        std::process::exit(1);
    };
    let params = SimulationParameters {
        mode,
        length,
        amplitude,
        diffusivity,
    };
    if let Err(e) = params.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let renderer = FrameRenderer::new(config.display.width, config.display.height);
    let frame = renderer.render_at(&params, config.grid_size, t.max(0.0), NetworkStatus::Connected);

    if let Err(e) = std::fs::write(output, frame.to_ppm()) {
        eprintln!("Error writing {output}: {e}");
        std::process::exit(1);
    }
    println!(
        "Wrote {}x{} {} frame at t={t}s to {output}",
        frame.width(),
        frame.height(),
        params.mode
    );
}
