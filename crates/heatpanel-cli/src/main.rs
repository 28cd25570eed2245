//! CLI for heatpanel: the heat equation, live on a tiny display.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "heatpanel")]
#[command(about = "heatpanel: the heat equation decaying live on a small pixel display")]
#[command(version = heatpanel_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the display: render loop, network monitor and control API
    Run {
        /// JSON config file (missing fields keep their defaults)
        #[arg(long)]
        config: Option<String>,

        /// Control API bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Control API port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Frame sink: null, terminal, or fb:<path> (e.g. fb:/dev/fb1)
        #[arg(long, default_value = "terminal")]
        transport: String,

        /// Display width in pixels (overrides config)
        #[arg(long)]
        width: Option<usize>,

        /// Display height in pixels (overrides config)
        #[arg(long)]
        height: Option<usize>,

        /// Simulated seconds per wall-clock second (overrides config)
        #[arg(long)]
        time_scale: Option<f64>,

        /// Skip the IP banner at startup and on refresh
        #[arg(long)]
        no_banner: bool,
    },

    /// Render a single still frame to a PPM file
    Render {
        /// 1D or 2D
        #[arg(long, default_value = "1D")]
        mode: String,

        /// Domain length L (> 0)
        #[arg(long = "L", default_value = "1.0")]
        length: f64,

        /// Initial amplitude M
        #[arg(long = "M", default_value = "1.0")]
        amplitude: f64,

        /// Diffusivity D (> 0)
        #[arg(long = "D", default_value = "0.1")]
        diffusivity: f64,

        /// Simulated time in seconds
        #[arg(long, default_value = "0.0")]
        t: f64,

        /// JSON config file for display geometry and grid size
        #[arg(long)]
        config: Option<String>,

        /// Output path
        #[arg(long, short, default_value = "frame.ppm")]
        output: String,
    },

    /// Run one connectivity probe and print the local address
    Probe {
        /// JSON config file for probe targets and timeout
        #[arg(long)]
        config: Option<String>,
    },

    /// Print the effective configuration as JSON
    Config {
        /// JSON config file to load and validate
        #[arg(long)]
        config: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            host,
            port,
            transport,
            width,
            height,
            time_scale,
            no_banner,
        } => commands::run::run(commands::run::RunOptions {
            config,
            host,
            port,
            transport,
            width,
            height,
            time_scale,
            no_banner,
        }),
        Commands::Render {
            mode,
            length,
            amplitude,
            diffusivity,
            t,
            config,
            output,
        } => commands::render::run(
            &mode,
            length,
            amplitude,
            diffusivity,
            t,
            config.as_deref(),
            &output,
        ),
        Commands::Probe { config } => commands::probe::run(config.as_deref()),
        Commands::Config { config } => commands::config::run(config.as_deref()),
    }
}
