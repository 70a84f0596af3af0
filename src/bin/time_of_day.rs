//! Time-of-day demo.
//!
//! Spawns an EGO at the map's second spawn point, freezes the clock at
//! 19:00, then sets 10:30 and lets the clock run.
//!
//! Usage:
//!   cargo run --bin time_of_day -- [OPTIONS]

use clap::Parser;
use env_logger::Env;

use scenario_sitl::cli::ConnectionArgs;
use scenario_sitl::console::wait_for_enter;
use scenario_sitl::{LightweightSimulator, RemoteSimulator, SimulatorApi, TimeOfDayDemo};

#[derive(Debug, Parser)]
#[command(name = "time_of_day", about = "Set the simulator's time of day")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Do not wait for Enter before each change
    #[arg(long)]
    no_prompt: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut sim: Box<dyn SimulatorApi> = if cli.connection.offline {
        Box::new(LightweightSimulator::with_defaults())
    } else {
        Box::new(RemoteSimulator::connect(&cli.connection.to_config()).await?)
    };
    let sim = sim.as_mut();
    let demo = TimeOfDayDemo::default();

    demo.spawn(sim).await?;
    println!("{}", sim.time_of_day().await?);

    if !cli.no_prompt {
        wait_for_enter("Press Enter to set fixed time to 19:00").await?;
    }
    println!("{}", demo.set_fixed(sim).await?);
    demo.run(sim).await?;

    if !cli.no_prompt {
        wait_for_enter("Press Enter to set normal time to 10:30").await?;
    }
    println!("{}", demo.set_running(sim).await?);
    demo.run(sim).await?;

    println!("{}", sim.time_of_day().await?);
    Ok(())
}
