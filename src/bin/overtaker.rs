//! Highway overtake scenario.
//!
//! An NPC spawns 50 m behind the EGO in the same lane, drives at 11.55 m/s,
//! changes into the left lane once within 20 m, passes, and changes back
//! once 15 m ahead. The EGO is expected to be driven by an AD stack over the
//! bridge; it is only braked here when it exceeds 10 m/s.
//!
//! Usage:
//!   cargo run --bin overtaker -- <NPC> [OPTIONS]
//!
//! `<NPC>` is one of Sedan, SUV, Jeep, HatchBack, SchoolBus, DeliveryTruck.
//! `SIMULATOR_HOST` and `BRIDGE_HOST` select the hosts (default 127.0.0.1).

use std::time::Duration;

use clap::Parser;
use env_logger::Env;

use scenario_sitl::cli::ConnectionArgs;
use scenario_sitl::console::wait_for_enter;
use scenario_sitl::kinematics::LongitudinalAxis;
use scenario_sitl::scenario::OvertakeScenario;
use scenario_sitl::{
    LightweightSimulator, NpcModel, OvertakeConfig, RemoteSimulator, SimulatorApi,
};

#[derive(Debug, Parser)]
#[command(name = "overtaker", about = "NPC overtakes the EGO on a highway")]
struct Cli {
    /// NPC model: Sedan, SUV, Jeep, HatchBack, SchoolBus or DeliveryTruck
    npc: Option<String>,

    #[command(flatten)]
    connection: ConnectionArgs,

    /// Do not wait for Enter before the scenario loop
    #[arg(long)]
    no_prompt: bool,

    /// Judge ahead/behind along the EGO heading instead of world X
    #[arg(long)]
    heading_axis: bool,

    /// Seconds to wait for the bridge before giving up (0 waits forever)
    #[arg(long, default_value_t = 60)]
    bridge_timeout_s: u64,

    /// Abort if the overtake has not completed after this many ticks
    #[arg(long)]
    max_ticks: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let Some(npc) = cli.npc.as_deref() else {
        println!("Insufficient arguments");
        return Ok(());
    };
    let npc: NpcModel = match npc.parse() {
        Ok(model) => model,
        Err(e) => {
            println!("{e}");
            return Ok(());
        }
    };

    let mut config = OvertakeConfig::default();
    if cli.heading_axis {
        config.axis = LongitudinalAxis::EgoHeading;
    }
    config.readiness.timeout =
        (cli.bridge_timeout_s > 0).then(|| Duration::from_secs(cli.bridge_timeout_s));
    config.max_ticks = cli.max_ticks;

    let connection = cli.connection.to_config();
    let scenario = OvertakeScenario::new(config, &connection);

    let mut sim: Box<dyn SimulatorApi> = if cli.connection.offline {
        Box::new(LightweightSimulator::with_defaults())
    } else {
        Box::new(RemoteSimulator::connect(&connection).await?)
    };
    log::info!("using {} simulator", sim.backend());

    run(sim.as_mut(), &scenario, npc, !cli.no_prompt).await
}

async fn run(
    sim: &mut dyn SimulatorApi,
    scenario: &OvertakeScenario,
    npc: NpcModel,
    prompt: bool,
) -> anyhow::Result<()> {
    let agents = scenario.setup(sim, npc).await?;

    println!("Connecting to bridge");
    scenario.connect_bridge(sim, &agents).await?;
    println!("Bridge connected");

    scenario.start(sim, &agents).await?;

    if prompt {
        wait_for_enter("Press enter to run simulation").await?;
    }

    let report = scenario.drive(sim, &agents).await?;
    log::info!(
        "overtake complete after {} ticks ({} with EGO braking)",
        report.ticks,
        report.brake_ticks
    );

    scenario.settle(sim, &agents).await?;
    Ok(())
}
