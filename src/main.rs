use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use switchboard::application::{run_client, PhoneClient, PhoneCommand, PhoneServer};
use switchboard::config::Config;
use switchboard::domain::directory::{Directory, DirectoryService};
use switchboard::domain::shared::value_objects::{ClipId, EndpointId, Position};
use switchboard::infrastructure::metrics::init_metrics;
use switchboard::infrastructure::{ChannelSink, ChannelTransport, SimulatedWorld};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

const CALLER: EndpointId = EndpointId::new(1);
const CALLEE: EndpointId = EndpointId::new(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting Switchboard");
    info!("Effective configuration:\n{}", config.to_toml()?);

    let prometheus = init_metrics()?;

    let (transport, server_inbox) = ChannelTransport::new();
    let server = Arc::new(PhoneServer::new(DirectoryService::new(Directory::new())));
    let server_task = {
        let server = server.clone();
        tokio::spawn(async move { server.run(server_inbox).await })
    };

    let (caller_commands, caller_task) =
        start_client(&server, &transport, &config, CALLER, 99).await;
    let (callee_commands, callee_task) =
        start_client(&server, &transport, &config, CALLEE, 42).await;
    drop(transport);

    let pause = config.tick_interval() * 2;
    tokio::time::sleep(pause).await;

    // 0099 calls 0042, which picks up, then 0099 hangs up.
    caller_commands.send(PhoneCommand::Toggle)?;
    for digit in [0, 0, 4, 2] {
        caller_commands.send(PhoneCommand::Digit(digit))?;
    }
    caller_commands.send(PhoneCommand::CallButton)?;
    tokio::time::sleep(pause).await;

    callee_commands.send(PhoneCommand::Toggle)?;
    callee_commands.send(PhoneCommand::CallButton)?;
    tokio::time::sleep(pause * 3).await;

    caller_commands.send(PhoneCommand::HangUp)?;
    tokio::time::sleep(pause).await;

    drop(caller_commands);
    drop(callee_commands);
    for (endpoint, task) in [(CALLER, caller_task), (CALLEE, callee_task)] {
        task.await?;
        server.detach(endpoint).await?;
    }
    server_task.await?;

    info!("Switchboard stopped");
    println!("{}", prometheus.render());
    Ok(())
}

/// Spawn a client whose world holds both players and a radio playing next
/// to the caller, within earshot of the callee's phone.
async fn start_client(
    server: &Arc<PhoneServer>,
    transport: &ChannelTransport,
    config: &Config,
    local: EndpointId,
    requested: i32,
) -> (
    mpsc::UnboundedSender<PhoneCommand>,
    JoinHandle<PhoneClient<SimulatedWorld>>,
) {
    let mut world = SimulatedWorld::new();
    let radio = ClipId::new("radio");
    world.register_clip(radio.clone(), 30.0);
    world.add_player(CALLER, Position::ORIGIN);
    world.add_player(CALLEE, Position::new(0.0, 7.0, 0.0));
    let sound = world.add_sound(Position::new(2.0, 0.0, 0.0), radio);
    world.set_elapsed(sound, 1.0);

    let (sink, inbox) = ChannelSink::new();
    server.attach(local, Arc::new(sink)).await;

    let mut client = PhoneClient::new(local, world, config);
    client.request_number(Some(requested));

    let (commands, command_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_client(
        client,
        transport.clone(),
        inbox,
        command_rx,
        config.tick_interval(),
    ));
    (commands, task)
}
