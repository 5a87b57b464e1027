//! Call flow integration tests over the loopback network

use std::time::Duration;
use switchboard::application::{LocalNetwork, PhoneClient, PhoneCommand, PhoneServer};
use switchboard::config::Config;
use switchboard::domain::directory::{Directory, DirectoryService};
use switchboard::domain::phone::{CallSlot, Cue, EndReason, PhoneEventKind, PhoneNumber, PhoneState};
use switchboard::domain::shared::value_objects::{EndpointId, Position};
use switchboard::infrastructure::SimulatedWorld;

fn number(n: u16) -> PhoneNumber {
    PhoneNumber::new(n).unwrap()
}

fn ep(id: u64) -> EndpointId {
    EndpointId::new(id)
}

fn client(id: u64, requested: i32, config: &Config) -> PhoneClient<SimulatedWorld> {
    let mut world = SimulatedWorld::new();
    for other in 1..=4 {
        world.add_player(ep(other), Position::new(other as f32 * 100.0, 0.0, 0.0));
    }
    let mut client = PhoneClient::new(ep(id), world, config);
    client.request_number(Some(requested));
    client
        .execute(PhoneCommand::Toggle, std::time::Instant::now())
        .unwrap();
    client
}

async fn network_with(config: &Config, phones: &[(u64, i32)]) -> LocalNetwork<SimulatedWorld> {
    let server = PhoneServer::new(DirectoryService::new(Directory::with_seed(7)));
    let mut network = LocalNetwork::new(server);
    for (id, requested) in phones {
        network.join(client(*id, *requested, config));
        network.pump().await;
    }
    network
}

async fn network(phones: &[(u64, i32)]) -> LocalNetwork<SimulatedWorld> {
    network_with(&Config::default(), phones).await
}

fn state(network: &LocalNetwork<SimulatedWorld>, index: usize) -> PhoneState {
    network.client(index).local().unwrap().state()
}

/// Dial from client `from` and deliver everything
async fn dial(network: &mut LocalNetwork<SimulatedWorld>, from: usize, digits: &str) {
    let now = network.now();
    network.client_mut(from).dial(digits, now).unwrap();
    network.pump().await;
}

async fn press(network: &mut LocalNetwork<SimulatedWorld>, index: usize, command: PhoneCommand) {
    let now = network.now();
    network.client_mut(index).execute(command, now).unwrap();
    network.pump().await;
}

async fn connected_pair() -> LocalNetwork<SimulatedWorld> {
    let mut network = network(&[(1, 99), (2, 42)]).await;
    dial(&mut network, 0, "0042").await;
    press(&mut network, 1, PhoneCommand::CallButton).await;
    network
}

#[tokio::test]
async fn test_numbers_assigned_and_displayed() {
    let network = network(&[(1, 99), (2, 42)]).await;

    assert_eq!(network.client(0).local().unwrap().number(), Some(number(99)));
    assert_eq!(network.client(1).local().unwrap().number(), Some(number(42)));
    assert_eq!(number(42).to_string(), "0042");
    assert_eq!(network.server().registered_numbers().await, 2);
}

#[tokio::test]
async fn test_colliding_requests_get_unique_numbers() {
    let network = network(&[(1, 1234), (2, 1234), (3, 1234)]).await;

    let numbers: Vec<u16> = network
        .clients()
        .iter()
        .map(|c| c.local().unwrap().number().unwrap().value())
        .collect();
    assert_eq!(numbers, vec![1234, 1235, 1236]);
}

#[tokio::test]
async fn test_dialing_unregistered_number() {
    let mut network = network(&[(1, 99)]).await;
    network.client_mut(0).take_events();

    dial(&mut network, 0, "0042").await;

    let phone = network.client(0).local().unwrap();
    assert!(phone.outgoing().is_none());
    assert_eq!(phone.state(), PhoneState::Idle);

    let events = network.client_mut(0).take_events();
    assert!(events.iter().any(|e| e.kind
        == PhoneEventKind::Disconnected {
            number: number(42),
            reason: EndReason::InvalidNumber
        }));
}

#[tokio::test]
async fn test_call_connects_both_ends() {
    let mut network = network(&[(1, 99), (2, 42)]).await;

    dial(&mut network, 0, "0042").await;
    assert_eq!(state(&network, 0), PhoneState::Dialing);
    assert_eq!(
        network.client(1).local().unwrap().incoming(),
        Some(&CallSlot::new(number(99), Some(ep(1))))
    );

    press(&mut network, 1, PhoneCommand::CallButton).await;

    assert_eq!(
        network.client(0).local().unwrap().active(),
        Some(&CallSlot::new(number(42), Some(ep(2))))
    );
    assert_eq!(
        network.client(1).local().unwrap().active(),
        Some(&CallSlot::new(number(99), Some(ep(1))))
    );
}

#[tokio::test]
async fn test_every_client_agrees_on_call_state() {
    let network = connected_pair().await;

    for client in network.clients() {
        let a = client.handset(ep(1)).unwrap();
        let b = client.handset(ep(2)).unwrap();
        assert_eq!(a.endpoint.active().map(|s| s.number), b.endpoint.number());
        assert_eq!(b.endpoint.active().map(|s| s.number), a.endpoint.number());
        assert_eq!(a.partner(), Some(ep(2)));
        assert_eq!(b.partner(), Some(ep(1)));
        assert!(a.endpoint.occupied_slots() <= 1);
        assert!(b.endpoint.occupied_slots() <= 1);
    }
}

#[tokio::test]
async fn test_busy_line_rejects_third_caller() {
    let mut network = connected_pair().await;
    network.join(client(3, 77, &Config::default()));
    network.pump().await;
    network.client_mut(2).take_events();

    let before = network.client(1).local().unwrap().call_values();
    dial(&mut network, 2, "0042").await;

    assert_eq!(network.client(1).local().unwrap().call_values(), before);
    assert_eq!(state(&network, 2), PhoneState::Idle);
    let events = network.client_mut(2).take_events();
    assert!(events.iter().any(|e| matches!(
        e.kind,
        PhoneEventKind::Disconnected {
            reason: EndReason::LineBusy,
            ..
        }
    )));
    assert!(events.iter().any(|e| e.kind.cue() == Some(Cue::BusyTone)));
}

#[tokio::test]
async fn test_hang_up_ends_call_on_both_sides() {
    let mut network = connected_pair().await;

    press(&mut network, 0, PhoneCommand::HangUp).await;

    assert_eq!(state(&network, 0), PhoneState::Idle);
    assert_eq!(state(&network, 1), PhoneState::Idle);
    for client in network.clients() {
        assert_eq!(
            client.handset(ep(2)).unwrap().endpoint.state(),
            PhoneState::Idle
        );
    }

    // Nothing left to hang up.
    let now = network.now();
    assert!(network
        .client_mut(0)
        .execute(PhoneCommand::HangUp, now)
        .is_err());
}

#[tokio::test]
async fn test_caller_cancels_while_ringing() {
    let mut network = network(&[(1, 99), (2, 42)]).await;
    dial(&mut network, 0, "0042").await;
    assert_eq!(state(&network, 1), PhoneState::RingingIn);

    press(&mut network, 0, PhoneCommand::HangUp).await;

    assert_eq!(state(&network, 0), PhoneState::Idle);
    assert_eq!(state(&network, 1), PhoneState::Idle);
}

#[tokio::test]
async fn test_late_joiner_sees_existing_calls() {
    let mut network = connected_pair().await;

    network.join(client(3, 77, &Config::default()));
    network.pump().await;

    let late = network.client(2);
    let a = late.handset(ep(1)).unwrap();
    let b = late.handset(ep(2)).unwrap();
    assert_eq!(a.endpoint.number(), Some(number(99)));
    assert_eq!(b.endpoint.number(), Some(number(42)));
    assert_eq!(a.endpoint.active().map(|s| s.number), Some(number(42)));
    assert_eq!(b.endpoint.active().map(|s| s.number), Some(number(99)));
}

#[tokio::test]
async fn test_leaving_hangs_up_partner_and_frees_number() {
    let mut network = connected_pair().await;

    network.leave(0).await;

    assert_eq!(state(&network, 0), PhoneState::Idle);
    assert!(network.client(0).handset(ep(1)).is_none());
    assert_eq!(network.server().registered_numbers().await, 1);

    network.join(client(3, 99, &Config::default()));
    network.pump().await;
    let index = network.index_of(ep(3)).unwrap();
    assert_eq!(
        network.client(index).local().unwrap().number(),
        Some(number(99))
    );
}

#[tokio::test]
async fn test_unanswered_call_times_out() {
    let mut network = network(&[(1, 99), (2, 42)]).await;
    dial(&mut network, 0, "0042").await;

    network.tick(Duration::from_secs(10)).await;
    assert_eq!(state(&network, 0), PhoneState::Dialing);

    network.tick(Duration::from_secs(21)).await;
    assert_eq!(state(&network, 0), PhoneState::Idle);
    assert_eq!(state(&network, 1), PhoneState::Idle);
}

#[tokio::test]
async fn test_ring_timeout_can_be_disabled() {
    let mut config = Config::default();
    config.network.ring_timeout_secs = 0;
    let mut network = network_with(&config, &[(1, 99), (2, 42)]).await;
    dial(&mut network, 0, "0042").await;

    network.tick(Duration::from_secs(600)).await;
    assert_eq!(state(&network, 0), PhoneState::Dialing);
    assert_eq!(state(&network, 1), PhoneState::RingingIn);
}
