//! Integration tests for the watchdog context against a scripted RCON server.

use async_trait::async_trait;
use rcon_driver::{RconClient, RconError, RconResponse};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use watch_event_system::{Clock, ManualClock};
use watchdog::*;

const ALICE: &str = "76561198000000001";
const BOB: &str = "76561198000000002";

/// Replies to `listplayers` from a script; records every command it sees.
#[derive(Clone, Default)]
struct ScriptedRcon {
    replies: Arc<Mutex<VecDeque<Result<String, ()>>>>,
    commands: Arc<Mutex<Vec<String>>>,
    destroyed: Arc<AtomicUsize>,
}

impl ScriptedRcon {
    fn push_ok(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    fn push_err(&self) {
        self.replies.lock().unwrap().push_back(Err(()));
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl RconClient for ScriptedRcon {
    async fn command(&mut self, max_retries: u32, command: &str) -> Result<RconResponse, RconError> {
        self.commands.lock().unwrap().push(command.to_string());
        let next = if command == "listplayers" {
            self.replies.lock().unwrap().pop_front().unwrap_or(Ok(String::new()))
        } else if command == "gamemodeproperty MinimumEnemies" {
            Ok("MinimumEnemies = \"3\"".to_string())
        } else {
            Ok(String::new())
        };
        match next {
            Ok(text) => Ok(RconResponse { bytes_read: text.len(), text }),
            Err(()) => Err(RconError::RetriesExhausted {
                attempts: max_retries + 1,
                last: Box::new(RconError::ConnectionClosed),
            }),
        }
    }

    async fn destroy(&mut self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingRestarter {
    calls: AtomicUsize,
}

#[async_trait]
impl ServerRestarter for RecordingRestarter {
    async fn restart(&self) -> Result<(), WatchdogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn test_config(dir: &tempfile::TempDir) -> WatchdogConfig {
    WatchdogConfig {
        admin_list_path: dir.path().join("Admins.txt"),
        join_settle_delay: Duration::ZERO,
        tick_interval: Duration::from_millis(20),
        ..WatchdogConfig::default()
    }
}

async fn setup(
    config: WatchdogConfig,
) -> (WatchdogContext, ScriptedRcon, Arc<ManualClock>, Arc<RecordingRestarter>) {
    let rcon = ScriptedRcon::default();
    let clock = Arc::new(ManualClock::new(1_000));
    let restarter = Arc::new(RecordingRestarter::default());
    let context = WatchdogContext::new(config, Box::new(rcon.clone()), restarter.clone(), clock.clone())
        .await
        .unwrap();
    (context, rcon, clock, restarter)
}

async fn record(bus: &EventBus, event: EventId, log: &Arc<Mutex<Vec<String>>>) {
    let log = log.clone();
    bus.on(event, "recorder", move |payload| {
        log.lock().unwrap().push(format!("{}:{}", event.name(), payload));
        0
    })
    .await
    .unwrap();
}

fn two_players() -> String {
    format!("1 {ALICE} Alice 1.2.3.4 10\n2 {BOB} Bob 5.6.7.8 3")
}

#[tokio::test]
async fn test_refresh_dispatches_synthetic_arrivals() {
    let dir = tempfile::tempdir().unwrap();
    let (context, rcon, _, _) = setup(test_config(&dir)).await;
    let log = Arc::new(Mutex::new(Vec::new()));
    record(&context.bus(), EventId::ClientAddSynth, &log).await;

    rcon.push_ok(&two_players());
    context.refresh_roster_now().await;

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            format!("client_add_synth:~SYNTHADD~ {ALICE} 1.2.3.4 Alice"),
            format!("client_add_synth:~SYNTHADD~ {BOB} 5.6.7.8 Bob"),
        ]
    );
    assert_eq!(context.api().players_count().await, 2);
    assert_eq!(context.api().last_roster_time().await, 1_000);
}

#[tokio::test]
async fn test_failed_poll_keeps_last_roster() {
    let dir = tempfile::tempdir().unwrap();
    let (context, rcon, clock, _) = setup(test_config(&dir)).await;
    let api = context.api();

    rcon.push_ok(&format!("1 {ALICE} Alice 1.2.3.4 10"));
    context.refresh_roster_now().await;
    rcon.push_ok(&two_players());
    context.refresh_roster_now().await;
    let before = api.players_roster(InfoDepth::Full, "\n").await;
    let previous_before = api.previous_roster_snapshot().await;
    assert_eq!(previous_before.len(), 1);

    clock.advance(30);
    rcon.push_err();
    assert!(api.refresh_roster().await.is_err());

    assert_eq!(api.players_count().await, 2);
    assert_eq!(api.players_roster(InfoDepth::Full, "\n").await, before);
    assert_eq!(api.previous_roster_snapshot().await, previous_before);
    assert_eq!(api.last_roster_time().await, 1_000);
}

#[tokio::test]
async fn test_departures_come_before_arrivals() {
    let dir = tempfile::tempdir().unwrap();
    let (context, rcon, _, _) = setup(test_config(&dir)).await;
    rcon.push_ok(&format!("1 {ALICE} Alice 1.2.3.4 10"));
    context.refresh_roster_now().await;

    let log = Arc::new(Mutex::new(Vec::new()));
    record(&context.bus(), EventId::ClientAddSynth, &log).await;
    record(&context.bus(), EventId::ClientDelSynth, &log).await;

    rcon.push_ok(&format!("2 {BOB} Bob 5.6.7.8 3"));
    context.refresh_roster_now().await;

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            format!("client_del_synth:~SYNTHDEL~ {ALICE} 1.2.3.4 Alice"),
            format!("client_add_synth:~SYNTHADD~ {BOB} 5.6.7.8 Bob"),
        ]
    );
    assert_eq!(context.api().previous_roster_snapshot().await.len(), 1);
}

#[tokio::test]
async fn test_client_del_line_refreshes_before_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let (context, rcon, _, _) = setup(test_config(&dir)).await;
    rcon.push_ok(&two_players());
    context.refresh_roster_now().await;

    let log = Arc::new(Mutex::new(Vec::new()));
    record(&context.bus(), EventId::ClientDelSynth, &log).await;
    record(&context.bus(), EventId::ClientDel, &log).await;

    rcon.push_ok(&format!("2 {BOB} Bob 5.6.7.8 3"));
    let line = "LogNet: UChannel::Close: Sending CloseBunch";
    assert_eq!(context.handle_line(line).await, Some(EventId::ClientDel));

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with("client_del_synth:~SYNTHDEL~ 76561198000000001"));
    assert_eq!(log[1], format!("client_del:{line}"));
}

#[tokio::test]
async fn test_scheduled_poll_and_out_of_cycle_rearm() {
    let dir = tempfile::tempdir().unwrap();
    let (context, rcon, clock, _) = setup(test_config(&dir)).await;
    let polls = || rcon.commands().iter().filter(|c| *c == "listplayers").count();

    clock.advance(9);
    context.tick().await;
    assert_eq!(polls(), 0);

    clock.advance(1);
    assert_eq!(context.tick().await, 1);
    assert_eq!(polls(), 1);

    // A join at t+15 pushes the next scheduled poll from t+20 to t+25.
    clock.advance(5);
    context.handle_line("LogNet: Join succeeded: Carol").await;
    assert_eq!(polls(), 2);

    clock.advance(5);
    assert_eq!(context.tick().await, 0);
    clock.advance(5);
    assert_eq!(context.tick().await, 1);
    assert_eq!(polls(), 3);
}

#[tokio::test]
async fn test_tick_dispatches_periodic() {
    let dir = tempfile::tempdir().unwrap();
    let (context, _, _, _) = setup(test_config(&dir)).await;
    let log = Arc::new(Mutex::new(Vec::new()));
    record(&context.bus(), EventId::Periodic, &log).await;

    context.tick().await;
    context.tick().await;
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_map_change_sets_map_name() {
    let dir = tempfile::tempdir().unwrap();
    let (context, _, _, _) = setup(test_config(&dir)).await;
    assert_eq!(context.api().map_name().await, "Unknown");

    context
        .handle_line("LogWorld: SeamlessTravel to: /Game/Maps/Ministry/Ministry?Scenario=Scenario_Ministry_Checkpoint_Security")
        .await;
    assert_eq!(context.api().map_name().await, "Ministry");
}

#[tokio::test]
async fn test_server_actions_send_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (context, rcon, _, _) = setup(test_config(&dir)).await;
    let api = context.api();

    api.say("").await.unwrap();
    api.say("Welcome").await.unwrap();
    api.kick(ALICE, "bad name").await.unwrap();
    api.ban(BOB, "cheating").await.unwrap();
    api.game_mode_property_set("MinimumEnemies", "3").await.unwrap();
    let value = api.game_mode_property_get("MinimumEnemies").await.unwrap();

    assert_eq!(value.as_deref(), Some("3"));
    assert_eq!(
        rcon.commands(),
        vec![
            "say Welcome".to_string(),
            format!("kick {ALICE} bad name"),
            format!("ban {BOB} -1 cheating"),
            "gamemodeproperty MinimumEnemies 3".to_string(),
            "gamemodeproperty MinimumEnemies".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_server_restart_resets_roster_clock() {
    let dir = tempfile::tempdir().unwrap();
    let (context, _, clock, restarter) = setup(test_config(&dir)).await;
    let log = Arc::new(Mutex::new(Vec::new()));
    record(&context.bus(), EventId::Restart, &log).await;

    clock.advance(120);
    context.api().server_restart().await.unwrap();

    assert_eq!(restarter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(context.api().last_roster_time().await, 1_120);
    assert_eq!(*log.lock().unwrap(), vec!["restart:".to_string()]);
}

#[tokio::test]
async fn test_admin_and_bad_name_checks() {
    let dir = tempfile::tempdir().unwrap();
    let mut admins = std::fs::File::create(dir.path().join("Admins.txt")).unwrap();
    writeln!(admins, "{ALICE} owner").unwrap();
    let words_path = dir.path().join("BadWords.txt");
    std::fs::write(&words_path, "Cheater\n").unwrap();

    let config = WatchdogConfig {
        bad_words_path: Some(words_path),
        ..test_config(&dir)
    };
    let (context, _, _, _) = setup(config).await;
    let api = context.api();

    assert!(api.is_admin(ALICE));
    assert!(!api.is_admin(BOB));
    assert!(api.bad_name_check("xXcheaterXx"));
    assert!(!api.bad_name_check("Alice"));
}

#[tokio::test]
async fn test_admin_kicks_bad_names_on_join() {
    // Plugin-style handler: kick anyone whose name is banned, unless they are an admin.
    let dir = tempfile::tempdir().unwrap();
    let words_path = dir.path().join("BadWords.txt");
    std::fs::write(&words_path, "rude\n").unwrap();
    std::fs::write(dir.path().join("Admins.txt"), format!("{BOB}\n")).unwrap();
    let config = WatchdogConfig {
        bad_words_path: Some(words_path),
        ..test_config(&dir)
    };
    let (context, rcon, _, _) = setup(config).await;

    let api = context.api();
    context
        .bus()
        .on_async(EventId::ClientAddSynth, "name_guard", move |payload| {
            let api = api.clone();
            async move {
                let mut parts = payload.splitn(4, ' ');
                let (_, guid, _, name) = (parts.next(), parts.next(), parts.next(), parts.next());
                match (guid, name) {
                    (Some(guid), Some(name)) if api.bad_name_check(name) && !api.is_admin(guid) => {
                        api.kick(guid, "name").await.map(|_| 0).unwrap_or(1)
                    }
                    _ => 0,
                }
            }
        })
        .await
        .unwrap();

    rcon.push_ok(&format!("1 {ALICE} RudeAlice 1.2.3.4 0\n2 {BOB} RudeBob 5.6.7.8 0"));
    context.refresh_roster_now().await;

    assert!(rcon.commands().contains(&format!("kick {ALICE} name")));
    assert!(!rcon.commands().iter().any(|c| c.starts_with(&format!("kick {BOB}"))));
}

#[tokio::test]
async fn test_run_loop_handles_lines_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let (context, rcon, _, _) = setup(test_config(&dir)).await;
    let log = Arc::new(Mutex::new(Vec::new()));
    record(&context.bus(), EventId::Chat, &log).await;
    record(&context.bus(), EventId::Signal, &log).await;
    let periodic = Arc::new(AtomicUsize::new(0));
    let counter = periodic.clone();
    context
        .bus()
        .on(EventId::Periodic, "counter", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            0
        })
        .await
        .unwrap();

    let input: &[u8] = b"LogChat: Display: Alice Global Chat: hi\nLogTemp: noise\n";
    let shutdown = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        "SIGTERM".to_string()
    };
    context.run(input, shutdown).await.unwrap();
    context.shutdown().await;

    let log = log.lock().unwrap();
    assert_eq!(log[0], "chat:LogChat: Display: Alice Global Chat: hi");
    assert_eq!(log.last().map(String::as_str), Some("signal:SIGTERM"));
    assert!(periodic.load(Ordering::SeqCst) >= 1);
    assert_eq!(rcon.destroyed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_init_dispatched_on_start() {
    let dir = tempfile::tempdir().unwrap();
    let (context, _, clock, _) = setup(test_config(&dir)).await;
    let log = Arc::new(Mutex::new(Vec::new()));
    record(&context.bus(), EventId::Init, &log).await;

    context.start().await;
    assert_eq!(*log.lock().unwrap(), vec!["init:".to_string()]);
    assert_eq!(context.api().time_get(), clock.now());
    assert!(!context.api().time_get_human().is_empty());
}

struct GreedyPlugin;

#[async_trait]
impl Plugin for GreedyPlugin {
    fn name(&self) -> &str {
        "greedy"
    }

    async fn install(&self, bus: Arc<EventBus>, _api: WatchdogApi) -> Result<(), WatchdogError> {
        for i in 0..2 {
            bus.on(EventId::Chat, &format!("greedy_{i}"), |_| 0).await?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_plugin_install_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = WatchdogConfig {
        max_subscribers: 1,
        ..test_config(&dir)
    };
    let (mut context, _, _, _) = setup(config).await;

    let result = context.install_plugin(Box::new(GreedyPlugin)).await;
    match result {
        Err(WatchdogError::Plugin(message)) => assert!(message.starts_with("greedy failed to install")),
        other => panic!("expected a plugin error, got {other:?}"),
    }
    assert!(context.plugin_names().is_empty());
}
