//! Maps game server log lines to events.

use watch_event_system::EventId;

/// Substrings that identify an event in a log line, checked in order.
const PATTERNS: &[(&str, EventId)] = &[
    ("LogNet: Join succeeded:", EventId::ClientAdd),
    ("LogNet: UChannel::Close:", EventId::ClientDel),
    ("SeamlessTravel to:", EventId::MapChange),
    ("Match State Changed from GameStarting to PreRound", EventId::GameStart),
    ("Match State Changed from GameOver to LeavingMap", EventId::GameEnd),
    ("Match State Changed from PreRound to RoundActive", EventId::RoundStart),
    ("Match State Changed from RoundWon to PostRound", EventId::RoundEnd),
    ("LogGameMode: Display: Advancing spawns for faction", EventId::ObjectiveCaptured),
    ("LogExit: Game engine shut down", EventId::Shutdown),
    ("LogChat: Display:", EventId::Chat),
];

/// Returns the event a log line announces, if any.
pub fn classify(line: &str) -> Option<EventId> {
    PATTERNS
        .iter()
        .find(|(needle, _)| line.contains(needle))
        .map(|&(_, event)| event)
}
