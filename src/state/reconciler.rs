//! Once-a-second membership sweep.
//!
//! Standing in a wait area is what joins a player to a session; stepping
//! out (before the round starts) is what removes them. The sweep also plays
//! the "everyone is back" cue and drops players who went offline without a
//! quit event.

use super::host::Host;
use super::machine::SessionState;
use super::service::PillarService;
use super::tasks::Scheduler;
use tracing::info;

impl<H: Host, S: Scheduler> PillarService<H, S> {
    /// Run one membership sweep.
    pub fn reconcile(&mut self) {
        for player in self.host.online_players() {
            match self.registry.session_of(&player).map(str::to_string) {
                Some(session_id) => {
                    let in_round = self
                        .registry
                        .get(&session_id)
                        .is_some_and(|r| r.state().is_in_round());
                    if in_round || self.in_wait_area(&player, &session_id) {
                        continue;
                    }
                    self.host.send_message(
                        &player,
                        "§cYou left the wait area and were removed from the session.",
                    );
                    self.leave(&player, true);
                }
                None => {
                    let target = self
                        .config
                        .sessions
                        .keys()
                        .find(|sid| {
                            let open = self
                                .registry
                                .get(sid)
                                .map_or(true, |r| r.state().is_pre_round());
                            open && self.in_wait_area(&player, sid)
                        })
                        .cloned();
                    if let Some(session_id) = target {
                        self.join(&player, &session_id);
                    }
                }
            }
        }

        self.prune_offline();
        self.check_all_returned();
    }

    /// Drop registered players who are no longer online.
    fn prune_offline(&mut self) {
        for session_id in self.registry.session_ids() {
            let Some(runtime) = self.registry.get(&session_id) else {
                continue;
            };
            let offline: Vec<String> = runtime
                .players()
                .iter()
                .filter(|p| !self.host.is_online(p))
                .cloned()
                .collect();
            if offline.is_empty() {
                continue;
            }
            let state = runtime.state();

            for player in &offline {
                let _ = self.registry.leave(player);
            }
            info!(session_id = %session_id, players = ?offline, "Pruned offline players");

            if state == SessionState::Running {
                self.check_winner(&session_id);
            } else {
                self.refresh_displays(&session_id);
            }
        }
    }

    /// Play the ready cue once when every registered player of a pre-round
    /// session is inside its wait area. It re-arms when the roster empties
    /// or someone is found outside.
    fn check_all_returned(&mut self) {
        for session_id in self.registry.session_ids() {
            let Some(runtime) = self.registry.get(&session_id) else {
                continue;
            };
            if !runtime.state().is_pre_round() {
                continue;
            }
            if runtime.players().is_empty() {
                if let Some(runtime) = self.registry.get_mut(&session_id) {
                    runtime.return_cue_played = false;
                }
                continue;
            }
            let players = runtime.players().to_vec();
            let all_in = players
                .iter()
                .all(|p| self.in_wait_area(p, &session_id));

            let Some(runtime) = self.registry.get_mut(&session_id) else {
                continue;
            };
            if !all_in {
                runtime.return_cue_played = false;
                continue;
            }
            if runtime.return_cue_played {
                continue;
            }
            runtime.return_cue_played = true;

            let Some(sounds) = self.session_config(&session_id).map(|s| s.sounds.clone()) else {
                continue;
            };
            for player in &players {
                self.host.send_message(
                    player,
                    "§aEveryone is back in the wait area. Ready for the next round!",
                );
                if !sounds.enabled {
                    continue;
                }
                if let Some(at) = self.host.location(player) {
                    self.host.play_sound(
                        player,
                        at,
                        &sounds.victory_sound,
                        sounds.victory_volume,
                        sounds.victory_pitch,
                    );
                }
            }
        }
    }
}
