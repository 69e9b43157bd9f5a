//! Bossbar and sidebar content.
//!
//! Pure functions of runtime + configuration. The "next event" line is
//! derived from elapsed time alone so it never disagrees with the event
//! timer, whichever of the two callbacks ran last.

use super::config::SessionConfig;
use super::host::{BarColor, BossBarView, ScoreboardView};
use super::machine::SessionState;
use super::session::{SessionRuntime, COUNTDOWN_SECONDS};
use super::weighted::{seconds_until_event, upcoming_event};

/// Sidebar title.
pub const SCOREBOARD_TITLE: &str = "§e§lLucky Pillar";

/// `mm:ss`
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Sidebar objective owned by a session.
pub fn objective_name(session_id: &str) -> String {
    format!("lucky_pillar_{}", session_id)
}

/// Progress bar content. `present` counts online registered players.
pub fn boss_bar_view(runtime: &SessionRuntime, config: &SessionConfig, present: usize) -> BossBarView {
    let min = config.min_players;
    let max = config.max_players();

    match runtime.state() {
        SessionState::Running => BossBarView {
            title: format!(
                "§cRound in progress §f| §eTime: {} §f| §eAlive: {}/{}",
                format_clock(runtime.elapsed),
                runtime.alive_count(),
                max
            ),
            color: BarColor::Red,
            progress: 1.0,
        },
        SessionState::Countdown => {
            let progress = 1.0 - runtime.countdown as f32 / COUNTDOWN_SECONDS as f32;
            BossBarView {
                title: format!(
                    "§eStarting soon §f| §eCountdown: §c{} §es",
                    runtime.countdown
                ),
                color: BarColor::Yellow,
                progress: progress.clamp(0.0, 1.0),
            }
        }
        _ if present < min => BossBarView {
            title: format!(
                "§eWaiting for players: §f{}/{} §7(need {} more) §f| §eMax: {}",
                present,
                min,
                min - present,
                max
            ),
            color: BarColor::Yellow,
            progress: (present as f32 / min as f32).min(1.0),
        },
        _ if present == min => BossBarView {
            title: format!(
                "§aReady to start §f{}/{} §f| §eMin: {} Max: {}",
                present, min, min, max
            ),
            color: BarColor::Green,
            progress: 1.0,
        },
        _ => BossBarView {
            title: format!(
                "§aReady to start §f{}/{} §f| §eMin: {} Max: {}",
                present, max, min, max
            ),
            color: BarColor::White,
            progress: if max == 0 {
                1.0
            } else {
                (present as f32 / max as f32).min(1.0)
            },
        },
    }
}

/// Sidebar content, or `None` when the session has nothing to show.
pub fn scoreboard_view(
    runtime: &SessionRuntime,
    config: &SessionConfig,
    present: usize,
) -> Option<ScoreboardView> {
    let min = config.min_players;
    let max = config.max_players();

    let lines: Vec<(String, i32)> = match runtime.state() {
        SessionState::Running => {
            let period = config.tasks.event_period_secs();
            let next_event = upcoming_event(runtime.elapsed, period);
            vec![
                ("§a§lRound Info".to_string(), 10),
                (format!("§eTime: §f{}", format_clock(runtime.elapsed)), 9),
                (format!("§eAlive: §f{}/{}", runtime.alive_count(), max), 8),
                (format!("§eRadius: §f{}", runtime.border_radius), 7),
                ("§r".to_string(), 6),
                ("§c§lNext Event".to_string(), 5),
                (format!("§f{}", next_event.display_name()), 4),
                (
                    format!(
                        "§eTriggers in: §f{}",
                        format_clock(seconds_until_event(runtime.elapsed, period))
                    ),
                    3,
                ),
                ("§r ".to_string(), 2),
                ("§c§lBorder Shrink".to_string(), 1),
                (
                    format!(
                        "§eShrinks in: §f{}",
                        format_clock(runtime.seconds_until_shrink(&config.border))
                    ),
                    0,
                ),
                (
                    format!("§eShrinks to: §f{}", runtime.next_radius(&config.border)),
                    -1,
                ),
            ]
        }
        SessionState::Countdown => vec![
            ("§a§lStarting Soon".to_string(), 10),
            (format!("§eCountdown: §c{}s", runtime.countdown), 9),
            ("§r".to_string(), 8),
            (format!("§ePlayers: §f{}/{}", present, max), 7),
            (format!("§eMinimum: §f{}", min), 6),
            (format!("§eCapacity: §f{}", max), 4),
        ],
        SessionState::Waiting | SessionState::Ready => {
            let status = if present >= min {
                "§aReady to start!".to_string()
            } else {
                format!("§cNeed {} more", min - present)
            };
            vec![
                ("§a§lWaiting for Players".to_string(), 10),
                (format!("§ePlayers: §f{}/{}", present, max), 9),
                (format!("§eMinimum: §f{}", min), 8),
                (format!("§eCapacity: §f{}", max), 7),
                ("§r".to_string(), 6),
                (status, 5),
            ]
        }
        SessionState::Idle | SessionState::Ended => return None,
    };

    Some(ScoreboardView {
        objective: objective_name(&runtime.id),
        title: SCOREBOARD_TITLE.to_string(),
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::config::PluginConfig;
    use super::super::machine::SessionEvent;
    use super::super::weighted::event_for_cycle;
    use pretty_assertions::assert_eq;

    fn setup() -> (SessionRuntime, SessionConfig) {
        let config = PluginConfig::default().sessions["1"].clone();
        let runtime = SessionRuntime::new("1", &config);
        (runtime, config)
    }

    fn running(runtime: &mut SessionRuntime) {
        runtime.refresh_membership_state(2, 2);
        runtime.apply(SessionEvent::StartCountdown).unwrap();
        runtime.apply(SessionEvent::CountdownFinished).unwrap();
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(3600), "60:00");
    }

    #[test]
    fn test_waiting_bar() {
        let (mut runtime, config) = setup();
        runtime.refresh_membership_state(1, 2);
        let view = boss_bar_view(&runtime, &config, 1);
        assert_eq!(view.color, BarColor::Yellow);
        assert_eq!(view.progress, 0.5);
        assert!(view.title.contains("need 1 more"));
    }

    #[test]
    fn test_ready_bars() {
        let (mut runtime, config) = setup();
        runtime.refresh_membership_state(2, 2);
        assert_eq!(boss_bar_view(&runtime, &config, 2).color, BarColor::Green);

        runtime.refresh_membership_state(3, 2);
        let view = boss_bar_view(&runtime, &config, 3);
        assert_eq!(view.color, BarColor::White);
        assert!((view.progress - 3.0 / 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_countdown_bar_progress() {
        let (mut runtime, config) = setup();
        runtime.refresh_membership_state(2, 2);
        runtime.apply(SessionEvent::StartCountdown).unwrap();
        runtime.countdown = 10;
        assert_eq!(boss_bar_view(&runtime, &config, 2).progress, 0.0);
        runtime.countdown = 0;
        assert_eq!(boss_bar_view(&runtime, &config, 2).progress, 1.0);
    }

    #[test]
    fn test_running_scoreboard() {
        let (mut runtime, config) = setup();
        running(&mut runtime);
        runtime.begin_round(&config.border);
        runtime.elapsed = 75;

        let view = scoreboard_view(&runtime, &config, 2).unwrap();
        assert_eq!(view.objective, "lucky_pillar_1");
        let labels: Vec<&str> = view.lines.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels[1], "§eTime: §f01:15");
        assert_eq!(labels[3], "§eRadius: §f20");
        assert_eq!(
            labels[6],
            format!("§f{}", upcoming_event(75, 60).display_name())
        );
        assert_eq!(labels[7], "§eTriggers in: §f00:45");
        assert_eq!(labels[10], "§eShrinks in: §f03:45");
        assert_eq!(labels[11], "§eShrinks to: §f16");
    }

    #[test]
    fn test_event_lines_agree_at_boundary() {
        let (mut runtime, config) = setup();
        running(&mut runtime);
        runtime.begin_round(&config.border);

        for (elapsed, name_cycle, countdown) in [(0, 1, "01:00"), (60, 1, "00:00"), (61, 2, "00:59")] {
            runtime.elapsed = elapsed;
            let view = scoreboard_view(&runtime, &config, 2).unwrap();
            let labels: Vec<&str> = view.lines.iter().map(|(l, _)| l.as_str()).collect();
            assert_eq!(
                labels[6],
                format!("§f{}", event_for_cycle(name_cycle).display_name())
            );
            assert_eq!(labels[7], format!("§eTriggers in: §f{}", countdown));
        }
    }

    #[test]
    fn test_idle_has_no_scoreboard() {
        let (runtime, config) = setup();
        assert_eq!(scoreboard_view(&runtime, &config, 0), None);
    }

    #[test]
    fn test_waiting_scoreboard_status_line() {
        let (mut runtime, config) = setup();
        runtime.refresh_membership_state(1, 2);
        let view = scoreboard_view(&runtime, &config, 1).unwrap();
        assert_eq!(view.lines.last().unwrap().0, "§cNeed 1 more");
    }
}
