//! Session lifecycle state machine.
//!
//! # State Diagram
//!
//! ```text
//!            membership changes (pure function of player count)
//!        ┌──────────────────────────────────────────────┐
//!        ▼                                              │
//! ┌──────────┐  join   ┌───────────┐  count ≥ min  ┌─────────┐
//! │   Idle   │────────▶│  Waiting  │──────────────▶│  Ready  │
//! └──────────┘◀────────└───────────┘◀──────────────└─────────┘
//!      ▲        empty        │        count < min       │
//!      │                     │ admin start              │ admin start
//!      │                     ▼                          ▼
//!      │               ┌──────────────────────────────────┐
//!      │               │            Countdown             │
//!      │               └────────────────┬─────────────────┘
//!      │                                │ countdown reaches zero
//!      │                                ▼
//!      │               ┌──────────────────────────────────┐
//!      │               │             Running              │
//!      │               └────────────────┬─────────────────┘
//!      │ reset                          │ ≤1 alive / stop / delete
//!      │               ┌────────────────▼─────────────────┐
//!      └───────────────│        Ended (transient)         │
//!                      └──────────────────────────────────┘
//! ```

use std::fmt;

/// Lifecycle state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No players, no activity
    #[default]
    Idle,
    /// Some players, fewer than the minimum
    Waiting,
    /// Enough players; an admin may start the round
    Ready,
    /// Players teleported and frozen, countdown ticking
    Countdown,
    /// Round in progress
    Running,
    /// Round finished, reported, about to reset
    Ended,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::Ready => "ready",
            Self::Countdown => "countdown",
            Self::Running => "running",
            Self::Ended => "ended",
        }
    }

    /// Human label for session listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "§7Idle",
            Self::Waiting => "§aWaiting",
            Self::Ready => "§bReady",
            Self::Countdown => "§eCountdown",
            Self::Running => "§cRunning",
            Self::Ended => "§8Ended",
        }
    }

    /// Before a round: players may be auto-joined or auto-withdrawn.
    pub fn is_pre_round(&self) -> bool {
        matches!(self, Self::Idle | Self::Waiting | Self::Ready)
    }

    /// Countdown or running: membership is frozen to the round.
    pub fn is_in_round(&self) -> bool {
        matches!(self, Self::Countdown | Self::Running)
    }

    /// State implied by the number of players present before a round.
    pub fn for_membership(players: usize, min_players: usize) -> Self {
        if players == 0 {
            Self::Idle
        } else if players < min_players {
            Self::Waiting
        } else {
            Self::Ready
        }
    }

    /// Apply an event, returning the new state or an error.
    pub fn apply(self, event: &SessionEvent) -> Result<Self, InvalidTransition> {
        use SessionEvent::*;
        use SessionState::*;

        let invalid = |reason: &'static str| InvalidTransition {
            from: self,
            event: event.clone(),
            reason,
        };

        match (self, event) {
            (
                Idle | Waiting | Ready,
                MembershipChanged {
                    players,
                    min_players,
                },
            ) => Ok(Self::for_membership(*players, *min_players)),
            (Countdown | Running, MembershipChanged { .. }) => {
                Err(invalid("Membership is frozen during a round"))
            }
            (Ended, MembershipChanged { .. }) => Err(invalid("Round is being reset")),

            (Waiting | Ready, StartCountdown) => Ok(Countdown),
            (Idle, StartCountdown) => Err(invalid("No players present")),
            (Countdown | Running, StartCountdown) => Err(invalid("Round already in progress")),
            (Ended, StartCountdown) => Err(invalid("Round is being reset")),

            (Countdown, CountdownFinished) => Ok(Running),
            (_, CountdownFinished) => Err(invalid("No countdown running")),

            (Idle, Finish) => Err(invalid("Nothing to finish")),
            (Ended, Finish) => Err(invalid("Already ended")),
            (_, Finish) => Ok(Ended),

            (Ended, Reset) => Ok(Idle),
            (_, Reset) => Err(invalid("Only an ended round can be reset")),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State transition events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    MembershipChanged { players: usize, min_players: usize },
    StartCountdown,
    CountdownFinished,
    Finish,
    Reset,
}

/// Error when a state transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: SessionState,
    pub event: SessionEvent,
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid transition from {} via {:?}: {}",
            self.from, self.event, self.reason
        )
    }
}

impl std::error::Error for InvalidTransition {}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(players: usize) -> SessionEvent {
        SessionEvent::MembershipChanged {
            players,
            min_players: 2,
        }
    }

    #[test]
    fn test_membership_recompute() {
        let state = SessionState::Idle;
        let state = state.apply(&members(1)).unwrap();
        assert_eq!(state, SessionState::Waiting);

        let state = state.apply(&members(2)).unwrap();
        assert_eq!(state, SessionState::Ready);

        // Over capacity is still ready; eviction happens at round start.
        let state = state.apply(&members(12)).unwrap();
        assert_eq!(state, SessionState::Ready);

        let state = state.apply(&members(0)).unwrap();
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn test_round_flow() {
        let state = SessionState::Ready;
        let state = state.apply(&SessionEvent::StartCountdown).unwrap();
        assert_eq!(state, SessionState::Countdown);
        assert!(state.is_in_round());

        let state = state.apply(&SessionEvent::CountdownFinished).unwrap();
        assert_eq!(state, SessionState::Running);

        let state = state.apply(&SessionEvent::Finish).unwrap();
        assert_eq!(state, SessionState::Ended);

        let state = state.apply(&SessionEvent::Reset).unwrap();
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn test_membership_frozen_during_round() {
        for state in [SessionState::Countdown, SessionState::Running] {
            let err = state.apply(&members(1)).unwrap_err();
            assert_eq!(err.from, state);
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(SessionState::Idle
            .apply(&SessionEvent::StartCountdown)
            .is_err());
        assert!(SessionState::Running
            .apply(&SessionEvent::StartCountdown)
            .is_err());
        assert!(SessionState::Ready
            .apply(&SessionEvent::CountdownFinished)
            .is_err());
        assert!(SessionState::Idle.apply(&SessionEvent::Finish).is_err());
        assert!(SessionState::Running.apply(&SessionEvent::Reset).is_err());
    }

    #[test]
    fn test_display() {
        let err = SessionState::Running
            .apply(&SessionEvent::StartCountdown)
            .unwrap_err();
        assert_eq!(
            format!("{}", err),
            "Invalid transition from running via StartCountdown: Round already in progress"
        );
    }
}
