//! The lifecycle state machine.
//!
//! Only the transitions listed in [`transition`] are legal. An illegal
//! combination returns [`EngineError::InvalidState`]; it never panics.

use crate::error::EngineError;
use sk_protocol::runtime_models::LifecycleState;

/// Events that drive the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Summon,
    Percept,
    Decide,
    Act,
    Learn,
    Consolidate,
    Sleep,
    Wake,
}

/// Apply one event to a state, returning the next state.
///
/// Transition table:
///
/// ```text
/// dormant      --summon-->      awakening
/// awakening    --percept-->     perceiving
/// perceiving   --decide-->      deciding
/// deciding     --act-->         acting
/// acting       --learn-->       learning
/// learning     --percept-->     perceiving
/// learning     --consolidate--> consolidating
/// perceiving   --sleep-->       consolidating   (early exit)
/// deciding     --sleep-->       consolidating   (early exit)
/// consolidating --sleep-->      sleeping
/// sleeping     --wake-->        dormant
/// ```
pub fn transition(
    state: LifecycleState,
    event: LifecycleEvent,
) -> Result<LifecycleState, EngineError> {
    use LifecycleEvent as E;
    use LifecycleState as S;

    let next = match (state, event) {
        (S::Dormant, E::Summon) => S::Awakening,
        (S::Awakening, E::Percept) => S::Perceiving,
        (S::Perceiving, E::Decide) => S::Deciding,
        (S::Deciding, E::Act) => S::Acting,
        (S::Acting, E::Learn) => S::Learning,
        (S::Learning, E::Percept) => S::Perceiving,
        (S::Learning, E::Consolidate) => S::Consolidating,
        (S::Perceiving, E::Sleep) | (S::Deciding, E::Sleep) => S::Consolidating,
        (S::Consolidating, E::Sleep) => S::Sleeping,
        (S::Sleeping, E::Wake) => S::Dormant,
        _ => {
            return Err(EngineError::InvalidState {
                op: event_name(event),
                state,
            })
        }
    };
    Ok(next)
}

fn event_name(event: LifecycleEvent) -> &'static str {
    match event {
        LifecycleEvent::Summon => "summon",
        LifecycleEvent::Percept => "percept",
        LifecycleEvent::Decide => "decide",
        LifecycleEvent::Act => "act",
        LifecycleEvent::Learn => "learn",
        LifecycleEvent::Consolidate => "consolidate",
        LifecycleEvent::Sleep => "sleep",
        LifecycleEvent::Wake => "wake",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleEvent as E;
    use LifecycleState as S;

    #[test]
    fn test_full_cycle() {
        let mut state = S::Dormant;
        for event in [E::Summon, E::Percept, E::Decide, E::Act, E::Learn] {
            state = transition(state, event).unwrap();
        }
        assert_eq!(state, S::Learning);

        // Either loop back to perceiving...
        assert_eq!(transition(state, E::Percept).unwrap(), S::Perceiving);

        // ...or consolidate and sleep out.
        let mut state = transition(state, E::Consolidate).unwrap();
        assert_eq!(state, S::Consolidating);
        state = transition(state, E::Sleep).unwrap();
        assert_eq!(state, S::Sleeping);
        state = transition(state, E::Wake).unwrap();
        assert_eq!(state, S::Dormant);
    }

    #[test]
    fn test_early_exit_paths() {
        assert_eq!(transition(S::Perceiving, E::Sleep).unwrap(), S::Consolidating);
        assert_eq!(transition(S::Deciding, E::Sleep).unwrap(), S::Consolidating);
    }

    #[test]
    fn test_illegal_transitions_error() {
        let err = transition(S::Dormant, E::Percept).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidState {
                state: S::Dormant,
                ..
            }
        ));

        // Double summon is illegal once awake.
        assert!(transition(S::Awakening, E::Summon).is_err());
        assert!(transition(S::Perceiving, E::Summon).is_err());

        // Acting cannot sleep directly.
        assert!(transition(S::Acting, E::Sleep).is_err());
    }
}
