//! Property-based tests over generated state tables.

use proptest::prelude::*;
use statetab_core::{
    Capabilities, DispatchOutcome, Dispatcher, FsmDescription, StateDescription, Table,
    TransitionDescription, VerifyIssue,
};

const EVENTS: [&str; 4] = ["E0", "E1", "E2", "E3"];

fn caps() -> Capabilities {
    Capabilities::new()
        .with("yes", || true)
        .with("no", || false)
        .with("ok", || true)
        .with("fail", || false)
}

prop_compose! {
    fn arbitrary_transition(states: usize)(
        event in 0..EVENTS.len(),
        target in prop::option::of(0..states),
        guard in prop::option::of(prop::bool::ANY),
        action in prop::option::of(prop::bool::ANY),
    ) -> TransitionDescription {
        let target = target.map_or_else(|| "STATE_SAME".to_string(), |i| format!("S{i}"));
        let mut t = TransitionDescription::new(EVENTS[event], target);
        if let Some(pass) = guard {
            t = t.guards([if pass { "yes" } else { "no" }]);
        }
        if let Some(pass) = action {
            t = t.actions([if pass { "ok" } else { "fail" }]);
        }
        t
    }
}

prop_compose! {
    fn arbitrary_state(states: usize, index: usize)(
        transitions in prop::collection::vec(arbitrary_transition(states), 0..5),
        catch in prop::option::of(0..states),
    ) -> StateDescription {
        let mut state = StateDescription::new(format!("S{index}")).entry(["ok"]).exit(["ok"]);
        for t in transitions {
            state = state.on(t);
        }
        if let Some(target) = catch {
            state = state.on(
                TransitionDescription::new("EVENT_CATCH", format!("S{target}")).actions(["fail", "ok"]),
            );
        }
        state
    }
}

fn arbitrary_description() -> impl Strategy<Value = FsmDescription> {
    (1..6usize)
        .prop_flat_map(|n| {
            let states: Vec<_> = (0..n).map(|i| arbitrary_state(n, i)).collect();
            let any = prop::option::of(prop::collection::vec(arbitrary_transition(n), 1..3));
            (Just(n), 0..n, states, any)
        })
        .prop_map(|(_, initial, states, any)| {
            let mut desc = FsmDescription::new(format!("S{initial}"));
            if let Some(transitions) = any {
                let mut wildcard = StateDescription::new("STATE_ANY");
                for t in transitions {
                    wildcard = wildcard.on(t);
                }
                desc = desc.state(wildcard);
            }
            for state in states {
                desc = desc.state(state);
            }
            desc
        })
}

fn arbitrary_events() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            (0..EVENTS.len()).prop_map(|i| EVENTS[i].to_string()),
            Just("UNKNOWN".to_string()),
            Just("EVENT_CATCH".to_string()),
        ],
        0..20,
    )
}

proptest! {
    #[test]
    fn generated_tables_build(desc in arbitrary_description()) {
        prop_assert!(Table::build(desc, &caps()).is_ok());
    }

    #[test]
    fn starts_in_initial_state(desc in arbitrary_description()) {
        let initial = desc.initial_state.clone();
        let mut fsm = Dispatcher::new(desc, &caps()).unwrap();
        prop_assert_eq!(fsm.current_state().as_str(), initial.as_str());
        prop_assert!(fsm.previous_state().is_none());
        fsm.start();
        prop_assert_eq!(fsm.current_state().as_str(), initial.as_str());
    }

    #[test]
    fn current_state_always_declared(desc in arbitrary_description(), events in arbitrary_events()) {
        let mut fsm = Dispatcher::new(desc, &caps()).unwrap();
        fsm.start();
        for event in &events {
            fsm.on_event(event);
            prop_assert!(fsm.table().has_state(fsm.current_state().as_str()));
        }
    }

    #[test]
    fn unhandled_event_keeps_state(desc in arbitrary_description(), events in arbitrary_events()) {
        let mut fsm = Dispatcher::new(desc, &caps()).unwrap();
        fsm.start();
        for event in &events {
            let before = fsm.current_state().clone();
            let previous = fsm.previous_state().cloned();
            if !fsm.on_event(event) {
                prop_assert_eq!(fsm.current_state(), &before);
                prop_assert_eq!(fsm.previous_state().cloned(), previous);
            }
        }
    }

    #[test]
    fn outcome_matches_state_change(desc in arbitrary_description(), events in arbitrary_events()) {
        let mut fsm = Dispatcher::new(desc, &caps()).unwrap();
        fsm.start();
        for event in &events {
            let before = fsm.current_state().clone();
            match fsm.dispatch(event) {
                DispatchOutcome::Transitioned { from, to } | DispatchOutcome::Caught { from, to } => {
                    prop_assert_eq!(&from, &before);
                    prop_assert_eq!(&to, fsm.current_state());
                }
                _ => prop_assert_eq!(fsm.current_state(), &before),
            }
        }
    }

    #[test]
    fn instances_are_deterministic(desc in arbitrary_description(), events in arbitrary_events()) {
        let mut a = Dispatcher::new(desc.clone(), &caps()).unwrap();
        let mut b = Dispatcher::new(desc, &caps()).unwrap();
        a.start();
        b.start();
        for event in &events {
            prop_assert_eq!(a.dispatch(event), b.dispatch(event));
        }
        prop_assert_eq!(a.table().checksum(), b.table().checksum());
    }

    #[test]
    fn initial_state_never_flagged_unentered(desc in arbitrary_description()) {
        let table = Table::build(desc, &caps()).unwrap();
        let initial = table.initial().clone();
        prop_assert!(!table
            .verify()
            .iter()
            .any(|w| w.state == initial && w.issue == VerifyIssue::NeverEntered));
    }
}
