//! Property tests for the edge wait.

use std::time::Duration;

use ii64_wire::{CLOCK, Edge, ManualClock, ScriptedLink, WireEngine};
use proptest::prelude::*;

/// Events that can never complete a rising-clock wait: data line changes,
/// NMI asserts and polls.
fn non_clock_event() -> impl Strategy<Value = u8> {
    prop::sample::select(vec![b'Z', b'[', b'\\', b']', b'_', b'a', b'b', b'c'])
}

proptest! {
    #[test]
    fn wait_only_returns_on_clock_edge(events in prop::collection::vec(non_clock_event(), 0..64)) {
        let mut script = events.clone();
        script.push(b'Y');
        let mut wire = WireEngine::new(
            ScriptedLink::new(script),
            ManualClock::new(),
            Duration::from_secs(1),
        );

        prop_assert!(wire.wait_edge(CLOCK, Edge::Rising).is_ok());
        prop_assert_eq!(wire.link().remaining(), 0);

        // Side effects of the skipped events were applied on the way
        prop_assert_eq!(wire.lines().nmi_latched(), events.contains(&b'_'));
        let polls = events.iter().filter(|e| (b'a'..=b'c').contains(*e)).count();
        prop_assert_eq!(wire.link().status().len(), polls);

        let mut expected = 0u8;
        for e in &events {
            match e {
                b'Z' => expected &= !0b010,
                b'[' => expected |= 0b010,
                b'\\' => expected &= !0b001,
                b']' => expected |= 0b001,
                _ => {}
            }
        }
        prop_assert_eq!(wire.lines().input(), expected | CLOCK);
    }

    #[test]
    fn reset_inside_window_never_interrupts(gap_ms in 0u64..=1000) {
        let clock = ManualClock::new();
        let mut link = ScriptedLink::new([b'@']).with_clock(clock.clone());
        link.push_after(Duration::from_millis(gap_ms), b'@');
        link.push_after(Duration::ZERO, b'Y');
        let mut wire = WireEngine::new(link, clock, Duration::from_secs(1));

        prop_assert!(wire.wait_edge(CLOCK, Edge::Rising).is_err());
        prop_assert!(wire.wait_edge(CLOCK, Edge::Rising).is_ok());
    }
}
