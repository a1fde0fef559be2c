//! Control events accepted by the reframer

use serde::{Deserialize, Serialize};

/// Playback control event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ControlEvent {
    /// Start (or restart) playback at `start` seconds.
    Play { start: f64 },

    /// Suppress all emission until the next `Play`.
    Stop,

    /// Playback rate change. Framing ignores it; pacing is downstream.
    SetSpeed(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_parse_from_yaml_script() {
        let script = "- !Play\n  start: 2.5\n- Stop\n- !SetSpeed 2.0\n";
        let events: Vec<ControlEvent> = serde_yaml_ng::from_str(script).unwrap();
        assert_eq!(
            events,
            vec![ControlEvent::Play { start: 2.5 }, ControlEvent::Stop, ControlEvent::SetSpeed(2.0)]
        );
    }
}
