/// Feedback sink: the narrow interface the game loop hands sound, overlay
/// and restart requests to.
///
/// The step function never calls the sink itself. It returns `GameEvent`s
/// and `dispatch` translates them, so simulation stays free of I/O.

use super::event::{GameEvent, Overlay};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SoundCue {
    Start,
    Goal,
    LevelComplete,
}

pub trait FeedbackSink {
    fn play_sound(&mut self, cue: SoundCue);
    fn set_overlay_visible(&mut self, overlay: Overlay, visible: bool);
    fn restart_level(&mut self);
}

/// Forward one step's events to the sink, in order.
pub fn dispatch<S: FeedbackSink + ?Sized>(events: &[GameEvent], sink: &mut S) {
    for event in events {
        match event {
            GameEvent::GameStarted => {
                sink.play_sound(SoundCue::Start);
                for overlay in Overlay::START_SCREEN {
                    sink.set_overlay_visible(overlay, false);
                }
            }
            GameEvent::CrateDelivered { .. } => sink.play_sound(SoundCue::Goal),
            GameEvent::LevelCompleted => sink.play_sound(SoundCue::LevelComplete),
            GameEvent::OverlayVisibility { overlay, visible } => {
                sink.set_overlay_visible(*overlay, *visible);
            }
            GameEvent::RestartRequested => sink.restart_level(),
            _ => {}
        }
    }
}
