/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and overlay feedback.

use crate::domain::entity::CrateId;
use crate::domain::geometry::GridPos;
use crate::domain::rules::Rejection;

/// Start-screen visuals the controller can show or hide.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Overlay {
    /// Fixed title image.
    Title,
    /// "Press any key" prompt, blinks until the game starts.
    Prompt,
    /// Full-screen backdrop behind the title.
    Background,
}

impl Overlay {
    pub const START_SCREEN: [Overlay; 3] = [Overlay::Title, Overlay::Prompt, Overlay::Background];
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    GameStarted,
    PlayerMoved { from: GridPos, to: GridPos },
    MoveRejected { target: GridPos, reason: Rejection },
    CratePushed { id: CrateId, to: GridPos },
    CrateDelivered { id: CrateId, goal: GridPos },
    CrateRemoved { id: CrateId },
    LevelCompleted,
    OverlayVisibility { overlay: Overlay, visible: bool },
    RestartRequested,
}
