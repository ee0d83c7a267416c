/// Move and push rules, truth-table driven.
///
/// Pure functions over an `Occupancy` view and the `BlockedSet`.
/// These decide "what happens" without performing the action; the step
/// function applies the returned `MoveOutcome`.
///
/// ### Player move (target = here + dir)
/// ┌──────────────────────────────┬─────────────────────┐
/// │ Condition (priority order)    │ Outcome             │
/// ├──────────────────────────────┼─────────────────────┤
/// │ target in BlockedSet          │ Rejected(Reserved)  │
/// │ crate at target               │ see push table      │
/// │ obstacle at target            │ Rejected(Obstacle)  │
/// │ otherwise                     │ Walk                │
/// └──────────────────────────────┴─────────────────────┘
///
/// ### Push (beyond = target + dir)
/// ┌──────────────────────────────┬────────────────────────┐
/// │ crate already leaving         │ Rejected(CrateLocked)  │
/// │ unfiltered probe hits a goal  │ Deliver                │
/// │ obstacle or crate at beyond   │ Rejected(CrateBlocked) │
/// │ otherwise                     │ Push                   │
/// └──────────────────────────────┴────────────────────────┘
///
/// The goal probe runs before the collision probe. In every accepted case
/// the player advances exactly one cell, into the crate's old cell.

use super::blocked::BlockedSet;
use super::entity::{CrateId, GoalId};
use super::geometry::{Direction, GridPos};
use super::occupancy::{EntityRef, LayerMask, Occupancy};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Rejection {
    /// Target cell is reserved by an in-flight delivery.
    Reserved,
    Obstacle,
    /// The crate has nowhere to go.
    CrateBlocked,
    /// The crate is already sliding into a goal.
    CrateLocked,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveOutcome {
    Rejected { target: GridPos, reason: Rejection },
    Walk { to: GridPos },
    Push { crate_id: CrateId, crate_to: GridPos, to: GridPos },
    Deliver { crate_id: CrateId, goal_id: GoalId, crate_from: GridPos, goal: GridPos, to: GridPos },
}

/// Resolve a player move from `here` one step in `dir`.
pub fn resolve_move<O: Occupancy>(
    occupancy: &O,
    blocked: &BlockedSet,
    here: GridPos,
    dir: Direction,
) -> MoveOutcome {
    let target = here.step(dir);

    if blocked.contains(target) {
        return MoveOutcome::Rejected { target, reason: Rejection::Reserved };
    }

    if let Some(EntityRef::Crate(crate_id)) = occupancy.query_at(target, LayerMask::CRATE) {
        return resolve_push(occupancy, crate_id, target, dir);
    }

    if occupancy.query_at(target, LayerMask::OBSTACLE).is_some() {
        return MoveOutcome::Rejected { target, reason: Rejection::Obstacle };
    }

    MoveOutcome::Walk { to: target }
}

/// Resolve pushing the crate at `crate_at` one step in `dir`.
pub fn resolve_push<O: Occupancy>(
    occupancy: &O,
    crate_id: CrateId,
    crate_at: GridPos,
    dir: Direction,
) -> MoveOutcome {
    if occupancy.crate_locked(crate_id) {
        return MoveOutcome::Rejected { target: crate_at, reason: Rejection::CrateLocked };
    }

    let beyond = crate_at.step(dir);

    if let Some(EntityRef::Goal(goal_id)) = occupancy.query_at(beyond, LayerMask::ANY) {
        return MoveOutcome::Deliver {
            crate_id,
            goal_id,
            crate_from: crate_at,
            goal: beyond,
            to: crate_at,
        };
    }

    if occupancy.query_at(beyond, LayerMask::OBSTACLE | LayerMask::CRATE).is_some() {
        return MoveOutcome::Rejected { target: crate_at, reason: Rejection::CrateBlocked };
    }

    MoveOutcome::Push { crate_id, crate_to: beyond, to: crate_at }
}
