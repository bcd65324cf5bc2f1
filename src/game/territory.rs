//! Territory ledger and scoring
//!
//! The ledger is the single owner of cell ownership. Every change goes through
//! [`TerritoryLedger::assign`], which applies the score decrement for the old
//! owner, the increment for the new owner and the world write together, so
//! `score(team)` always equals the number of cells the team owns.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::host::CellWorld;

use super::math::CellPos;
use super::team::TeamId;

/// Ownership of a single world cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellOwner {
    #[default]
    Empty,
    Team(TeamId),
}

impl CellOwner {
    pub fn team(self) -> Option<TeamId> {
        match self {
            CellOwner::Empty => None,
            CellOwner::Team(team) => Some(team),
        }
    }
}

/// Authoritative cell → team map with incrementally maintained scores
#[derive(Debug, Default)]
pub struct TerritoryLedger {
    /// Only owned cells are stored; absence means Empty
    cells: HashMap<CellPos, TeamId>,
    scores: BTreeMap<TeamId, u32>,
    /// Cells still to reset by an in-progress clear
    pending_clear: Vec<CellPos>,
    clearing: bool,
}

impl TerritoryLedger {
    pub fn new(teams: impl IntoIterator<Item = TeamId>) -> Self {
        Self {
            scores: teams.into_iter().map(|id| (id, 0)).collect(),
            ..Self::default()
        }
    }

    pub fn owner(&self, cell: CellPos) -> CellOwner {
        self.cells
            .get(&cell)
            .copied()
            .map(CellOwner::Team)
            .unwrap_or(CellOwner::Empty)
    }

    pub fn score(&self, team: TeamId) -> u32 {
        self.scores.get(&team).copied().unwrap_or(0)
    }

    /// Scores of every known team, lowest id first
    pub fn scores(&self) -> &BTreeMap<TeamId, u32> {
        &self.scores
    }

    /// Full recount; only used to check the incremental scores
    pub fn count_owned(&self, team: TeamId) -> u32 {
        self.cells.values().filter(|owner| **owner == team).count() as u32
    }

    pub fn owned_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_clearing(&self) -> bool {
        self.clearing
    }

    /// Set one cell's owner, updating scores and the world in one step.
    /// Returns false if the cell already had that owner.
    pub fn assign<W: CellWorld + ?Sized>(
        &mut self,
        world: &mut W,
        cell: CellPos,
        owner: CellOwner,
    ) -> bool {
        let previous = self.owner(cell);
        if previous == owner {
            return false;
        }

        if let Some(old) = previous.team() {
            if let Some(score) = self.scores.get_mut(&old) {
                *score = score.saturating_sub(1);
            }
        }
        match owner {
            CellOwner::Team(team) => {
                *self.scores.entry(team).or_insert(0) += 1;
                self.cells.insert(cell, team);
            }
            CellOwner::Empty => {
                self.cells.remove(&cell);
            }
        }
        world.set_cell(cell, owner);
        true
    }

    /// Claim up to `max_cells` cells around `center` for `team`.
    ///
    /// Offsets are visited in pattern order. Cells that are not paintable or
    /// already belong to `team` are skipped and do not count toward the cap.
    /// Returns the number of cells that changed owner.
    pub fn paint<W: CellWorld + ?Sized>(
        &mut self,
        world: &mut W,
        center: CellPos,
        team: TeamId,
        max_cells: u32,
        pattern: &[[i32; 3]],
    ) -> u32 {
        let mut changed = 0;
        for offset in pattern {
            if changed >= max_cells {
                break;
            }
            let cell = center.offset(*offset);
            if !world.is_paintable(cell) || self.owner(cell) == CellOwner::Team(team) {
                continue;
            }
            if self.assign(world, cell, CellOwner::Team(team)) {
                changed += 1;
            }
        }
        if changed > 0 {
            debug!(team_id = team, changed, ?center, "Painted cells");
        }
        changed
    }

    /// Runner contact painting: the cell beneath and its fixed neighbourhood
    pub fn paint_footprint<W: CellWorld + ?Sized>(
        &mut self,
        world: &mut W,
        beneath: CellPos,
        team: TeamId,
        footprint: &[[i32; 3]],
    ) -> u32 {
        self.paint(world, beneath, team, footprint.len() as u32, footprint)
    }

    /// Begin resetting every owned cell. Work happens in [`Self::clear_step`].
    pub fn start_clear(&mut self) {
        let mut cells: Vec<CellPos> = self.cells.keys().copied().collect();
        // Pop from the back in ascending order
        cells.sort_unstable_by(|a, b| b.cmp(a));
        info!(cells = cells.len(), "Clearing territory");
        self.pending_clear = cells;
        self.clearing = true;
    }

    /// Reset up to `batch` cells. Returns true once the ledger is empty and the
    /// clear has finished.
    pub fn clear_step<W: CellWorld + ?Sized>(&mut self, world: &mut W, batch: usize) -> bool {
        if !self.clearing {
            return true;
        }

        for _ in 0..batch.max(1) {
            let Some(cell) = self.pending_clear.pop() else {
                break;
            };
            self.assign(world, cell, CellOwner::Empty);
        }

        if self.pending_clear.is_empty() {
            if self.cells.is_empty() {
                self.clearing = false;
                info!("Territory cleared");
                return true;
            }
            // Cells claimed after the clear began
            self.pending_clear = self.cells.keys().copied().collect();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const PATTERN: [[i32; 3]; 19] = [
        [0, 0, 0],
        [0, 1, 0],
        [0, -1, 0],
        [1, 0, 0],
        [-1, 0, 0],
        [0, 0, 1],
        [0, 0, -1],
        [1, 0, 1],
        [-1, 0, 1],
        [1, 0, -1],
        [-1, 0, -1],
        [-1, -1, -1],
        [1, -1, -1],
        [0, -1, 1],
        [1, 1, 1],
        [-1, 1, 1],
        [1, 1, -1],
        [-1, 1, -1],
        [0, -2, 0],
    ];

    #[derive(Default)]
    struct FakeWorld {
        paintable: HashSet<CellPos>,
        written: HashMap<CellPos, CellOwner>,
    }

    impl FakeWorld {
        /// Solid slab of `half` cells around the origin, `depth` cells deep
        fn slab(half: i32, depth: i32) -> Self {
            let mut world = Self::default();
            for x in -half..=half {
                for z in -half..=half {
                    for y in -depth + 1..=0 {
                        world.paintable.insert(CellPos::new(x, y, z));
                    }
                }
            }
            world
        }
    }

    impl CellWorld for FakeWorld {
        fn is_paintable(&self, cell: CellPos) -> bool {
            self.paintable.contains(&cell)
        }

        fn set_cell(&mut self, cell: CellPos, owner: CellOwner) {
            self.written.insert(cell, owner);
        }
    }

    fn assert_consistent(ledger: &TerritoryLedger, world: &FakeWorld) {
        for team in [1, 2] {
            assert_eq!(ledger.score(team), ledger.count_owned(team), "team {team}");
        }
        for (cell, owner) in &world.written {
            assert_eq!(ledger.owner(*cell), *owner, "world diverged at {cell:?}");
        }
    }

    #[test]
    fn paint_respects_cap_and_skips_own_cells() {
        let mut world = FakeWorld::slab(3, 3);
        let mut ledger = TerritoryLedger::new([1, 2]);

        let changed = ledger.paint(&mut world, CellPos::new(0, 0, 0), 1, 2, &PATTERN);
        assert_eq!(changed, 2);
        assert_eq!(ledger.score(1), 2);

        // Same spot again: the first two cells are already ours, the next two change
        let changed = ledger.paint(&mut world, CellPos::new(0, 0, 0), 1, 2, &PATTERN);
        assert_eq!(changed, 2);
        assert_eq!(ledger.score(1), 4);
        assert_consistent(&ledger, &world);
    }

    #[test]
    fn non_paintable_cells_do_not_count() {
        let mut world = FakeWorld::slab(3, 1);
        let mut ledger = TerritoryLedger::new([1, 2]);
        // Only y == 0 exists; the "above" and "below" offsets are air
        let changed = ledger.paint(&mut world, CellPos::new(0, 0, 0), 2, 3, &PATTERN);
        assert_eq!(changed, 3);
        assert_eq!(ledger.owner(CellPos::new(0, 1, 0)), CellOwner::Empty);
        assert_eq!(ledger.owner(CellPos::new(1, 0, 0)), CellOwner::Team(2));
        assert_consistent(&ledger, &world);
    }

    #[test]
    fn repaint_moves_score_between_teams() {
        let mut world = FakeWorld::slab(3, 3);
        let mut ledger = TerritoryLedger::new([1, 2]);
        ledger.paint(&mut world, CellPos::new(0, 0, 0), 1, 12, &PATTERN);
        assert_eq!(ledger.score(1), 12);

        let changed = ledger.paint(&mut world, CellPos::new(0, 0, 0), 2, 4, &PATTERN);
        assert_eq!(changed, 4);
        assert_eq!(ledger.score(1), 8);
        assert_eq!(ledger.score(2), 4);
        assert_consistent(&ledger, &world);
    }

    #[test]
    fn scores_match_counts_across_mixed_operations() {
        let mut world = FakeWorld::slab(6, 3);
        let mut ledger = TerritoryLedger::new([1, 2]);
        let centers = [(0, 0), (1, 1), (-2, 3), (1, 0), (4, -4), (0, 0), (-1, -1)];
        for (i, (x, z)) in centers.iter().enumerate() {
            let team = if i % 2 == 0 { 1 } else { 2 };
            let cap = if i % 3 == 0 { 12 } else { 2 };
            ledger.paint(&mut world, CellPos::new(*x, 0, *z), team, cap, &PATTERN);
            assert_consistent(&ledger, &world);
        }

        ledger.start_clear();
        while !ledger.clear_step(&mut world, 5) {
            assert_consistent(&ledger, &world);
        }
        assert!(ledger.is_empty());
        assert_eq!(ledger.score(1), 0);
        assert_eq!(ledger.score(2), 0);
        assert!(world.written.values().all(|o| *o == CellOwner::Empty));
    }

    #[test]
    fn clear_is_incremental() {
        let mut world = FakeWorld::slab(4, 3);
        let mut ledger = TerritoryLedger::new([1, 2]);
        ledger.paint(&mut world, CellPos::new(0, 0, 0), 1, 12, &PATTERN);
        ledger.start_clear();
        assert!(ledger.is_clearing());
        assert!(!ledger.clear_step(&mut world, 5));
        assert_eq!(ledger.owned_cells(), 7);
        assert!(!ledger.clear_step(&mut world, 5));
        assert!(ledger.clear_step(&mut world, 5));
        assert!(!ledger.is_clearing());
    }

    #[test]
    fn clear_when_idle_is_a_noop() {
        let mut world = FakeWorld::default();
        let mut ledger = TerritoryLedger::new([1, 2]);
        ledger.start_clear();
        assert!(ledger.clear_step(&mut world, 64));
        assert!(ledger.clear_step(&mut world, 64));
        assert!(world.written.is_empty());
    }

    #[test]
    fn footprint_paints_beneath_and_neighbours() {
        let mut world = FakeWorld::slab(3, 1);
        let mut ledger = TerritoryLedger::new([1, 2]);
        let footprint = [[0, 0, 0], [1, 0, 0], [-1, 0, 0], [0, 0, 1], [0, 0, -1]];
        let changed = ledger.paint_footprint(&mut world, CellPos::new(3, 0, 0), 2, &footprint);
        // (4, 0, 0) is off the slab
        assert_eq!(changed, 4);
        assert_eq!(ledger.score(2), 4);
        assert_consistent(&ledger, &world);
    }
}
