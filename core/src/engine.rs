use alloc::vec;
use alloc::vec::Vec;
use core::num::Saturating;
use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::*;

/// Valid transitions:
/// - NotStarted -> InProgress
/// - InProgress -> Won
/// - InProgress -> Lost
///
/// Only a new session leaves `Won` or `Lost`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    NotStarted,
    InProgress,
    Won,
    Lost,
}

impl SessionStatus {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::NotStarted)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// One game from the first click to a win or loss.
///
/// `H` is the handle of the running tick, present only while the session is in progress.
#[derive(Debug)]
pub struct GameSession<H> {
    config: GameConfig,
    seed: u64,
    layout: Option<MineLayout>,
    board: Array2<EngineCell>,
    revealed_count: Saturating<CellCount>,
    flags_placed: Saturating<CellCount>,
    score: Saturating<CellCount>,
    elapsed_secs: u32,
    status: SessionStatus,
    triggered_mine: Option<Coord2>,
    timer: Option<H>,
}

impl<H> GameSession<H> {
    fn new(config: GameConfig, seed: u64, layout: Option<MineLayout>) -> Self {
        Self {
            config,
            seed,
            layout,
            board: Array2::default(config.size.to_nd_index()),
            revealed_count: Saturating(0),
            flags_placed: Saturating(0),
            score: Saturating(0),
            elapsed_secs: 0,
            status: SessionStatus::default(),
            triggered_mine: None,
            timer: None,
        }
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn size(&self) -> Coord2 {
        self.config.size
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn first_move_made(&self) -> bool {
        !self.status.is_ready()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Mine layout, `None` until the first activation places the mines.
    pub fn layout(&self) -> Option<&MineLayout> {
        self.layout.as_ref()
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count.0
    }

    pub fn flags_placed(&self) -> CellCount {
        self.flags_placed.0
    }

    pub fn score(&self) -> CellCount {
        self.score.0
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn mines_remaining(&self) -> CellCount {
        self.config.mines.saturating_sub(self.flags_placed.0)
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn cell_at(&self, coords: Coord2) -> EngineCell {
        self.board[coords.to_nd_index()]
    }

    pub fn has_mine_at(&self, coords: Coord2) -> bool {
        self.layout
            .as_ref()
            .is_some_and(|layout| layout.contains_mine(coords))
    }

    pub fn stats(&self) -> Stats {
        Stats {
            mines_remaining: self.mines_remaining(),
            elapsed_secs: self.elapsed_secs,
            revealed: self.revealed_count.0,
            score: self.score.0,
        }
    }

    /// Display state of a cell, disclosing mines once the session has ended.
    pub fn cell_state(&self, coords: Coord2) -> CellState {
        use SessionStatus::*;

        let cell = self.cell_at(coords);
        let has_mine = self.has_mine_at(coords);

        match (self.status, cell) {
            (Lost, _) if self.triggered_mine == Some(coords) => CellState::TriggeredMine,
            (Lost, EngineCell::Hidden) if has_mine => CellState::Mine,
            (Won, EngineCell::Hidden) if has_mine => CellState::AutoFlagged,
            (Won | Lost, EngineCell::Flagged) if !has_mine => CellState::Misflagged,
            (_, EngineCell::Hidden) => CellState::Hidden,
            (_, EngineCell::Flagged) => CellState::Flagged,
            (_, EngineCell::Revealed(count)) => CellState::Revealed(count),
        }
    }

    pub fn cell_view(&self, coords: Coord2) -> Option<CellView> {
        self.config
            .contains(coords)
            .then(|| CellView::new(coords, self.cell_state(coords)))
    }

    /// Every cell of the board in row-major order, for a full redraw.
    pub fn board_view(&self) -> impl Iterator<Item = CellView> + '_ {
        iter_coords(self.size()).map(move |coords| CellView::new(coords, self.cell_state(coords)))
    }

    fn can_activate(&self, coords: Coord2) -> bool {
        self.config.contains(coords)
            && !self.status.is_finished()
            && matches!(self.cell_at(coords), EngineCell::Hidden)
    }

    fn update(&self, changed: Vec<CellView>) -> Update {
        Update {
            changed,
            status: self.status,
            stats: self.stats(),
        }
    }

    fn reveal(&mut self, coords: Coord2, changed: &mut Vec<CellView>) {
        let Some(layout) = self.layout.as_ref() else {
            log::warn!("Reveal at {coords:?} before mines were placed");
            return;
        };

        if layout.contains_mine(coords) {
            log::debug!("Mine hit at {coords:?}");
            self.triggered_mine = Some(coords);
            self.revealed_count += 1;
            self.finish(false, changed);
            return;
        }

        let adjacent = layout.adjacent_mine_count(coords);
        self.board[coords.to_nd_index()] = EngineCell::Revealed(adjacent);
        self.revealed_count += 1;
        self.score += 1;
        changed.push(CellView::new(coords, CellState::Revealed(adjacent)));
        log::debug!("Revealed {coords:?}, adjacent mines: {adjacent}");

        if adjacent == 0 {
            self.flood_reveal(coords, changed);
        }

        if self.revealed_count.0 == self.config.safe_cell_count() {
            self.finish(true, changed);
        }
    }

    /// Cascades from a zero cell through every reachable zero cell, revealing one ring of
    /// bordering cells past the zero region. Flagged cells stop the cascade.
    fn flood_reveal(&mut self, start: Coord2, changed: &mut Vec<CellView>) {
        let Self {
            layout: Some(layout),
            board,
            revealed_count,
            score,
            ..
        } = self
        else {
            return;
        };

        let mut frontier = vec![start];
        while let Some(coords) = frontier.pop() {
            for pos in layout.iter_neighbors(coords) {
                let index = pos.to_nd_index();
                if board[index] != EngineCell::Hidden || layout.contains_mine(pos) {
                    continue;
                }

                let adjacent = layout.adjacent_mine_count(pos);
                board[index] = EngineCell::Revealed(adjacent);
                *revealed_count += 1;
                *score += 1;
                changed.push(CellView::new(pos, CellState::Revealed(adjacent)));
                log::trace!("Flood revealed {pos:?}, adjacent mines: {adjacent}");

                if adjacent == 0 {
                    frontier.push(pos);
                }
            }
        }
    }

    fn toggle_flag(&mut self, coords: Coord2) -> Option<CellView> {
        if !self.config.contains(coords) || self.status.is_finished() {
            return None;
        }

        let index = coords.to_nd_index();
        let state = match self.board[index] {
            EngineCell::Hidden => {
                self.board[index] = EngineCell::Flagged;
                self.flags_placed += 1;
                CellState::Flagged
            }
            EngineCell::Flagged => {
                self.board[index] = EngineCell::Hidden;
                self.flags_placed -= 1;
                CellState::Hidden
            }
            EngineCell::Revealed(_) => return None,
        };

        log::debug!("Flag at {coords:?}: {state:?}");
        Some(CellView::new(coords, state))
    }

    /// Moves to a terminal status, stops the timer and reports the cells the end of the game
    /// discloses.
    fn finish(&mut self, won: bool, changed: &mut Vec<CellView>) {
        if self.status.is_finished() {
            return;
        }

        self.status = if won {
            SessionStatus::Won
        } else {
            SessionStatus::Lost
        };

        if self.timer.take().is_some() {
            log::debug!("Timer stopped at {}s", self.elapsed_secs);
        }

        if won {
            let Some(layout) = self.layout.as_ref() else {
                return;
            };
            let board = &self.board;
            changed.extend(
                layout
                    .iter_mines()
                    .filter(|&coords| board[coords.to_nd_index()] == EngineCell::Hidden)
                    .map(|coords| CellView::new(coords, CellState::AutoFlagged)),
            );
            self.flags_placed = Saturating(self.config.mines);
            log::debug!("Game won, score: {}", self.score.0);
        } else {
            changed.clear();
            changed.extend(self.board_view());
            log::debug!("Game lost, score: {}", self.score.0);
        }
    }
}

/// Owns the live [`GameSession`] and turns host intents into [`Update`]s.
#[derive(Debug)]
pub struct GridEngine<S: TickScheduler> {
    scheduler: S,
    rng: SmallRng,
    session: GameSession<S::Handle>,
}

impl<S: TickScheduler> GridEngine<S> {
    /// Engine with a fresh, not yet started session. Each session's mine placement is seeded from
    /// `seed`.
    pub fn new(config: GameConfig, scheduler: S, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let session = GameSession::new(config, rng.next_u64(), None);
        Self {
            scheduler,
            rng,
            session,
        }
    }

    /// Engine whose first session uses `layout` instead of random placement.
    pub fn with_layout(layout: MineLayout, scheduler: S) -> Self {
        let config = layout.game_config();
        Self {
            scheduler,
            rng: SmallRng::seed_from_u64(0),
            session: GameSession::new(config, 0, Some(layout)),
        }
    }

    pub fn session(&self) -> &GameSession<S::Handle> {
        &self.session
    }

    pub fn config(&self) -> GameConfig {
        self.session.config
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn stats(&self) -> Stats {
        self.session.stats()
    }

    pub fn cell_view(&self, coords: Coord2) -> Option<CellView> {
        self.session.cell_view(coords)
    }

    pub fn board_view(&self) -> impl Iterator<Item = CellView> + '_ {
        self.session.board_view()
    }

    /// Replaces the session with an empty board; the previous session and its timer are dropped.
    pub fn configure(
        &mut self,
        rows: Coord,
        cols: Coord,
        mines: CellCount,
    ) -> Result<&GameSession<S::Handle>> {
        let config = GameConfig::new((rows, cols), mines)?;
        Ok(self.start_session(config))
    }

    pub fn configure_difficulty(&mut self, difficulty: Difficulty) -> &GameSession<S::Handle> {
        self.start_session(difficulty.config())
    }

    /// New session with the current configuration.
    pub fn reset(&mut self) -> &GameSession<S::Handle> {
        self.start_session(self.session.config)
    }

    fn start_session(&mut self, config: GameConfig) -> &GameSession<S::Handle> {
        let seed = self.rng.next_u64();
        log::debug!("New session {:?} with {} mines", config.size, config.mines);
        self.session = GameSession::new(config, seed, None);
        &self.session
    }

    /// Reveals a cell. Out-of-bounds, revealed or flagged cells and finished sessions are ignored.
    ///
    /// The first activation of a session places the mines around the activated cell and starts
    /// the timer.
    pub fn activate_cell(&mut self, coords: Coord2) -> Update {
        let mut changed = Vec::new();

        if self.session.can_activate(coords) {
            if self.session.layout.is_none() {
                let generator = RandomLayoutGenerator::new(self.session.seed, coords);
                self.session.layout = Some(generator.generate(self.session.config));
            }

            if self.session.status.is_ready() {
                self.session.status = SessionStatus::InProgress;
            }

            self.session.reveal(coords, &mut changed);

            if self.session.status == SessionStatus::InProgress && self.session.timer.is_none() {
                log::debug!("Timer started");
                self.session.timer = Some(self.scheduler.schedule());
            }
        }

        self.session.update(changed)
    }

    /// Flips the flag on a hidden cell. Revealed cells and finished sessions are ignored.
    pub fn toggle_flag(&mut self, coords: Coord2) -> Update {
        let changed = self.session.toggle_flag(coords).into_iter().collect();
        self.session.update(changed)
    }

    /// One timer tick. Returns the new stats when the elapsed time advanced.
    pub fn tick(&mut self) -> Option<Stats> {
        let session = &mut self.session;
        if session.status != SessionStatus::InProgress || session.timer.is_none() {
            return None;
        }

        session.elapsed_secs = session.elapsed_secs.saturating_add(1);
        Some(session.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: Coord2, mines: &[Coord2]) -> MineLayout {
        MineLayout::from_mine_coords(size, mines).unwrap()
    }

    fn engine_with(size: Coord2, mines: &[Coord2]) -> (GridEngine<ManualScheduler>, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        let engine = GridEngine::with_layout(layout(size, mines), scheduler.clone());
        (engine, scheduler)
    }

    #[test]
    fn configure_starts_empty_session() {
        let mut engine = GridEngine::new(GameConfig::default(), (), 1);
        let session = engine.configure(8, 8, 10).unwrap();

        assert_eq!(session.status(), SessionStatus::NotStarted);
        assert_eq!(session.revealed_count(), 0);
        assert_eq!(session.flags_placed(), 0);
        assert_eq!(session.elapsed_secs(), 0);
        assert!(session.layout().is_none());
        assert!(session.board_view().all(|view| view.state == CellState::Hidden));
    }

    #[test]
    fn configure_rejects_invalid_mine_count_and_keeps_session() {
        let mut engine = GridEngine::new(Difficulty::Easy.config(), (), 1);
        engine.activate_cell((0, 0));

        assert_eq!(
            engine.configure(2, 2, 4).map(|_| ()),
            Err(GameError::TooManyMines { mines: 4, cells: 4 })
        );
        assert_eq!(engine.config(), Difficulty::Easy.config());
        assert!(engine.session().first_move_made());
    }

    #[test]
    fn first_activation_is_safe_on_easy_board() {
        let mut engine = GridEngine::new(GameConfig::default(), (), 42);
        engine.configure(8, 8, 10).unwrap();

        let update = engine.activate_cell((0, 0));
        let session = engine.session();

        for coords in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            assert!(!session.has_mine_at(coords));
        }
        assert_eq!(session.layout().unwrap().mine_count(), 10);
        assert!(matches!(
            update.status,
            SessionStatus::InProgress | SessionStatus::Won
        ));
        assert!(session.revealed_count() >= 1);
        if update.status == SessionStatus::InProgress {
            assert_eq!(update.changed.len(), usize::from(session.revealed_count()));
        }
    }

    #[test]
    fn flood_reveal_wins_single_mine_board() {
        let (mut engine, scheduler) = engine_with((3, 3), &[(2, 2)]);

        let update = engine.activate_cell((0, 0));

        assert_eq!(update.status, SessionStatus::Won);
        assert_eq!(engine.session().revealed_count(), 8);
        assert_eq!(engine.session().cell_at((0, 0)), EngineCell::Revealed(0));
        assert_eq!(engine.session().cell_at((1, 1)), EngineCell::Revealed(1));
        assert_eq!(engine.session().cell_at((2, 2)), EngineCell::Hidden);
        assert_eq!(
            update.changed.last(),
            Some(&CellView::new((2, 2), CellState::AutoFlagged))
        );
        assert_eq!(update.stats.mines_remaining, 0);
        assert_eq!(scheduler.started(), 0);
    }

    #[test]
    fn flood_reveal_stops_one_ring_past_zero_region() {
        let (mut engine, _) = engine_with((1, 5), &[(0, 4)]);

        engine.activate_cell((0, 0));

        assert_eq!(engine.session().cell_at((0, 2)), EngineCell::Revealed(0));
        assert_eq!(engine.session().cell_at((0, 3)), EngineCell::Revealed(1));
        assert_eq!(engine.status(), SessionStatus::Won);
    }

    #[test]
    fn flagged_cells_block_the_cascade() {
        let (mut engine, _) = engine_with((1, 6), &[(0, 5)]);

        engine.toggle_flag((0, 2));
        let update = engine.activate_cell((0, 0));

        assert_eq!(update.changed.len(), 2);
        assert_eq!(engine.session().cell_at((0, 2)), EngineCell::Flagged);
        assert_eq!(engine.session().cell_at((0, 3)), EngineCell::Hidden);
        assert_eq!(engine.status(), SessionStatus::InProgress);
    }

    #[test]
    fn numbered_cell_does_not_cascade() {
        let (mut engine, _) = engine_with((3, 3), &[(0, 0)]);

        let update = engine.activate_cell((1, 1));

        assert_eq!(update.changed, [CellView::new((1, 1), CellState::Revealed(1))]);
        assert_eq!(update.status, SessionStatus::InProgress);
    }

    #[test]
    fn hitting_mine_loses_and_exposes_board() {
        let (mut engine, _) = engine_with((2, 2), &[(0, 0), (1, 1)]);

        engine.toggle_flag((1, 1));
        engine.toggle_flag((0, 1));
        let update = engine.activate_cell((0, 0));

        assert_eq!(update.status, SessionStatus::Lost);
        assert_eq!(update.changed.len(), 4);
        assert_eq!(engine.session().triggered_mine(), Some((0, 0)));
        assert_eq!(
            update.changed,
            [
                CellView::new((0, 0), CellState::TriggeredMine),
                CellView::new((0, 1), CellState::Misflagged),
                CellView::new((1, 0), CellState::Hidden),
                CellView::new((1, 1), CellState::Flagged),
            ]
        );
    }

    #[test]
    fn intents_after_loss_are_ignored() {
        let (mut engine, _) = engine_with((2, 2), &[(0, 0)]);
        engine.activate_cell((0, 0));

        let flag = engine.toggle_flag((1, 1));
        let reveal = engine.activate_cell((1, 0));

        assert!(!flag.has_update());
        assert!(!reveal.has_update());
        assert_eq!(engine.session().flags_placed(), 0);
        assert_eq!(engine.session().cell_at((1, 0)), EngineCell::Hidden);
        assert_eq!(engine.status(), SessionStatus::Lost);
    }

    #[test]
    fn out_of_bounds_and_repeated_activations_are_ignored() {
        let (mut engine, _) = engine_with((3, 3), &[(0, 0)]);

        assert!(!engine.activate_cell((3, 0)).has_update());
        assert!(!engine.toggle_flag((0, 3)).has_update());
        assert_eq!(engine.status(), SessionStatus::NotStarted);

        assert!(engine.activate_cell((2, 2)).has_update());
        let revealed = engine.session().revealed_count();
        assert!(!engine.activate_cell((2, 2)).has_update());
        assert_eq!(engine.session().revealed_count(), revealed);
    }

    #[test]
    fn flagged_cell_cannot_be_activated() {
        let (mut engine, _) = engine_with((3, 3), &[(0, 0)]);

        engine.toggle_flag((2, 2));
        let update = engine.activate_cell((2, 2));

        assert!(!update.has_update());
        assert_eq!(update.status, SessionStatus::NotStarted);
    }

    #[test]
    fn toggling_flag_alternates_and_counts_once() {
        let (mut engine, _) = engine_with((3, 3), &[(0, 0)]);

        let first = engine.toggle_flag((0, 0));
        assert_eq!(first.changed, [CellView::new((0, 0), CellState::Flagged)]);
        assert_eq!(first.stats.mines_remaining, 0);

        let second = engine.toggle_flag((0, 0));
        assert_eq!(second.changed, [CellView::new((0, 0), CellState::Hidden)]);
        assert_eq!(engine.session().flags_placed(), 0);

        engine.toggle_flag((1, 1));
        engine.toggle_flag((2, 2));
        assert_eq!(engine.session().flags_placed(), 2);
        assert_eq!(engine.stats().mines_remaining, 0);
    }

    #[test]
    fn revealed_cell_cannot_be_flagged() {
        let (mut engine, _) = engine_with((3, 3), &[(0, 0)]);
        engine.activate_cell((1, 1));

        assert!(!engine.toggle_flag((1, 1)).has_update());
        assert_eq!(engine.session().flags_placed(), 0);
    }

    #[test]
    fn flagging_does_not_start_the_game() {
        let (mut engine, scheduler) = engine_with((3, 3), &[(0, 0)]);

        engine.toggle_flag((0, 0));

        assert_eq!(engine.status(), SessionStatus::NotStarted);
        assert_eq!(scheduler.started(), 0);
        assert_eq!(engine.tick(), None);
    }

    #[test]
    fn timer_runs_only_while_in_progress() {
        let (mut engine, scheduler) = engine_with((3, 3), &[(0, 0)]);

        engine.activate_cell((1, 1));
        assert_eq!(engine.status(), SessionStatus::InProgress);
        assert_eq!(scheduler.running(), 1);

        assert_eq!(engine.tick().map(|stats| stats.elapsed_secs), Some(1));
        assert_eq!(engine.tick().map(|stats| stats.elapsed_secs), Some(2));

        engine.activate_cell((0, 0));
        assert_eq!(engine.status(), SessionStatus::Lost);
        assert_eq!(scheduler.cancelled(), 1);
        assert_eq!(engine.tick(), None);
        assert_eq!(engine.stats().elapsed_secs, 2);
    }

    #[test]
    fn timer_cancelled_once_on_win() {
        let (mut engine, scheduler) = engine_with((1, 3), &[(0, 1)]);

        engine.activate_cell((0, 0));
        assert_eq!(engine.status(), SessionStatus::InProgress);
        engine.activate_cell((0, 2));

        assert_eq!(engine.status(), SessionStatus::Won);
        assert_eq!(scheduler.started(), 1);
        assert_eq!(scheduler.cancelled(), 1);
    }

    #[test]
    fn reset_cancels_timer_and_clears_state() {
        let scheduler = ManualScheduler::new();
        let mut engine = GridEngine::new(Difficulty::Hard.config(), scheduler.clone(), 9);

        engine.activate_cell((8, 8));
        engine.tick();
        assert_eq!(scheduler.running(), 1);

        let session = engine.reset();
        assert_eq!(session.status(), SessionStatus::NotStarted);
        assert_eq!(session.elapsed_secs(), 0);
        assert_eq!(session.revealed_count(), 0);
        assert_eq!(scheduler.cancelled(), 1);
        assert_eq!(scheduler.running(), 0);

        engine.configure_difficulty(Difficulty::Easy);
        assert_eq!(scheduler.cancelled(), 1);
        assert_eq!(engine.config(), Difficulty::Easy.config());
    }

    #[test]
    fn sessions_get_different_layouts() {
        let mut engine = GridEngine::new(Difficulty::Hard.config(), (), 5);
        engine.activate_cell((0, 0));
        let first = engine.session().layout().cloned();

        engine.reset();
        engine.activate_cell((0, 0));

        assert_ne!(first.as_ref(), engine.session().layout());
    }

    #[test]
    fn same_seed_replays_same_game() {
        let mut a = GridEngine::new(Difficulty::Medium.config(), (), 11);
        let mut b = GridEngine::new(Difficulty::Medium.config(), (), 11);

        assert_eq!(a.activate_cell((5, 5)), b.activate_cell((5, 5)));
        assert_eq!(a.session().layout(), b.session().layout());
    }
}
