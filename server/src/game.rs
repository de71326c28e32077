//! Authoritative game state: seated participants, their position counters and
//! the turn pointer.
//!
//! Seats keep insertion order, which is also the turn order. Nothing here
//! locks; the `GameManager` owns the only instance and serializes access.

use log::info;
use shared::format_state;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub position: u32,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: 0,
        }
    }

    pub fn advance(&mut self, steps: u32) {
        self.position = self.position.saturating_add(steps);
    }
}

/// Session lifecycle. `Forming -> Running` happens once, on start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Forming,
    Running,
}

#[derive(Debug, Clone)]
pub struct GameState {
    players: Vec<Participant>,
    current_turn: Option<String>,
    phase: Phase,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            current_turn: None,
            phase: Phase::Forming,
        }
    }

    /// Seats a participant at position 0.
    ///
    /// A name that is already seated is replaced in place: it keeps its slot in
    /// the turn order but starts over at 0. Returns false in that case.
    pub fn add_player(&mut self, name: &str) -> bool {
        let fresh = match self.players.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                *existing = Participant::new(name);
                false
            }
            None => {
                self.players.push(Participant::new(name));
                true
            }
        };

        if self.current_turn.is_none() {
            self.current_turn = Some(name.to_string());
        }

        info!("Seated {} ({} participants)", name, self.players.len());
        fresh
    }

    /// Removes a participant. The turn pointer is left alone, so removing the
    /// turn holder stalls the session until that name is seated again. Only an
    /// empty table clears the pointer.
    pub fn remove_player(&mut self, name: &str) -> Option<Participant> {
        let index = self.players.iter().position(|p| p.name == name)?;
        let removed = self.players.remove(index);

        if self.players.is_empty() {
            self.current_turn = None;
        }

        info!("Unseated {} ({} participants)", name, self.players.len());
        Some(removed)
    }

    /// Moves to `Running`. Returns false if the session had already started.
    pub fn start(&mut self) -> bool {
        if self.phase == Phase::Running {
            return false;
        }
        self.phase = Phase::Running;
        true
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn current_turn(&self) -> Option<&str> {
        self.current_turn.as_deref()
    }

    pub fn is_turn(&self, name: &str) -> bool {
        self.current_turn.as_deref() == Some(name)
    }

    /// True when `name` may roll right now: the session runs, `name` holds the
    /// turn and is still seated.
    pub fn can_roll(&self, name: &str) -> bool {
        self.is_running() && self.is_turn(name) && self.position(name).is_some()
    }

    /// Applies a roll for the turn holder and passes the turn on.
    ///
    /// Returns the new position, or `None` (with no state change) when `name`
    /// may not roll.
    pub fn apply_roll(&mut self, name: &str, dice: u32) -> Option<u32> {
        if !self.can_roll(name) {
            return None;
        }

        let player = self.players.iter_mut().find(|p| p.name == name)?;
        player.advance(dice);
        let position = player.position;

        self.advance_turn();
        Some(position)
    }

    /// Passes the turn to the next seat in the current insertion order,
    /// wrapping after the last one.
    fn advance_turn(&mut self) {
        if self.players.is_empty() {
            self.current_turn = None;
            return;
        }

        let next = match self
            .current_turn
            .as_deref()
            .and_then(|current| self.players.iter().position(|p| p.name == current))
        {
            Some(index) => (index + 1) % self.players.len(),
            None => 0,
        };
        self.current_turn = Some(self.players[next].name.clone());
    }

    pub fn position(&self, name: &str) -> Option<u32> {
        self.players
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.position)
    }

    pub fn players(&self) -> &[Participant] {
        &self.players
    }

    pub fn names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// STATE payload for every seated participant, in seat order.
    pub fn snapshot(&self) -> String {
        format_state(self.players.iter().map(|p| (p.name.as_str(), p.position)))
    }
}
