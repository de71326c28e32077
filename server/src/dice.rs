//! Dice sources. The server only ever needs one uniform draw in `[1, 6]`.

use rand::Rng;
use shared::{MAX_DICE, MIN_DICE};

pub trait Dice: Send {
    fn roll(&mut self) -> u32;
}

/// Draws from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomDice;

impl Dice for RandomDice {
    fn roll(&mut self) -> u32 {
        rand::thread_rng().gen_range(MIN_DICE..=MAX_DICE)
    }
}

/// Replays a fixed list of draws, cycling when exhausted. Used for
/// reproducible sessions.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    draws: Vec<u32>,
    next: usize,
}

impl ScriptedDice {
    /// Draws outside `[1, 6]` are clamped into range; an empty script always
    /// yields the lowest face.
    pub fn new(draws: impl IntoIterator<Item = u32>) -> Self {
        Self {
            draws: draws
                .into_iter()
                .map(|d| d.clamp(MIN_DICE, MAX_DICE))
                .collect(),
            next: 0,
        }
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self) -> u32 {
        if self.draws.is_empty() {
            return MIN_DICE;
        }
        let draw = self.draws[self.next % self.draws.len()];
        self.next += 1;
        draw
    }
}
