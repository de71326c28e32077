//! Autonomous participants that fill the seats no human took.

use crate::dice::{Dice, RandomDice};
use crate::game_manager::GameManager;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// Default pause between two turn checks.
pub const DEFAULT_BOT_INTERVAL: Duration = Duration::from_secs(2);

/// Seat name for the `index`-th bot, counting from 1.
pub fn bot_name(index: usize) -> String {
    format!("BOT-{}", index)
}

pub struct Bot {
    name: String,
    interval: Duration,
    dice: Box<dyn Dice>,
}

impl Bot {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self::with_dice(name, interval, Box::new(RandomDice))
    }

    pub fn with_dice(name: impl Into<String>, interval: Duration, dice: Box<dyn Dice>) -> Self {
        Self {
            name: name.into(),
            interval,
            dice,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Polls for the turn forever, moving whenever it holds it. Stops only
    /// when its task is aborted.
    pub async fn run(mut self, manager: Arc<GameManager>) {
        loop {
            tokio::time::sleep(self.interval).await;

            if manager.is_turn(&self.name).await {
                let dice = self.dice.roll();
                debug!("{} draws {}", self.name, dice);
                manager.bot_move(&self.name, dice).await;
            }
        }
    }
}
