//! Session coordinator.
//!
//! `GameManager` is the only place that mutates the game state or the
//! connection registry. Every public method takes the same mutex for its
//! whole body, so admits, removals, rolls, bot moves and chat routing are
//! totally ordered. Sending never waits on a socket while the lock is held:
//! handles only enqueue into their bounded outbound queue, and recipients whose
//! queue refuses an envelope are removed after the fan-out completes.

use crate::client_manager::{ClientManager, Delivery};
use crate::connection::ClientHandle;
use crate::dice::{Dice, RandomDice};
use crate::game::{GameState, Phase};
use log::{debug, info, warn};
use shared::{Message, MessageType, MAX_DICE, MIN_DICE};
use tokio::sync::Mutex;

pub struct GameManager {
    inner: Mutex<Session>,
}

/// Everything guarded by the coordinator lock.
struct Session {
    state: GameState,
    clients: ClientManager,
    dice: Box<dyn Dice>,
}

impl Default for GameManager {
    fn default() -> Self {
        Self::new(Box::new(RandomDice))
    }
}

impl GameManager {
    /// `dice` serves ROLL envelopes from connections; bots bring their own.
    pub fn new(dice: Box<dyn Dice>) -> Self {
        Self {
            inner: Mutex::new(Session {
                state: GameState::new(),
                clients: ClientManager::new(),
                dice,
            }),
        }
    }

    /// Seats a joined participant and registers its connection, then
    /// announces the join and the refreshed user list.
    pub async fn admit(&self, handle: ClientHandle) {
        let mut session = self.inner.lock().await;
        let name = handle.name().to_string();

        session.state.add_player(&name);
        if let Some(previous) = session.clients.add_client(handle) {
            warn!(
                "{} joined again; closing previous connection {}",
                name,
                previous.id()
            );
            previous.request_disconnect();
        }

        session.broadcast(Message::info(format!("{} joined!", name)));
        session.broadcast_user_list();
    }

    /// Seats a bot. Bots get no registry entry and never receive envelopes.
    pub async fn admit_bot(&self, name: &str) {
        let mut session = self.inner.lock().await;
        session.state.add_player(name);
        info!("Added bot: {}", name);
    }

    /// Removes `name` from both the game state and the registry and announces
    /// the departure. The turn pointer is not moved.
    pub async fn remove(&self, name: &str) {
        let mut session = self.inner.lock().await;
        session.depart(vec![name.to_string()]);
    }

    /// Disconnect path of a connection handler: removes `name` only if the
    /// registry entry still belongs to `connection_id`.
    pub async fn remove_connection(&self, name: &str, connection_id: u64) -> bool {
        let mut session = self.inner.lock().await;
        let owned = session
            .clients
            .get(name)
            .map_or(false, |client| client.id() == connection_id);

        if owned {
            session.depart(vec![name.to_string()]);
        } else {
            debug!(
                "Connection {} for {} already unregistered",
                connection_id, name
            );
        }
        owned
    }

    /// Starts the session: announces it, pushes the user list and the first
    /// STATE snapshot, and notifies the first turn holder. Later calls do
    /// nothing.
    pub async fn start(&self) {
        let mut session = self.inner.lock().await;
        if !session.state.start() {
            warn!("Ignoring start: the session is already running");
            return;
        }

        let count = session.state.len();
        info!(
            "Game started with {} players: {}",
            count,
            session.state.names().join(", ")
        );

        session.broadcast(Message::info(format!("Game Started with {} players!", count)));
        session.broadcast_user_list();
        session.broadcast_state();
        session.announce_turn();
    }

    /// Routes one inbound envelope from the connection joined as `from`.
    pub async fn dispatch(&self, message: Message, from: &str) {
        let mut session = self.inner.lock().await;

        match message.kind {
            MessageType::Roll => {
                if session.state.can_roll(from) {
                    let dice = session.dice.roll();
                    session.play_turn(from, dice);
                } else {
                    debug!("Ignoring out-of-turn roll from {}", from);
                }
            }
            MessageType::PublicChat => {
                debug!("[CHAT] Public from {}: {}", message.sender, message.content);
                session.broadcast(message);
            }
            MessageType::PrivateChat => session.route_private(message, from),
            kind if kind.is_server_only() => {
                debug!("Ignoring server-only {} sent by {}", kind, from);
            }
            kind => debug!("Ignoring {} from {}", kind, from),
        }
    }

    /// Same validation and effects as a ROLL, for a bot that drew `dice`.
    pub async fn bot_move(&self, name: &str, dice: u32) {
        let mut session = self.inner.lock().await;

        if !(MIN_DICE..=MAX_DICE).contains(&dice) {
            warn!("Ignoring impossible draw {} from {}", dice, name);
            return;
        }
        if session.state.can_roll(name) {
            session.play_turn(name, dice);
        }
    }

    pub async fn is_turn(&self, name: &str) -> bool {
        self.inner.lock().await.state.is_turn(name)
    }

    pub async fn current_turn(&self) -> Option<String> {
        self.inner.lock().await.state.current_turn().map(str::to_owned)
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.state.phase()
    }

    /// Seated participants and positions, in turn order.
    pub async fn positions(&self) -> Vec<(String, u32)> {
        let session = self.inner.lock().await;
        session
            .state
            .players()
            .iter()
            .map(|p| (p.name.clone(), p.position))
            .collect()
    }

    pub async fn snapshot(&self) -> String {
        self.inner.lock().await.state.snapshot()
    }

    /// Names with a live connection, in join order.
    pub async fn connected_names(&self) -> Vec<String> {
        self.inner.lock().await.clients.names()
    }

    pub async fn participant_count(&self) -> usize {
        self.inner.lock().await.state.len()
    }
}

impl Session {
    /// Applies a validated roll and publishes MOVE, STATE and the next turn.
    fn play_turn(&mut self, name: &str, dice: u32) {
        let Some(position) = self.state.apply_roll(name, dice) else {
            return;
        };

        let description = format!("{} rolled {} (pos: {})", name, dice, position);
        info!("{}", description);

        self.broadcast(Message::moved(description));
        self.broadcast_state();
        self.announce_turn();
    }

    fn announce_turn(&mut self) {
        let Some(current) = self.state.current_turn().map(str::to_owned) else {
            return;
        };

        self.broadcast(Message::info(format!("It's {}'s turn!", current)));
        if self.clients.send_to(&current, Message::your_turn()) == Delivery::Failed {
            self.depart(vec![current]);
        }
    }

    /// Delivers to the recipient and echoes to the sender's own connection.
    /// A message to oneself is delivered once.
    fn route_private(&mut self, message: Message, from: &str) {
        let recipient = message.recipient.clone().unwrap_or_default();
        debug!(
            "[CHAT] Private from {} to {}: {}",
            from, recipient, message.content
        );

        let mut failed = Vec::new();
        match self.clients.send_to(&recipient, message.clone()) {
            Delivery::Failed => failed.push(recipient.clone()),
            Delivery::Missing => debug!("Private chat recipient {:?} is not connected", recipient),
            Delivery::Sent => {}
        }
        if recipient != from && self.clients.send_to(from, message) == Delivery::Failed {
            failed.push(from.to_string());
        }

        self.depart(failed);
    }

    fn broadcast(&mut self, message: Message) {
        let failed = self.clients.broadcast(&message);
        self.depart(failed);
    }

    fn broadcast_user_list(&mut self) {
        let names = self.clients.names();
        self.broadcast(Message::user_list(names));
    }

    fn broadcast_state(&mut self) {
        let snapshot = self.state.snapshot();
        self.broadcast(Message::state(snapshot));
    }

    /// Removes each name from the registry and the game state, then tells the
    /// remaining connections. Recipients that fail during those announcements
    /// are queued and removed in turn.
    fn depart(&mut self, mut pending: Vec<String>) {
        while let Some(name) = pending.pop() {
            let connection = self.clients.remove_client(&name, None);
            let seat = self.state.remove_player(&name);
            if connection.is_none() && seat.is_none() {
                continue;
            }

            if let Some(handle) = connection {
                handle.request_disconnect();
            }
            info!("Removed player: {}", name);

            let names = self.clients.names();
            pending.extend(self.clients.broadcast(&Message::user_list(names)));
            pending.extend(
                self.clients
                    .broadcast(&Message::info(format!("{} has left the game.", name))),
            );
        }
    }
}
