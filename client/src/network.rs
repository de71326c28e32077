use crate::game::{ClientEvent, ClientView};
use crate::input::{parse_command, Command};
use crate::rendering::Renderer;
use log::{debug, info, warn};
use shared::{read_message, validate_name, write_message, Message};
use std::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Client {
    writer: OwnedWriteHalf,
    inbound: mpsc::Receiver<Message>,
    reader_task: JoinHandle<()>,

    view: ClientView,
    renderer: Renderer,
    auto_roll: bool,
}

impl Client {
    /// Connects and sends the JOIN envelope.
    ///
    /// With `auto_roll` the client answers every YOUR_TURN with a ROLL on its
    /// own.
    pub async fn connect(
        server_addr: &str,
        name: &str,
        auto_roll: bool,
    ) -> Result<Self, Box<dyn Error>> {
        validate_name(name)?;

        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, mut writer) = stream.into_split();

        write_message(&mut writer, &Message::join(name)).await?;
        info!("Joined {} as {}", server_addr, name);

        // Frames are read on their own task so that a half-read frame is never
        // abandoned when terminal input arrives.
        let (tx, inbound) = mpsc::channel(256);
        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(read_half);
            loop {
                match read_message(&mut reader).await {
                    Ok(Some(message)) => {
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Error receiving message: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Client {
            writer,
            inbound,
            reader_task,
            view: ClientView::new(name),
            renderer: Renderer::new(name),
            auto_roll,
        })
    }

    pub fn view(&self) -> &ClientView {
        &self.view
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), Box<dyn Error>> {
        write_message(&mut self.writer, message).await?;
        Ok(())
    }

    /// Waits for the next envelope and applies it. Returns `None` once the
    /// server has closed the connection.
    pub async fn next_event(&mut self) -> Result<Option<ClientEvent>, Box<dyn Error>> {
        let event = self.recv_event().await;
        if let Some(event) = &event {
            self.react(event).await?;
        }
        Ok(event)
    }

    /// Cancel-safe: nothing is written here.
    async fn recv_event(&mut self) -> Option<ClientEvent> {
        let message = self.inbound.recv().await?;

        let event = match self.view.apply(message) {
            Ok(event) => event,
            Err(e) => {
                warn!("Ignoring unreadable update: {}", e);
                ClientEvent::Ignored
            }
        };
        Some(event)
    }

    async fn react(&mut self, event: &ClientEvent) -> Result<(), Box<dyn Error>> {
        if *event == ClientEvent::YourTurn && self.auto_roll && self.view.take_roll() {
            debug!("Rolling automatically");
            let roll = Message::roll(self.view.name());
            self.send(&roll).await?;
        }
        Ok(())
    }

    /// Executes one terminal command. Returns false when the user quits.
    pub async fn handle_command(&mut self, command: Command) -> Result<bool, Box<dyn Error>> {
        match command {
            Command::Quit => return Ok(false),
            Command::Empty => {}
            Command::Who => println!("{}", self.renderer.render_users(&self.view)),
            Command::Chats => println!("{}", self.renderer.render_conversations(&self.view)),
            Command::Invalid(reason) => println!("{}", reason),
            Command::Roll if !self.view.take_roll() => println!("It is not your turn yet."),
            command => {
                if let Some(message) = command.into_message(self.view.name()) {
                    self.send(&message).await?;
                }
            }
        }
        Ok(true)
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn Error>> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        loop {
            tokio::select! {
                event = self.recv_event() => match event {
                    Some(event) => {
                        if let Some(text) = self.renderer.render_event(&self.view, &event) {
                            println!("{}", text);
                        }
                        self.react(&event).await?;
                    }
                    None => {
                        println!("Disconnected from server.");
                        break;
                    }
                },

                line = lines.next_line(), if stdin_open => match line? {
                    Some(line) => {
                        if !self.handle_command(parse_command(&line)).await? {
                            break;
                        }
                    }
                    None => stdin_open = false,
                },
            }
        }

        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}
