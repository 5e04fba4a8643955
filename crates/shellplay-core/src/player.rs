//! Background driver for a [`WorkflowEngine`]
//!
//! The engine runs on its own thread. Commands arrive on a crossbeam
//! channel and are applied between steps; pause and stop additionally flip
//! the shared flags so an in-flight motion notices them.

use crate::control::PlaybackControl;
use crate::engine::{PlaybackState, PlaybackStatus, WorkflowEngine};
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// How long a navigation request waits for the player to reach a step boundary
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    Reset,
    Navigate(String, Sender<Result<String>>),
    ShowStart(Sender<Result<String>>),
    Shutdown,
}

pub struct Player;

impl Player {
    /// Move `engine` onto a new thread
    pub fn spawn(engine: WorkflowEngine) -> Result<PlayerHandle> {
        let (tx, rx) = unbounded();
        let control = engine.control();
        let status = engine.shared_status();
        let join = std::thread::Builder::new()
            .name("shellplay-player".into())
            .spawn(move || drive(engine, rx))?;
        Ok(PlayerHandle {
            tx,
            control,
            status,
            join: Some(join),
        })
    }
}

fn drive(mut engine: WorkflowEngine, rx: Receiver<Command>) -> WorkflowEngine {
    loop {
        let command = if engine.state() == PlaybackState::Running {
            match rx.try_recv() {
                Ok(cmd) => Some(cmd),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break,
            }
        };

        match command {
            None => {
                engine.step();
            }
            Some(Command::Shutdown) => break,
            Some(cmd) => apply(&mut engine, cmd),
        }
    }
    debug!("player thread exiting");
    engine
}

fn apply(engine: &mut WorkflowEngine, command: Command) {
    match command {
        Command::Start => {
            engine.start();
        }
        Command::Pause => engine.pause(),
        Command::Resume => engine.resume(),
        Command::Stop => engine.stop(),
        Command::Reset => engine.reset(),
        Command::Navigate(screen_id, reply) => {
            let result = engine.navigate_to(&screen_id).map(|_| screen_id);
            let _ = reply.send(result);
        }
        Command::ShowStart(reply) => {
            let _ = reply.send(engine.show_start_screen());
        }
        Command::Shutdown => {}
    }
}

/// Owns the player thread; dropping it shuts the thread down
pub struct PlayerHandle {
    tx: Sender<Command>,
    control: Arc<PlaybackControl>,
    status: Arc<RwLock<PlaybackStatus>>,
    join: Option<JoinHandle<WorkflowEngine>>,
}

impl PlayerHandle {
    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("player thread is gone");
        }
    }

    /// A sender other components can use to drive the player
    pub fn commands(&self) -> PlayerCommands {
        PlayerCommands {
            tx: self.tx.clone(),
            control: self.control.clone(),
            status: self.status.clone(),
        }
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn pause(&self) {
        self.control.request_pause();
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn stop(&self) {
        self.control.request_stop();
        self.send(Command::Stop);
    }

    pub fn reset(&self) {
        self.control.request_stop();
        self.send(Command::Reset);
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status.read().clone()
    }

    /// Stop the thread and get the engine back
    pub fn shutdown(mut self) -> Option<WorkflowEngine> {
        self.control.request_stop();
        self.send(Command::Shutdown);
        self.join.take().and_then(|j| j.join().ok())
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            self.control.request_stop();
            let _ = self.tx.send(Command::Shutdown);
            let _ = join.join();
        }
    }
}

/// Thread-safe command sender, shared with the remote control service
#[derive(Clone)]
pub struct PlayerCommands {
    tx: Sender<Command>,
    control: Arc<PlaybackControl>,
    status: Arc<RwLock<PlaybackStatus>>,
}

impl PlayerCommands {
    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| Error::player_gone())
    }

    pub fn start(&self) -> Result<()> {
        self.send(Command::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.control.request_pause();
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    pub fn stop(&self) -> Result<()> {
        self.control.request_stop();
        self.send(Command::Stop)
    }

    pub fn reset(&self) -> Result<()> {
        self.control.request_stop();
        self.send(Command::Reset)
    }

    /// Blocks until the player applies the navigation
    pub fn navigate(&self, screen_id: &str) -> Result<String> {
        let (reply, rx) = bounded(1);
        self.send(Command::Navigate(screen_id.to_string(), reply))?;
        await_reply(&rx, "navigate")
    }

    /// Show the start screen, cursor untouched
    pub fn show_start_screen(&self) -> Result<String> {
        let (reply, rx) = bounded(1);
        self.send(Command::ShowStart(reply))?;
        await_reply(&rx, "reset to start screen")
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status.read().clone()
    }
}

fn await_reply(rx: &Receiver<Result<String>>, what: &str) -> Result<String> {
    rx.recv_timeout(REPLY_TIMEOUT)
        .map_err(|_| Error::timeout(what, REPLY_TIMEOUT.as_millis() as u64))?
}
