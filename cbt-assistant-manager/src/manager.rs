use cbt_assistant_agent::{ChatOrchestrator, OrchestratorSettings};
use cbt_assistant_core::config::ServerConfig;
use cbt_assistant_core::{ConversationSession, Error};
use cbt_assistant_providers::LLMProvider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::{ManagerCommand, SessionCommand};

/// Bounds on the conversations a [`Manager`] keeps alive
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    /// A worker with no commands for this long exits and forgets its history
    pub idle_timeout: Duration,
    /// Chats that would start a conversation beyond this are refused
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(1800),
            max_sessions: 1024,
        }
    }
}

impl SessionLimits {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            idle_timeout: Duration::from_secs(config.session_idle_secs),
            max_sessions: config.max_sessions,
        }
    }
}

/// Routes API commands to one worker task per conversation.
///
/// Each worker exclusively owns its [`ChatOrchestrator`] and handles commands
/// in arrival order, so a chat turn (append, provider call, append) never
/// interleaves with another command on the same session. Different sessions
/// proceed concurrently.
///
/// Only a chat starts a worker. Reads and resets of a session without one are
/// answered from a freshly seeded history. Idle workers exit and report back
/// on `evicted_rx` so their entry is dropped.
pub struct Manager {
    api_rx: mpsc::Receiver<ManagerCommand>,
    evicted_tx: mpsc::UnboundedSender<String>,
    evicted_rx: mpsc::UnboundedReceiver<String>,
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    settings: OrchestratorSettings,
    limits: SessionLimits,
    sessions: HashMap<String, mpsc::UnboundedSender<SessionCommand>>,
}

impl Manager {
    pub fn new(
        api_rx: mpsc::Receiver<ManagerCommand>,
        provider: Arc<dyn LLMProvider>,
        system_prompt: impl Into<String>,
        settings: OrchestratorSettings,
    ) -> Self {
        let (evicted_tx, evicted_rx) = mpsc::unbounded_channel();
        Self {
            api_rx,
            evicted_tx,
            evicted_rx,
            provider,
            system_prompt: system_prompt.into(),
            settings,
            limits: SessionLimits::default(),
            sessions: HashMap::new(),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Manager loop started");

        loop {
            tokio::select! {
                msg = self.api_rx.recv() => {
                    match msg {
                        Some(ManagerCommand { session_id, command }) => {
                            self.route(session_id, command);
                        }
                        None => break,
                    }
                }
                Some(session_id) = self.evicted_rx.recv() => {
                    self.forget(&session_id);
                }
            }
        }

        info!("Manager channel closed, stopping loop");
        Ok(())
    }

    fn route(&mut self, session_id: String, command: SessionCommand) {
        if self
            .sessions
            .get(&session_id)
            .is_some_and(|tx| tx.is_closed())
        {
            self.sessions.remove(&session_id);
        }

        let Some(worker) = self.sessions.get(&session_id).cloned() else {
            self.route_unstarted(session_id, command);
            return;
        };

        if let Err(mpsc::error::SendError(command)) = worker.send(command) {
            // The worker closed between the check above and the send.
            warn!("Session worker {} is gone, restarting it", session_id);
            self.sessions.remove(&session_id);
            self.route_unstarted(session_id, command);
        }
    }

    fn route_unstarted(&mut self, session_id: String, command: SessionCommand) {
        match command {
            SessionCommand::Conversation { reply } => {
                let fresh = ConversationSession::new(self.system_prompt.clone());
                let _ = reply.send(fresh.snapshot());
            }
            SessionCommand::Reset { reply } => {
                let _ = reply.send(());
            }
            SessionCommand::Chat { message, reply } => {
                if self.sessions.len() >= self.limits.max_sessions {
                    self.sessions.retain(|_, tx| !tx.is_closed());
                }
                if self.sessions.len() >= self.limits.max_sessions {
                    warn!(
                        "Refusing session {}: {} conversations active",
                        session_id,
                        self.sessions.len()
                    );
                    let _ = reply.send(Err(Error::Unavailable(
                        "too many active conversations".to_string(),
                    )));
                    return;
                }

                let worker = self.spawn_worker(&session_id);
                if worker.send(SessionCommand::Chat { message, reply }).is_err() {
                    warn!("Dropping command for session {}", session_id);
                }
            }
        }
    }

    fn spawn_worker(&mut self, session_id: &str) -> mpsc::UnboundedSender<SessionCommand> {
        debug!("Starting worker for session {}", session_id);
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = ChatOrchestrator::new(
            self.provider.clone(),
            self.system_prompt.clone(),
            self.settings.clone(),
        );
        tokio::spawn(run_session_worker(
            session_id.to_string(),
            orchestrator,
            rx,
            self.limits.idle_timeout,
            self.evicted_tx.clone(),
        ));
        self.sessions.insert(session_id.to_string(), tx.clone());
        tx
    }

    /// Drop the entry for an exited worker. A replacement started since then
    /// is left alone.
    fn forget(&mut self, session_id: &str) {
        if self
            .sessions
            .get(session_id)
            .is_some_and(|tx| tx.is_closed())
        {
            self.sessions.remove(session_id);
            debug!("Session {} evicted", session_id);
        }
    }
}

async fn run_session_worker(
    session_id: String,
    mut orchestrator: ChatOrchestrator,
    mut rx: mpsc::UnboundedReceiver<SessionCommand>,
    idle_timeout: Duration,
    evicted_tx: mpsc::UnboundedSender<String>,
) {
    loop {
        match tokio::time::timeout(idle_timeout, rx.recv()).await {
            Ok(Some(command)) => {
                handle_command(&session_id, &mut orchestrator, command).await;
            }
            Ok(None) => break,
            Err(_) => {
                info!("Session {} idle for {:?}, evicting", session_id, idle_timeout);
                rx.close();
                // Commands queued before the close still get an answer.
                while let Ok(command) = rx.try_recv() {
                    handle_command(&session_id, &mut orchestrator, command).await;
                }
                break;
            }
        }
    }

    let _ = evicted_tx.send(session_id.clone());
    debug!("Session {} worker stopped", session_id);
}

async fn handle_command(
    session_id: &str,
    orchestrator: &mut ChatOrchestrator,
    command: SessionCommand,
) {
    match command {
        SessionCommand::Chat { message, reply } => {
            debug!("Session {}: chat turn", session_id);
            let result = orchestrator.send(message).await;
            let _ = reply.send(result);
        }
        SessionCommand::Reset { reply } => {
            info!("Session {}: conversation reset", session_id);
            orchestrator.reset();
            let _ = reply.send(());
        }
        SessionCommand::Conversation { reply } => {
            let _ = reply.send(orchestrator.snapshot());
        }
    }
}
