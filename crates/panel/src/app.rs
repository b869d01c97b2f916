//! Panel coordinator: owns the session, store and stream controller and
//! runs one command against them.
//!
//! Failures are reported here and nowhere else. A 401 from any request
//! has already cleared the session inside the client; the coordinator
//! turns that into a single redirect to login instead of an error alert.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use overlay_client::{
    ApiClient, ClientConfig, ClientError, ClientResult, Confirm, OverlayStore, RemoveOutcome,
    SessionContext, SessionEvent, StreamController,
};
use overlay_core::error::CoreError;
use overlay_core::gesture::GestureEvent;
use overlay_core::overlay::{OverlayDraft, Position, Size};
use overlay_core::types::DbId;
use overlay_core::user::RegisterRequest;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::cli::{Command, OverlayCommand, OverlayFieldChanges, OverlayFields, StreamCommand};
use crate::prompt::{self, AssumeYes, Notifier, StdinConfirm, StderrNotifier};
use crate::render;

pub struct App {
    api: Arc<ApiClient>,
    store: OverlayStore,
    stream: StreamController,
    notifier: Box<dyn Notifier>,
    assume_yes: bool,
    events: broadcast::Receiver<SessionEvent>,
}

impl App {
    /// Build the panel with the session persisted at `config.session_file`.
    pub fn new(config: &ClientConfig, assume_yes: bool) -> ClientResult<Self> {
        let session = Arc::new(SessionContext::from_file(config.session_file.clone()));
        Self::with_session(config, session, Box::new(StderrNotifier), assume_yes)
    }

    pub fn with_session(
        config: &ClientConfig,
        session: Arc<SessionContext>,
        notifier: Box<dyn Notifier>,
        assume_yes: bool,
    ) -> ClientResult<Self> {
        let events = session.subscribe();
        let api = Arc::new(ApiClient::new(config, session)?);

        Ok(Self {
            store: OverlayStore::new(Arc::clone(&api)),
            stream: StreamController::new(Arc::clone(&api)),
            api,
            notifier,
            assume_yes,
            events,
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        self.api.session()
    }

    /// Run one command, print its output and report any failure.
    /// Returns `true` on success.
    pub async fn run(&mut self, command: Command) -> bool {
        let action = action(&command);
        let signing_in = matches!(command, Command::Login { .. } | Command::Register { .. });

        let result = self.execute(command).await;
        self.settle(action, signing_in, result)
    }

    async fn execute(&self, command: Command) -> anyhow::Result<String> {
        match command {
            Command::Login { username, password } => {
                let password = read_password(password)?;
                let user = self.api.login(&username, &password).await?;
                Ok(format!("Signed in as {}\n", user.username))
            }
            Command::Register {
                username,
                email,
                password,
            } => {
                let password = read_password(password)?;
                let request = RegisterRequest {
                    username,
                    email,
                    password,
                };
                let user = self.api.register(&request).await?;
                Ok(format!("Account created. Signed in as {}\n", user.username))
            }
            Command::Logout => {
                if self.api.logout()? {
                    Ok("Signed out\n".to_string())
                } else {
                    Ok("Not signed in\n".to_string())
                }
            }
            Command::Whoami => {
                if !self.session().is_authenticated() {
                    return Ok("Not signed in\n".to_string());
                }
                let user = self.api.me().await?;
                Ok(match user.email {
                    Some(email) => format!("{} <{}> (id {})\n", user.username, email, user.id),
                    None => format!("{} (id {})\n", user.username, user.id),
                })
            }
            Command::Overlays(command) => {
                self.load().await?;
                self.overlays(command).await
            }
            Command::Stream(command) => {
                self.load().await?;
                self.stream(command).await
            }
        }
    }

    /// Initial fetch of both collections.
    ///
    /// Other failures only log; a 401 stops the command, since anything it
    /// did next would run against empty state.
    async fn load(&self) -> ClientResult<()> {
        let rejected = self.api.unauthorized_count();
        tokio::join!(self.store.load(), self.stream.load());
        if self.api.unauthorized_count() > rejected {
            return Err(ClientError::Unauthorized);
        }
        Ok(())
    }

    async fn overlays(&self, command: OverlayCommand) -> anyhow::Result<String> {
        match command {
            OverlayCommand::List => Ok(render::overlay_list(&self.store.list().await)),
            OverlayCommand::Show { id } => {
                let overlay = self.store.get(id).await?;
                Ok(format!("{}\n", serde_json::to_string_pretty(&overlay)?))
            }
            OverlayCommand::Add(fields) => {
                let overlay = self.store.create(draft_from_fields(fields)).await?;
                Ok(format!(
                    "Created overlay #{}\n{}\n",
                    overlay.id,
                    render::geometry(&overlay)
                ))
            }
            OverlayCommand::Edit { id, fields } => {
                if fields.is_unchanged() {
                    anyhow::bail!(CoreError::Validation("nothing to change".into()));
                }
                let current = self.store.find(id).await.ok_or(not_found(id))?;
                let mut draft = OverlayDraft::from_overlay(&current);
                fields.apply_to(&mut draft);
                draft.check()?;

                let overlay = self.store.update(id, draft.into()).await?;
                Ok(format!(
                    "Updated overlay #{}\n{}\n",
                    overlay.id,
                    render::geometry(&overlay)
                ))
            }
            OverlayCommand::Move { id, x, y } => {
                let overlay = self
                    .store
                    .reposition(id, Position { x, y })
                    .await?
                    .ok_or(not_found(id))?;
                Ok(format!("{}\n", render::geometry(&overlay)))
            }
            OverlayCommand::Resize { id, width, height } => {
                let overlay = self
                    .store
                    .resize(id, Size { width, height }.clamped())
                    .await?
                    .ok_or(not_found(id))?;
                Ok(format!("{}\n", render::geometry(&overlay)))
            }
            OverlayCommand::Remove { id } => {
                let confirm: &dyn Confirm = if self.assume_yes {
                    &AssumeYes
                } else {
                    &StdinConfirm
                };
                match self.store.remove(id, confirm).await? {
                    RemoveOutcome::Removed => Ok(format!("Deleted overlay #{id}\n")),
                    RemoveOutcome::Cancelled => Ok("Cancelled\n".to_string()),
                }
            }
            OverlayCommand::Gesture { id, file } => self.replay_gesture(id, &file).await,
        }
    }

    /// Feed recorded pointer frames through the store, one JSON event per line.
    async fn replay_gesture(&self, id: DbId, file: &Path) -> anyhow::Result<String> {
        if self.store.find(id).await.is_none() {
            return Err(not_found(id).into());
        }

        let raw = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("reading gesture file {}", file.display()))?;

        let mut out = String::new();
        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event: GestureEvent = serde_json::from_str(line)
                .with_context(|| format!("line {}: not a gesture event", index + 1))?;
            if let Some(overlay) = self.store.apply_gesture(id, event).await? {
                out.push_str(&render::geometry(&overlay));
                out.push('\n');
            }
        }

        if out.is_empty() {
            out.push_str("No completed gesture; nothing saved\n");
        }
        Ok(out)
    }

    async fn stream(&self, command: StreamCommand) -> anyhow::Result<String> {
        match command {
            StreamCommand::Show => {
                let source = self.stream.source().await;
                Ok(render::playback(&source, &self.stream.playback().await))
            }
            StreamCommand::Set { url } => {
                let settings = self.stream.update(&url).await?;
                let playback = self.stream.playback().await;
                Ok(format!(
                    "Stream settings saved\n{}",
                    render::playback(&settings.rtsp_url, &playback)
                ))
            }
            StreamCommand::Status => {
                let status = self.stream.status().await?;
                Ok(format!("{}\n", render::stream_status(&status)))
            }
            StreamCommand::Stop => {
                self.stream.stop().await?;
                Ok("Stream converter stopped\n".to_string())
            }
        }
    }

    /// Print output or report the failure, then redirect at most once if
    /// the session went away during the command.
    fn settle(&mut self, action: &str, signing_in: bool, result: anyhow::Result<String>) -> bool {
        let expired = self.drain_session_events();

        let (ok, unauthorized) = match result {
            Ok(output) => {
                print!("{output}");
                (true, false)
            }
            Err(err) => {
                tracing::error!(action, error = ?err, "Command failed");
                let unauthorized = err
                    .downcast_ref::<ClientError>()
                    .is_some_and(ClientError::is_unauthorized);

                if unauthorized && signing_in {
                    self.notifier.alert("Invalid username or password");
                } else if !unauthorized {
                    self.notifier
                        .alert(&format!("Failed to {action}: {}", describe(&err)));
                }
                (false, unauthorized)
            }
        };

        if (expired || unauthorized) && !signing_in {
            self.notifier.redirect_to_login();
        }
        ok
    }

    /// Consume queued session events; `true` if the session expired.
    fn drain_session_events(&mut self) -> bool {
        let mut expired = false;
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Expired) => expired = true,
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed session events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        expired
    }
}

fn action(command: &Command) -> &'static str {
    match command {
        Command::Login { .. } => "sign in",
        Command::Register { .. } => "register",
        Command::Logout => "sign out",
        Command::Whoami => "load user",
        Command::Overlays(command) => match command {
            OverlayCommand::List => "load overlays",
            OverlayCommand::Show { .. } => "load overlay",
            OverlayCommand::Add(_) => "create overlay",
            OverlayCommand::Edit { .. } => "update overlay",
            OverlayCommand::Move { .. } => "move overlay",
            OverlayCommand::Resize { .. } => "resize overlay",
            OverlayCommand::Remove { .. } => "delete overlay",
            OverlayCommand::Gesture { .. } => "apply gesture",
        },
        Command::Stream(command) => match command {
            StreamCommand::Show => "load stream settings",
            StreamCommand::Set { .. } => "update stream settings",
            StreamCommand::Status => "load stream status",
            StreamCommand::Stop => "stop stream",
        },
    }
}

fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ClientError>() {
        Some(client) => client.user_message(),
        None => match err.downcast_ref::<CoreError>() {
            Some(core) => core.to_string(),
            None => format!("{err:#}"),
        },
    }
}

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "overlay",
        id,
    }
}

fn read_password(password: Option<String>) -> anyhow::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => prompt::ask("Password: ").context("reading password"),
    }
}

fn draft_from_fields(fields: OverlayFields) -> OverlayDraft {
    OverlayDraft {
        overlay_type: fields.kind,
        content: fields.content,
        position_x: fields.x,
        position_y: fields.y,
        width: fields.width,
        height: fields.height,
    }
}

impl OverlayFieldChanges {
    fn is_unchanged(&self) -> bool {
        self.kind.is_none()
            && self.content.is_none()
            && self.x.is_none()
            && self.y.is_none()
            && self.width.is_none()
            && self.height.is_none()
    }

    fn apply_to(self, draft: &mut OverlayDraft) {
        if let Some(kind) = self.kind {
            draft.overlay_type = kind;
        }
        if let Some(content) = self.content {
            draft.content = content;
        }
        if let Some(x) = self.x {
            draft.position_x = x;
        }
        if let Some(y) = self.y {
            draft.position_y = y;
        }
        if let Some(width) = self.width {
            draft.width = width;
        }
        if let Some(height) = self.height {
            draft.height = height;
        }
    }
}
