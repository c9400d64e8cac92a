//! # Shell Controller
//!
//! The controller owns the [`Session`] and reacts to [`ShellMessage`]s coming from the
//! page. It never talks to the engine; its only job on submit is to hand the page a
//! complete [`crate::session::CalcRequest`].
//!
//! [`Shell`] is the pure handler. [`ShellHandle`] runs it on a dedicated thread so a
//! blocking native file dialog does not freeze rendering.

use std::{
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread::JoinHandle,
};

use crate::{
    error::PollEventError,
    helper::file_dialog::FileDialog,
    message::{PageMessage, ShellMessage},
    session::{PROCESSING_STATUS, Session},
};

/// Message handler for the shell side.
pub struct Shell<D: FileDialog> {
    session: Session,
    dialog: D,
}

impl<D: FileDialog> Shell<D> {
    pub fn new(session: Session, dialog: D) -> Self {
        Self { session, dialog }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Handles one message and returns what must be sent back to the page, in order.
    pub fn handle(&mut self, message: ShellMessage) -> Vec<PageMessage> {
        match message {
            ShellMessage::PageLoaded => {
                let mut replies = vec![
                    PageMessage::GeometryPathUpdated(self.session.geometry_path.clone()),
                    PageMessage::SequencePathUpdated(self.session.sequence_path.clone()),
                ];
                if let Some(tag) = &self.session.helical_form {
                    replies.push(PageMessage::HelicalFormUpdated(tag.clone()));
                }
                replies
            }
            ShellMessage::OpenGeometryDialog => {
                match self.dialog.pick_file("Select geometry (PLY) file") {
                    Some(path) => {
                        let path = path.to_string_lossy().into_owned();
                        tracing::info!("Geometry file selected: {}", path);
                        self.session.set_geometry_path(path.clone());
                        vec![PageMessage::GeometryPathUpdated(path)]
                    }
                    None => vec![],
                }
            }
            ShellMessage::OpenSequenceDialog => {
                match self.dialog.pick_file("Select scaffold sequence file") {
                    Some(path) => {
                        let path = path.to_string_lossy().into_owned();
                        tracing::info!("Sequence file selected: {}", path);
                        self.session.set_sequence_path(path.clone());
                        vec![PageMessage::SequencePathUpdated(path)]
                    }
                    None => vec![],
                }
            }
            ShellMessage::HelicalFormChanged(tag) => {
                tracing::debug!("Helical form changed to {:?}", tag);
                self.session.set_helical_form(tag.clone());
                vec![PageMessage::HelicalFormUpdated(tag)]
            }
            ShellMessage::SubmitForm(fields) => {
                let request = self.session.calc_request(fields);
                tracing::info!(
                    project = %request.project_name,
                    form = %request.helical_form,
                    turns = %request.helical_turns,
                    "Form submitted"
                );
                vec![PageMessage::ProcessingStarted {
                    status: PROCESSING_STATUS.to_string(),
                    request,
                }]
            }
            ShellMessage::Shutdown => vec![],
        }
    }
}

/// Channel-backed handle to a [`Shell`] running on its own thread.
///
/// The session lives as long as the handle, so it survives the window being closed
/// and recreated.
pub struct ShellHandle {
    sender: Sender<ShellMessage>,
    receiver: Receiver<PageMessage>,
    thread: Option<JoinHandle<Session>>,
}

impl ShellHandle {
    pub fn spawn<D>(session: Session, dialog: D) -> Self
    where
        D: FileDialog + Send + 'static,
    {
        let (shell_tx, shell_rx) = mpsc::channel::<ShellMessage>();
        let (page_tx, page_rx) = mpsc::channel::<PageMessage>();

        let thread = std::thread::spawn(move || {
            let mut shell = Shell::new(session, dialog);
            while let Ok(message) = shell_rx.recv() {
                if message == ShellMessage::Shutdown {
                    break;
                }
                for reply in shell.handle(message) {
                    if page_tx.send(reply).is_err() {
                        tracing::warn!("Page channel closed, dropping reply");
                    }
                }
            }
            tracing::debug!("Shell thread exiting");
            shell.into_session()
        });

        Self {
            sender: shell_tx,
            receiver: page_rx,
            thread: Some(thread),
        }
    }

    pub fn send(&self, message: ShellMessage) -> Result<(), PollEventError> {
        self.sender
            .send(message)
            .map_err(|_| PollEventError::ThreadFinished)
    }

    /// Returns the next pending page message without blocking.
    pub fn poll_events(&self) -> Result<Option<PageMessage>, PollEventError> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PollEventError::ThreadFinished),
        }
    }

    /// Blocks for the next page message, up to `timeout`.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Option<PageMessage>, PollEventError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(PollEventError::ThreadFinished),
        }
    }

    /// Stops the controller thread and returns the final session.
    pub fn shutdown(mut self) -> Option<Session> {
        self.stop()
    }

    fn stop(&mut self) -> Option<Session> {
        let thread = self.thread.take()?;
        let _ = self.sender.send(ShellMessage::Shutdown);
        thread.join().ok()
    }
}

impl Drop for ShellHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
