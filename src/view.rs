//! # Page View
//!
//! [`PageState`] is the view model: what the form shows and how it reacts to
//! [`PageMessage`]s and to the outcome of an engine call. [`CallSlot`] tracks the one
//! engine call the page may be waiting on. [`PageApp`] renders the state with egui and
//! forwards user actions to the shell.

use std::{cell::Cell, path::PathBuf, rc::Rc, time::Duration};

use egui::{CentralPanel, ComboBox, Context, Grid, Image, RichText, Ui, ViewportCommand};

use crate::{
    controller::ShellHandle,
    error::RpcError,
    helper::{
        ioapi::{ControlListener, IoApiCommand},
        rpc_client::{CancellationToken, PendingCall, RpcClient},
        xmlrpc::Value,
    },
    message::{PageMessage, ShellMessage},
    session::{CalcRequest, FormFields, HelicalForm, Session},
};

pub const SUCCESS_STATUS: &str = "Success!";
pub const FAILURE_STATUS: &str = "Fail!";

const REPAINT_INTERVAL: Duration = Duration::from_millis(100);
const IMAGE_HEIGHT: f32 = 80.0;

/// Everything the page displays.
#[derive(Debug, Clone, PartialEq)]
pub struct PageState {
    pub project_name: String,
    pub helical_form: HelicalForm,
    pub helical_turns: String,
    pub geometry_cell: String,
    pub sequence_cell: String,
    pub status: String,
    /// Why the last call failed, shown under the status text.
    pub status_detail: Option<String>,
    pub image: PathBuf,
    images_dir: PathBuf,
}

impl PageState {
    pub fn new(session: &Session, images_dir: impl Into<PathBuf>) -> Self {
        let images_dir = images_dir.into();
        let helical_form = HelicalForm::Bform;
        Self {
            project_name: String::new(),
            helical_form,
            helical_turns: String::new(),
            geometry_cell: session.geometry_path.clone(),
            sequence_cell: session.sequence_path.clone(),
            status: String::new(),
            status_detail: None,
            image: helical_form.image_path(&images_dir),
            images_dir,
        }
    }

    /// The three values read on submit.
    pub fn form_fields(&self) -> FormFields {
        FormFields {
            project_name: self.project_name.clone(),
            helical_form: self.helical_form.tag().to_string(),
            helical_turns: self.helical_turns.clone(),
        }
    }

    /// Applies a shell notification. Returns the engine request to dispatch, if any.
    pub fn apply(&mut self, message: PageMessage) -> Option<CalcRequest> {
        match message {
            PageMessage::GeometryPathUpdated(path) => {
                self.geometry_cell = path;
                None
            }
            PageMessage::SequencePathUpdated(path) => {
                self.sequence_cell = path;
                None
            }
            PageMessage::HelicalFormUpdated(tag) => {
                // The selector and the illustration always show the same form.
                match HelicalForm::from_tag(&tag) {
                    Some(form) => {
                        self.helical_form = form;
                        self.image = form.image_path(&self.images_dir);
                    }
                    None => tracing::debug!("Ignoring unknown helical form {:?}", tag),
                }
                None
            }
            PageMessage::ProcessingStarted { status, request } => {
                self.status = status;
                self.status_detail = None;
                Some(request)
            }
        }
    }

    /// Records the outcome of the engine call. The reply body itself is not shown.
    pub fn finish_call(&mut self, result: Result<Value, RpcError>) {
        match result {
            Ok(_) => {
                self.status = SUCCESS_STATUS.to_string();
                self.status_detail = None;
            }
            Err(e) => {
                self.status = FAILURE_STATUS.to_string();
                self.status_detail = Some(e.to_string());
            }
        }
    }
}

/// The engine call the page is waiting on, if any.
///
/// Dispatching while a call is pending cancels the older call; its result is never
/// shown. Dropping the slot cancels whatever is still in flight.
#[derive(Debug, Default)]
pub struct CallSlot {
    pending: Option<PendingCall>,
    token: CancellationToken,
}

impl CallSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts `request` on a worker thread, superseding any pending call.
    pub fn dispatch(&mut self, client: &RpcClient, request: CalcRequest) {
        if self.pending.take().is_some() {
            tracing::info!("Superseding the previous engine call");
            self.token.cancel();
        }
        self.token = CancellationToken::new();
        self.pending = Some(client.spawn_calc(request, self.token.clone()));
    }

    /// Cancels the pending call. The next [`CallSlot::poll`] reports it as failed.
    pub fn cancel(&self) {
        if self.pending.is_some() {
            tracing::info!("Engine call cancelled by user");
            self.token.cancel();
        }
    }

    /// Moves a finished call's outcome into `state`. Returns `true` if a call finished.
    pub fn poll(&mut self, state: &mut PageState) -> bool {
        let Some(result) = self.pending.as_ref().and_then(PendingCall::poll) else {
            return false;
        };
        self.pending = None;
        state.finish_call(result);
        true
    }
}

impl Drop for CallSlot {
    fn drop(&mut self) {
        if self.pending.take().is_some() {
            tracing::info!("Page closed, cancelling in-flight engine call");
            self.token.cancel();
        }
    }
}

/// Connection to the single-instance control channel while a window is open.
pub struct ResidentLink {
    pub control: Rc<ControlListener>,
    /// Set when another launch asked this instance to exit.
    pub quit_requested: Rc<Cell<bool>>,
}

/// The eframe application for one window.
pub struct PageApp {
    state: PageState,
    shell: Rc<ShellHandle>,
    client: RpcClient,
    call: CallSlot,
    link: Option<ResidentLink>,
    shell_gone: bool,
}

impl PageApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        state: PageState,
        shell: Rc<ShellHandle>,
        client: RpcClient,
        link: Option<ResidentLink>,
    ) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let app = Self {
            state,
            shell,
            client,
            call: CallSlot::new(),
            link,
            shell_gone: false,
        };
        app.send(ShellMessage::PageLoaded);
        app
    }

    fn send(&self, message: ShellMessage) {
        if let Err(e) = self.shell.send(message) {
            tracing::error!("Cannot reach shell: {}", e);
        }
    }

    fn drain_shell_messages(&mut self) {
        if self.shell_gone {
            return;
        }
        loop {
            match self.shell.poll_events() {
                Ok(Some(message)) => {
                    if let Some(request) = self.state.apply(message) {
                        self.call.dispatch(&self.client, request);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Shell channel closed: {}", e);
                    self.shell_gone = true;
                    break;
                }
            }
        }
    }

    fn handle_control_commands(&self, ctx: &Context) {
        let Some(link) = &self.link else {
            return;
        };
        while let Ok(Some(command)) = link.control.try_next() {
            match command {
                IoApiCommand::Activate => ctx.send_viewport_cmd(ViewportCommand::Focus),
                IoApiCommand::Quit => {
                    link.quit_requested.set(true);
                    ctx.send_viewport_cmd(ViewportCommand::Close);
                }
            }
        }
    }
}

/// What the user did during one frame.
#[derive(Default)]
struct FrameActions {
    outgoing: Vec<ShellMessage>,
    cancel_requested: bool,
}

fn show_form(ui: &mut Ui, state: &mut PageState, is_pending: bool) -> FrameActions {
    let mut actions = FrameActions::default();

    ui.heading("DAEDALUS");
    ui.add_space(8.0);

    Grid::new("calc_form")
        .num_columns(2)
        .spacing([12.0, 8.0])
        .show(ui, |ui| {
            ui.label("Project name");
            ui.text_edit_singleline(&mut state.project_name);
            ui.end_row();

            ui.label("Helical form");
            let before = state.helical_form;
            ComboBox::from_id_salt("helical_form")
                .selected_text(before.tag())
                .show_ui(ui, |ui| {
                    for form in HelicalForm::ALL {
                        ui.selectable_value(&mut state.helical_form, form, form.tag());
                    }
                });
            if state.helical_form != before {
                actions.outgoing.push(ShellMessage::HelicalFormChanged(
                    state.helical_form.tag().to_string(),
                ));
            }
            ui.end_row();

            ui.label("Helical turns");
            ui.text_edit_singleline(&mut state.helical_turns);
            ui.end_row();

            if ui.button("Select PLY file").clicked() {
                actions.outgoing.push(ShellMessage::OpenGeometryDialog);
            }
            ui.label(state.geometry_cell.as_str());
            ui.end_row();

            if ui.button("Select sequence file").clicked() {
                actions.outgoing.push(ShellMessage::OpenSequenceDialog);
            }
            ui.label(state.sequence_cell.as_str());
            ui.end_row();
        });

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui.button("Submit").clicked() {
            actions.outgoing.push(ShellMessage::SubmitForm(state.form_fields()));
        }
        if is_pending && ui.button("Cancel").clicked() {
            actions.cancel_requested = true;
        }
    });

    ui.add_space(8.0);
    ui.label(state.status.as_str());
    if let Some(detail) = &state.status_detail {
        ui.label(RichText::new(detail.as_str()).weak());
    }

    ui.add_space(8.0);
    ui.add(Image::new(format!("file://{}", state.image.display())).max_height(IMAGE_HEIGHT));

    actions
}

impl eframe::App for PageApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.handle_control_commands(ctx);
        self.drain_shell_messages();
        self.call.poll(&mut self.state);

        let is_pending = self.call.is_pending();
        let actions = CentralPanel::default()
            .show(ctx, |ui| show_form(ui, &mut self.state, is_pending))
            .inner;

        for message in actions.outgoing {
            self.send(message);
        }
        if actions.cancel_requested {
            self.call.cancel();
        }

        // Dialog results and engine replies arrive off-thread.
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}
