//! Typed messages exchanged between the shell controller and the page view.

use crate::session::{CalcRequest, FormFields};

/// Page to shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMessage {
    /// A freshly created page asks for the current session so its cells match.
    PageLoaded,
    /// The "select geometry" button was clicked.
    OpenGeometryDialog,
    /// The "select sequence" button was clicked.
    OpenSequenceDialog,
    /// The helical form selector changed to this tag.
    HelicalFormChanged(String),
    /// The form was submitted.
    SubmitForm(FormFields),
    /// Stop the controller thread.
    Shutdown,
}

/// Shell to page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageMessage {
    GeometryPathUpdated(String),
    SequencePathUpdated(String),
    /// Image key for the illustration; unknown keys are ignored by the page.
    HelicalFormUpdated(String),
    /// The submission was accepted; the page owns the engine call from here.
    ProcessingStarted {
        status: String,
        request: CalcRequest,
    },
}
