//! # Session Module
//!
//! Process-local state owned by the shell controller, plus the form values the page
//! collects. Nothing here is persisted; every field is last-write-wins.

use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Sample geometry shipped next to the engine.
pub const DEFAULT_GEOMETRY_PATH: &str = "tet.ply";

/// Sample scaffold sequence. The engine treats this name as "use the built-in M13 scaffold".
pub const DEFAULT_SEQUENCE_PATH: &str = "M13.txt";

/// Status text shown while the engine works on a submission.
pub const PROCESSING_STATUS: &str = "Processing...";

/// DNA-origami helix geometry styles the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum HelicalForm {
    #[value(name = "Bform")]
    Bform,
    #[value(name = "Aform")]
    Aform,
    #[value(name = "Hybrid")]
    Hybrid,
    #[value(name = "Twisted")]
    Twisted,
}

impl HelicalForm {
    pub const ALL: [HelicalForm; 4] = [
        HelicalForm::Bform,
        HelicalForm::Aform,
        HelicalForm::Hybrid,
        HelicalForm::Twisted,
    ];

    /// Parses a wire tag. Only the exact tags are recognized.
    ///
    /// # Example
    ///
    /// ```rust
    /// use daedalus_shell::session::HelicalForm;
    ///
    /// assert_eq!(HelicalForm::from_tag("Hybrid"), Some(HelicalForm::Hybrid));
    /// assert_eq!(HelicalForm::from_tag("bform"), None);
    /// ```
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Bform" => Some(HelicalForm::Bform),
            "Aform" => Some(HelicalForm::Aform),
            "Hybrid" => Some(HelicalForm::Hybrid),
            "Twisted" => Some(HelicalForm::Twisted),
            _ => None,
        }
    }

    /// The tag sent to the engine and used by the form control.
    pub fn tag(&self) -> &'static str {
        match self {
            HelicalForm::Bform => "Bform",
            HelicalForm::Aform => "Aform",
            HelicalForm::Hybrid => "Hybrid",
            HelicalForm::Twisted => "Twisted",
        }
    }

    fn image_file_name(&self) -> &'static str {
        match self {
            HelicalForm::Bform => "DX_Bform.png",
            HelicalForm::Aform => "DX_Aform.png",
            HelicalForm::Hybrid => "DX_Hform.png",
            HelicalForm::Twisted => "DX_Altform.png",
        }
    }

    /// Illustration of the crossover layout for this form.
    pub fn image_path(&self, images_dir: &Path) -> PathBuf {
        images_dir.join(self.image_file_name())
    }
}

impl fmt::Display for HelicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Shell-side state: the two selected files and the last helical form the page reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub geometry_path: String,
    pub sequence_path: String,
    pub helical_form: Option<String>,
}

impl Session {
    pub fn new(geometry_path: impl Into<String>, sequence_path: impl Into<String>) -> Self {
        Self {
            geometry_path: geometry_path.into(),
            sequence_path: sequence_path.into(),
            helical_form: None,
        }
    }

    pub fn set_geometry_path(&mut self, path: impl Into<String>) {
        self.geometry_path = path.into();
    }

    pub fn set_sequence_path(&mut self, path: impl Into<String>) {
        self.sequence_path = path.into();
    }

    pub fn set_helical_form(&mut self, tag: impl Into<String>) {
        self.helical_form = Some(tag.into());
    }

    /// Combines the submitted form values with the selected files.
    pub fn calc_request(&self, fields: FormFields) -> CalcRequest {
        CalcRequest {
            project_name: fields.project_name,
            helical_form: fields.helical_form,
            helical_turns: fields.helical_turns,
            geometry_path: self.geometry_path.clone(),
            sequence_path: self.sequence_path.clone(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_GEOMETRY_PATH, DEFAULT_SEQUENCE_PATH)
    }
}

/// The three values read from the form on submit, exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormFields {
    pub project_name: String,
    pub helical_form: String,
    pub helical_turns: String,
}

/// One `calc` invocation on the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcRequest {
    pub project_name: String,
    pub helical_form: String,
    pub helical_turns: String,
    pub geometry_path: String,
    pub sequence_path: String,
}

impl CalcRequest {
    /// Positional parameters in the order the engine's `calc` expects them.
    pub fn params(&self) -> [&str; 5] {
        [
            &self.project_name,
            &self.helical_form,
            &self.helical_turns,
            &self.geometry_path,
            &self.sequence_path,
        ]
    }
}
