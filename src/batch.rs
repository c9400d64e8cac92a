//! Batch submission: one `calc` job per PLY file in a directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::session::{CalcRequest, HelicalForm};

/// Parameters shared by every job in a batch.
#[derive(Debug, Clone)]
pub struct BatchTemplate {
    pub helical_form: HelicalForm,
    pub helical_turns: u32,
    pub sequence_path: String,
}

/// Lists `.ply` files in `dir`, sorted by name. Subdirectories are skipped.
pub fn ply_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        let is_ply = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ply"));
        if path.is_file() && is_ply {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Builds one request per PLY file; each project is named after its file stem.
pub fn ply_jobs(dir: &Path, template: &BatchTemplate) -> Result<Vec<CalcRequest>> {
    let jobs = ply_files(dir)?
        .into_iter()
        .map(|path| CalcRequest {
            project_name: path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            helical_form: template.helical_form.tag().to_string(),
            helical_turns: template.helical_turns.to_string(),
            geometry_path: path.to_string_lossy().into_owned(),
            sequence_path: template.sequence_path.clone(),
        })
        .collect();
    Ok(jobs)
}
