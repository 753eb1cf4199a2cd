//! Rendered output artifacts.

use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

/// Generate a collision-resistant output file name (`output_<hex>.mp4`).
pub fn output_file_name() -> String {
    format!("output_{}.mp4", Uuid::new_v4().simple())
}

/// A rendered video on local disk and the URL it is served under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputArtifact {
    pub file_name: String,
    /// Path relative to the working directory, e.g. `videos/output_ab12.mp4`
    pub path: PathBuf,
    pub url: String,
    /// Timeline duration in seconds
    pub duration: f64,
}

impl OutputArtifact {
    pub fn path_string(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}
