//! Save and reload a project as pretty-printed JSON.

use std::path::Path;

use thiserror::Error;

use crate::project::{Project, ProjectError};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("project file is not valid JSON")]
    Json(#[from] serde_json::Error),
    #[error("project file is inconsistent")]
    Invalid(#[from] ProjectError),
}

/// Write `project` to `path`, creating parent directories as needed
pub fn save_project(path: &Path, project: &Project) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(path, json).map_err(io_err)?;
    log::info!("saved project with {} tracks to {}", project.tracks().len(), path.display());
    Ok(())
}

pub fn load_project(path: &Path) -> Result<Project, PersistenceError> {
    let data = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_json(&data)
}

/// Parse and validate a project document
pub fn from_json(data: &str) -> Result<Project, PersistenceError> {
    let mut project: Project = serde_json::from_str(data)?;
    project.validate()?;
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::InstrumentId;

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("agentic-seq-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn saved_project_loads_back_equal() {
        let mut project = Project::new(["C5", "B4", "A4"], 16).unwrap();
        let id = project.add_track().unwrap();
        project.toggle_cell(id, 2, 7, None).unwrap();
        project.set_velocity(id, 2, 7, 0.3).unwrap();
        project.set_tempo(96.0).unwrap();

        let path = scratch("roundtrip/project.json");
        save_project(&path, &project).unwrap();
        let loaded = load_project(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, project);
        assert!((loaded.track(id).unwrap().pattern.cell(2, 7).unwrap().velocity - 0.3).abs() < 1e-6);
    }

    #[test]
    fn unknown_instrument_falls_back() {
        let mut project = Project::new(["C4"], 16).unwrap();
        project.add_track().unwrap();
        let json = serde_json::to_string(&project).unwrap().replace("\"keys\"", "\"theremin\"");

        let loaded = from_json(&json).unwrap();
        assert_eq!(loaded.tracks()[0].instrument, InstrumentId::Other);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_project(&scratch("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(from_json("{ not json"), Err(PersistenceError::Json(_))));
    }

    #[test]
    fn largest_track_id_is_rejected_not_wrapped() {
        let mut project = Project::new(["C4"], 16).unwrap();
        project.add_track().unwrap();
        let json = serde_json::to_string(&project)
            .unwrap()
            .replace("\"id\":0", &format!("\"id\":{}", u32::MAX));

        assert!(matches!(
            from_json(&json),
            Err(PersistenceError::Invalid(ProjectError::IdsExhausted))
        ));
    }

    #[test]
    fn hand_edited_rows_are_checked() {
        let mut project = Project::new(["C4", "D4"], 16).unwrap();
        project.add_track().unwrap();
        let json = serde_json::to_string(&project).unwrap();

        let duplicate = json.replace("\"D4\"", "\"C4\"");
        assert!(matches!(
            from_json(&duplicate),
            Err(PersistenceError::Invalid(ProjectError::DuplicateRow(r))) if r == "C4"
        ));

        let unparseable = json.replace("\"D4\"", "\"Q9\"");
        assert!(matches!(
            from_json(&unparseable),
            Err(PersistenceError::Invalid(ProjectError::BadRow(r))) if r == "Q9"
        ));
    }
}
