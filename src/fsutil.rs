//! Small filesystem utilities.

use std::path::Path;

use crate::{CollectError, CollectResult};

/// Reads a required artifact; absence is reported as `MissingArtifact`.
pub fn read_artifact(path: &Path) -> CollectResult<String> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(CollectError::MissingArtifact {
                path: path.to_path_buf(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Checks the invocation preconditions before any artifact is parsed.
///
/// The input must be an existing directory. The output must not exist,
/// unless `append` is set, in which case an existing output has to be a
/// regular file.
pub fn validate_paths(input: &Path, output: &Path, append: bool) -> CollectResult<()> {
    if !input.exists() {
        return Err(CollectError::Config(format!(
            "input directory '{}' does not exist",
            input.display()
        )));
    }
    if !input.is_dir() {
        return Err(CollectError::Config(format!(
            "is not a directory: '{}'",
            input.display()
        )));
    }
    if output.exists() {
        if !append {
            return Err(CollectError::Config(format!(
                "output file '{}' already exists",
                output.display()
            )));
        }
        if !output.is_file() {
            return Err(CollectError::Config(format!(
                "output path '{}' is not a regular file",
                output.display()
            )));
        }
    }
    Ok(())
}
