use crate::errors::{invalid_path, Result};
use netvault_core::model::METADATA_DIR;
use std::path::{Component, Path};

/// Check that `relative` names a file inside the working tree
///
/// Rejects absolute paths, `.`/`..` components and anything under the
/// version-control metadata directory.
pub fn validate_relative(relative: &Path) -> Result<()> {
    let mut components = relative.components().peekable();
    if components.peek().is_none() {
        return Err(invalid_path(relative, "path is empty"));
    }

    for (index, component) in components.enumerate() {
        match component {
            Component::Normal(name) => {
                if index == 0 && name == METADATA_DIR {
                    return Err(invalid_path(relative, "path is inside the metadata directory"));
                }
            }
            _ => return Err(invalid_path(relative, "path must be relative and normalized")),
        }
    }
    Ok(())
}
