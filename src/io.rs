use std::path::{Path, PathBuf};

use tracing::debug;

use crate::result::{bail, Result};

/// Find an output path under `out_dir` that does not collide with an
/// existing file, appending a ` (n)` counter when needed.
pub fn find_unused_path(out_dir: &Path, stem: &str, extension: &str) -> Result<PathBuf> {
    let mut output = out_dir.to_path_buf();

    // Format for 1st file: <stem>.<ext>
    output.push(format!("{stem}.{extension}"));
    if !output.exists() {
        return Ok(output);
    }

    // Format for 2nd file and up: <stem> (<count>).<ext>
    for n in 2u16.. {
        output.set_file_name(format!("{stem} ({n}).{extension}"));
        if !output.exists() {
            return Ok(output);
        }
    }

    bail("Code is broken or you have really REALLY too much files with the same name")
}

/// Move a file, falling back to a copy when `rename` crosses filesystems.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_err() {
        debug!("Moving file failed, falling back to copying");
        std::fs::copy(from, to)?;
    }
    Ok(())
}
