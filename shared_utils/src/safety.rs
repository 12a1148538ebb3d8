//! Safety Module
//!
//! Refuses to mirror protected system directories or a whole home directory,
//! since the build tree is written next to the input.

use std::path::Path;

const PROTECTED_DIRS: &[&str] = &[
    "/",
    "/System",
    "/usr",
    "/bin",
    "/sbin",
    "/etc",
    "/var",
    "/Library",
    "/Applications",
    "/Users",
    "/home",
    "/root",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/opt",
];

/// `Err` with a user-facing explanation when `path` is unsafe to mirror.
pub fn check_dangerous_directory(path: &Path) -> Result<(), String> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    if canonical.parent().is_none() || PROTECTED_DIRS.iter().any(|d| canonical == Path::new(d)) {
        return Err(format!(
            "🚨 DANGEROUS OPERATION BLOCKED!\n\
             ❌ '{}' is a protected system directory.\n\
             💡 Point the tool at the folder that holds your textures instead.",
            canonical.display()
        ));
    }

    // /home/<user> or /Users/<user>
    let is_home_root = canonical.components().count() == 3
        && (canonical.starts_with("/home") || canonical.starts_with("/Users"));
    if is_home_root {
        return Err(format!(
            "🚨 DANGEROUS OPERATION BLOCKED!\n\
             ❌ '{}' is a home directory root.\n\
             💡 Point the tool at a subdirectory such as ~/mods/textures instead.",
            canonical.display()
        ));
    }

    Ok(())
}
