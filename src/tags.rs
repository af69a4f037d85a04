use crate::host::HostProbe;
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Build a single ` key=value` tag token.
///
/// An empty key is a hard error; an empty or whitespace-only value is
/// silently dropped. The asymmetry is deliberate: callers always pass
/// literal keys, while values come from the environment and are often
/// legitimately absent. Spaces in the value become underscores.
pub fn add_tag(key: &str, value: &str) -> Result<Option<String>> {
    if key.is_empty() {
        bail!("Tag key must not be empty");
    }
    if value.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(format!(" {}={}", key, value.replace(' ', "_"))))
}

/// Tag whose value is a file's content. The caller opted into this source,
/// so a missing or unreadable file is a hard error. An empty key defaults
/// to the file name.
pub async fn tag_from_file(
    probe: &dyn HostProbe,
    path: &Path,
    key: &str,
) -> Result<Option<String>> {
    let value = probe
        .read_file(path)
        .await
        .with_context(|| format!("Failed to read tag source {}", path.display()))?;

    let key = if key.is_empty() {
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    } else {
        key.to_string()
    };

    add_tag(&key.replace(' ', "_"), value.trim())
}

/// Tag whose value is a command's output. A missing or failing command is
/// a hard error.
pub async fn tag_from_cmd(
    probe: &dyn HostProbe,
    key: &str,
    program: &str,
    args: &[&str],
) -> Result<Option<String>> {
    let value = probe
        .command_output(program, args)
        .await
        .with_context(|| format!("Failed to run tag command {program}"))?;
    add_tag(&key.replace(' ', "_"), value.trim())
}
