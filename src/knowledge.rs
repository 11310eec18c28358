//! Static project knowledge injected into chat prompts.

use std::path::{Path, PathBuf};

/// Loads the knowledge excerpt from `configured`, then from the working directory.
///
/// Returns `None` when no candidate exists or every candidate is blank.
pub fn load_knowledge(configured: &Path) -> Option<String> {
    let mut candidates: Vec<PathBuf> = vec![configured.to_path_buf()];
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(name) = configured.file_name() {
            let local = cwd.join(name);
            if local != configured {
                candidates.push(local);
            }
        }
    }

    for path in &candidates {
        match fs_err::read_to_string(path) {
            Ok(content) => {
                let content = content.trim();
                if !content.is_empty() {
                    log::info!("[KNOWLEDGE] Loaded {} ({} chars)", path.display(), content.chars().count());
                    return Some(content.to_string());
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => log::error!("[KNOWLEDGE] {}", e),
        }
    }

    log::warn!("[KNOWLEDGE] No knowledge excerpt found");
    None
}
