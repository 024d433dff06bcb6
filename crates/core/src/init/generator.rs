//! Directory structure and file generation for `.summoner-kit/`.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for initializing a `.summoner-kit/` directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Directory under which `.summoner-kit/` is created.
    pub target_dir: PathBuf,

    /// Overwrite an existing `.summoner-kit/` directory.
    pub force: bool,

    /// Scaffold only `config.toml` and one agent.
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate a complete `.summoner-kit/` structure from the embedded
/// templates:
///
/// ```text
/// .summoner-kit/
/// ├── config.toml
/// ├── agents/
/// │   ├── scout.yaml
/// │   └── sentinel.yaml   (unless minimal)
/// └── teams/
///     └── survey.yaml     (unless minimal)
/// ```
///
/// # Errors
///
/// Returns [`InitError::DirectoryExists`] when the directory exists and
/// `force` is off, or an I/O variant when scaffolding fails.
pub async fn generate_summoner_kit_structure(options: InitOptions) -> InitResult<()> {
    let kit_dir = options.target_dir.join(".summoner-kit");

    if kit_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(kit_dir));
    }

    for sub in ["agents", "teams"] {
        let path = kit_dir.join(sub);
        fs::create_dir_all(&path).map_err(|source| InitError::DirectoryCreate { path, source })?;
    }

    write_template_file(&kit_dir, "config.toml")?;

    if options.minimal {
        write_template_file(&kit_dir, "agents/scout.yaml")?;
    } else {
        for path in list_templates("agents/") {
            write_template_file(&kit_dir, &path)?;
        }
        for path in list_templates("teams/") {
            write_template_file(&kit_dir, &path)?;
        }
    }

    Ok(())
}

fn write_template_file(kit_dir: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = kit_dir.join(template_path);
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path,
        source,
    })
}
