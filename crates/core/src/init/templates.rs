//! Embedded template files for `.summoner-kit/` initialization.
//!
//! Uses `rust-embed` to embed the project root `templates/` directory into
//! the binary at compile time, so `summoner init` works without external
//! file dependencies.

use rust_embed::RustEmbed;

/// Embedded files from the repository `templates/` directory.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../templates"]
pub struct TemplateAssets;

/// Template file content by relative path (e.g. `"agents/scout.yaml"`).
pub fn get_template(path: &str) -> Option<String> {
    TemplateAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

/// All template paths under a prefix (e.g. `"agents/"`).
pub fn list_templates(prefix: &str) -> Vec<String> {
    TemplateAssets::iter()
        .filter(|path| path.starts_with(prefix))
        .map(|path| path.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_template_embedded() {
        let config = get_template("config.toml").expect("config.toml embedded");
        assert!(config.contains("[runner]"));
    }

    #[test]
    fn test_agent_templates_embedded() {
        let scout = get_template("agents/scout.yaml").expect("scout.yaml embedded");
        assert!(scout.contains("name: scout"));
        assert!(scout.contains("body_basis"));
    }

    #[test]
    fn test_team_template_embedded() {
        let survey = get_template("teams/survey.yaml").expect("survey.yaml embedded");
        assert!(survey.contains("name: survey"));
    }

    #[test]
    fn test_missing_template_is_none() {
        assert!(get_template("nonexistent.txt").is_none());
    }

    #[test]
    fn test_list_agent_templates() {
        let agents = list_templates("agents/");
        assert!(agents.contains(&"agents/scout.yaml".to_string()));
        assert!(agents.contains(&"agents/sentinel.yaml".to_string()));
    }
}
