use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub keybindings: KeyBindings,
    pub ui: UiPrefs,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub navigation: NavigationKeys,
    pub container: ContainerKeys,
    pub views: ViewKeys,
    pub logs: LogKeys,
    pub commands: CommandKeys,
    pub general: GeneralKeys,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigationKeys {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub top: Vec<String>,
    pub bottom: Vec<String>,
    pub toggle_expand: Vec<String>,
    pub switch_container: Vec<String>,
    pub switch_volume: Vec<String>,
    pub switch_image: Vec<String>,
    pub switch_network: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContainerKeys {
    pub restart: Vec<String>,
    pub delete: Vec<String>,
    pub logs: Vec<String>,
    pub exec: Vec<String>,
    pub ports: Vec<String>,
    pub env: Vec<String>,
    pub stats: Vec<String>,
    pub inspect: Vec<String>,
    pub open_port: Vec<String>,
    pub follow: Vec<String>,
    pub browse: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewKeys {
    pub back: Vec<String>,
    pub help: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogKeys {
    pub search: Vec<String>,
    pub next_result: Vec<String>,
    pub prev_result: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandKeys {
    pub enter: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralKeys {
    pub force_quit: Vec<String>,
    pub refresh: Vec<String>,
}

/// Display preferences. Numeric caps are kept at 1 or more by [`load`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiPrefs {
    pub show_header_context: bool,
    pub show_list_help_hint: bool,
    pub show_line_numbers: bool,
    pub max_project_preview_items: usize,
    pub max_container_port_preview: usize,
    pub max_image_tag_preview: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub source: Option<PathBuf>,
    pub config: AppConfig,
}

fn keys(specs: &[&str]) -> Vec<String> {
    specs.iter().map(|spec| spec.to_string()).collect()
}

impl Default for NavigationKeys {
    fn default() -> Self {
        Self {
            up: keys(&["k", "up"]),
            down: keys(&["j", "down"]),
            top: keys(&["g"]),
            bottom: keys(&["G"]),
            toggle_expand: keys(&["space", "enter"]),
            switch_container: keys(&["1"]),
            switch_volume: keys(&["2"]),
            switch_image: keys(&["3"]),
            switch_network: keys(&["4"]),
        }
    }
}

impl Default for ContainerKeys {
    fn default() -> Self {
        Self {
            restart: keys(&["r"]),
            delete: keys(&["d"]),
            logs: keys(&["l"]),
            exec: keys(&["e"]),
            ports: keys(&["p"]),
            env: keys(&["v"]),
            stats: keys(&["t"]),
            inspect: keys(&["i"]),
            open_port: keys(&["o", "enter"]),
            follow: keys(&["f"]),
            browse: keys(&["b"]),
        }
    }
}

impl Default for ViewKeys {
    fn default() -> Self {
        Self {
            back: keys(&["esc"]),
            help: keys(&["f1"]),
        }
    }
}

impl Default for LogKeys {
    fn default() -> Self {
        Self {
            search: keys(&["?"]),
            next_result: keys(&["n"]),
            prev_result: keys(&["N"]),
        }
    }
}

impl Default for CommandKeys {
    fn default() -> Self {
        Self {
            enter: keys(&[":"]),
        }
    }
}

impl Default for GeneralKeys {
    fn default() -> Self {
        Self {
            force_quit: keys(&["ctrl+c"]),
            refresh: keys(&["ctrl+r"]),
        }
    }
}

impl Default for UiPrefs {
    fn default() -> Self {
        Self {
            show_header_context: true,
            show_list_help_hint: true,
            show_line_numbers: true,
            max_project_preview_items: 8,
            max_container_port_preview: 4,
            max_image_tag_preview: 6,
        }
    }
}

impl UiPrefs {
    fn sanitize(&mut self) {
        self.max_project_preview_items = self.max_project_preview_items.max(1);
        self.max_container_port_preview = self.max_container_port_preview.max(1);
        self.max_image_tag_preview = self.max_image_tag_preview.max(1);
    }
}

/// Loads the first config file found, or defaults when there is none.
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let Some(path) = explicit
        .map(Path::to_path_buf)
        .or_else(discover_config_path)
    else {
        return Ok(LoadedConfig {
            source: None,
            config: AppConfig::default(),
        });
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = parse(&raw).with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(LoadedConfig {
        source: Some(path),
        config,
    })
}

pub fn parse(raw: &str) -> Result<AppConfig> {
    if raw.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    let mut config: AppConfig = serde_yaml::from_str(raw)?;
    config.ui.sanitize();
    Ok(config)
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DOCKSIDE_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("dockside.yaml"),
        PathBuf::from("dockside.yml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let candidate = PathBuf::from(home).join(".config/dockside/config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}
