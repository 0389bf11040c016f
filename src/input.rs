use crate::app::InputMode;
use crate::config::KeyBindings;
use crate::model::{NavigationMode, ViewMode};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    Top,
    Bottom,
    ToggleExpand,
    SwitchNav(NavigationMode),
    Restart,
    Delete,
    Logs,
    Exec,
    Ports,
    Env,
    Stats,
    Inspect,
    OpenPort,
    ToggleFollow,
    Browse,
    Back,
    ToggleHelp,
    StartSearch,
    NextMatch,
    PrevMatch,
    StartCommand,
    Refresh,
    SubmitInput,
    CancelInput,
    Backspace,
    InputChar(char),
}

impl Action {
    /// Whether a shared key should resolve to this action in `view`.
    fn applies_in(self, view: ViewMode) -> bool {
        match self {
            Self::OpenPort => view == ViewMode::Ports,
            Self::ToggleExpand => matches!(view, ViewMode::Details | ViewMode::VolumeBrowse),
            _ => true,
        }
    }
}

/// Key signature to action table, resolved once from configuration.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<String, Vec<Action>>,
    invalid: Vec<String>,
}

impl KeyMap {
    pub fn from_bindings(bindings: &KeyBindings) -> Self {
        let nav = &bindings.navigation;
        let container = &bindings.container;
        let table: [(&[String], Action); 25] = [
            (bindings.general.force_quit.as_slice(), Action::Quit),
            (bindings.general.refresh.as_slice(), Action::Refresh),
            (nav.up.as_slice(), Action::Up),
            (nav.down.as_slice(), Action::Down),
            (nav.top.as_slice(), Action::Top),
            (nav.bottom.as_slice(), Action::Bottom),
            (nav.toggle_expand.as_slice(), Action::ToggleExpand),
            (
                nav.switch_container.as_slice(),
                Action::SwitchNav(NavigationMode::Containers),
            ),
            (
                nav.switch_volume.as_slice(),
                Action::SwitchNav(NavigationMode::Volumes),
            ),
            (
                nav.switch_image.as_slice(),
                Action::SwitchNav(NavigationMode::Images),
            ),
            (
                nav.switch_network.as_slice(),
                Action::SwitchNav(NavigationMode::Networks),
            ),
            (container.restart.as_slice(), Action::Restart),
            (container.delete.as_slice(), Action::Delete),
            (container.logs.as_slice(), Action::Logs),
            (container.exec.as_slice(), Action::Exec),
            (container.ports.as_slice(), Action::Ports),
            (container.env.as_slice(), Action::Env),
            (container.stats.as_slice(), Action::Stats),
            (container.inspect.as_slice(), Action::Inspect),
            (container.open_port.as_slice(), Action::OpenPort),
            (container.follow.as_slice(), Action::ToggleFollow),
            (container.browse.as_slice(), Action::Browse),
            (bindings.views.back.as_slice(), Action::Back),
            (bindings.views.help.as_slice(), Action::ToggleHelp),
            (bindings.commands.enter.as_slice(), Action::StartCommand),
        ];
        let search: [(&[String], Action); 3] = [
            (bindings.logs.search.as_slice(), Action::StartSearch),
            (bindings.logs.next_result.as_slice(), Action::NextMatch),
            (bindings.logs.prev_result.as_slice(), Action::PrevMatch),
        ];

        let mut keymap = Self::default();
        for (specs, action) in table.into_iter().chain(search) {
            for spec in specs {
                let Some(signature) = normalize_hotkey_spec(spec) else {
                    keymap.invalid.push(spec.clone());
                    continue;
                };
                let actions = keymap.bindings.entry(signature).or_default();
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        keymap
    }

    pub fn invalid_specs(&self) -> &[String] {
        &self.invalid
    }

    pub fn lookup(&self, key: KeyEvent, view: ViewMode) -> Option<Action> {
        let signature = key_event_signature(key)?;
        self.bindings
            .get(&signature)?
            .iter()
            .copied()
            .find(|action| action.applies_in(view))
    }

    /// Bound key signatures for `action`, sorted for display.
    pub fn keys_for(&self, action: Action) -> Vec<String> {
        let mut keys = self
            .bindings
            .iter()
            .filter(|(_, actions)| actions.contains(&action))
            .map(|(signature, _)| signature.clone())
            .collect::<Vec<_>>();
        keys.sort();
        keys
    }
}

pub fn map_key(keymap: &KeyMap, mode: InputMode, view: ViewMode, key: KeyEvent) -> Option<Action> {
    if keymap.lookup(key, view) == Some(Action::Quit) {
        return Some(Action::Quit);
    }
    match mode {
        InputMode::Normal => keymap.lookup(key, view),
        InputMode::Command | InputMode::Search => map_input_mode_key(key),
    }
}

fn map_input_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Char('m') | KeyCode::Char('j')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(Action::SubmitInput)
        }
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

/// Canonical form of a key event. Characters keep their case, so `G` and
/// `g` differ and shift is implied rather than spelled out.
pub fn key_event_signature(key: KeyEvent) -> Option<String> {
    let (key_name, is_char) = match key.code {
        KeyCode::Char(' ') => ("space".to_string(), true),
        KeyCode::Char('+') => ("plus".to_string(), true),
        KeyCode::Char(c) => (c.to_string(), true),
        KeyCode::Enter => ("enter".to_string(), false),
        KeyCode::Tab => ("tab".to_string(), false),
        KeyCode::BackTab => ("backtab".to_string(), false),
        KeyCode::Backspace => ("backspace".to_string(), false),
        KeyCode::Delete => ("delete".to_string(), false),
        KeyCode::Esc => ("esc".to_string(), false),
        KeyCode::Left => ("left".to_string(), false),
        KeyCode::Right => ("right".to_string(), false),
        KeyCode::Up => ("up".to_string(), false),
        KeyCode::Down => ("down".to_string(), false),
        KeyCode::Home => ("home".to_string(), false),
        KeyCode::End => ("end".to_string(), false),
        KeyCode::PageUp => ("pageup".to_string(), false),
        KeyCode::PageDown => ("pagedown".to_string(), false),
        KeyCode::F(n) => (format!("f{n}"), false),
        _ => return None,
    };

    let mut parts = Vec::new();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("ctrl".to_string());
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        parts.push("alt".to_string());
    }
    if !is_char && key.modifiers.contains(KeyModifiers::SHIFT) {
        parts.push("shift".to_string());
    }
    parts.push(key_name);
    Some(parts.join("+"))
}

/// Normalizes a configured key such as `"Ctrl+C"`, `"shift+g"` or `" "`
/// into the form produced by [`key_event_signature`].
pub fn normalize_hotkey_spec(spec: &str) -> Option<String> {
    if spec == " " {
        return Some("space".to_string());
    }

    let mut ctrl = false;
    let mut alt = false;
    let mut shift = false;
    let mut key: Option<String> = None;

    for token in spec
        .split('+')
        .map(str::trim)
        .filter(|token| !token.is_empty())
    {
        match token.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => ctrl = true,
            "alt" => alt = true,
            "shift" => shift = true,
            _ => key = Some(normalize_hotkey_key_token(token)?),
        }
    }

    let mut key = key?;
    if key.chars().count() == 1 {
        if shift {
            key = key.to_uppercase();
        } else if ctrl || alt {
            key = key.to_lowercase();
        }
        shift = false;
    } else if key == "space" || key == "plus" {
        shift = false;
    }

    let mut parts = Vec::new();
    if ctrl {
        parts.push("ctrl".to_string());
    }
    if alt {
        parts.push("alt".to_string());
    }
    if shift {
        parts.push("shift".to_string());
    }
    parts.push(key);
    Some(parts.join("+"))
}

fn normalize_hotkey_key_token(token: &str) -> Option<String> {
    if token.chars().count() == 1 {
        return Some(token.to_string());
    }
    let lower = token.to_ascii_lowercase();
    match lower.as_str() {
        "esc" | "escape" => Some("esc".to_string()),
        "return" => Some("enter".to_string()),
        "pgup" => Some("pageup".to_string()),
        "pgdn" => Some("pagedown".to_string()),
        "del" => Some("delete".to_string()),
        "space" | "plus" | "tab" | "backtab" | "enter" | "backspace" | "delete" | "left"
        | "right" | "up" | "down" | "home" | "end" | "pageup" | "pagedown" => Some(lower),
        _ if lower.starts_with('f') => {
            let number = lower.trim_start_matches('f').parse::<u8>().ok()?;
            if (1..=24).contains(&number) {
                Some(format!("f{number}"))
            } else {
                None
            }
        }
        _ => None,
    }
}
