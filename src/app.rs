use crate::config::UiPrefs;
use crate::input::Action;
use crate::logs::{self, LogBuffer};
use crate::model::{
    Container, ContainerStats, Image, NavigationMode, Network, PortMapping, Snapshot, ViewMode,
    Volume,
};
use crate::projector::{self, ListItem};
use crate::search::SearchState;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub const FOLLOW_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Command,
    Search,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TickKind {
    AutoRefresh,
    LogFollow,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogRequest {
    Tail(usize),
    Since(Option<DateTime<Utc>>),
}

impl LogRequest {
    pub fn is_follow(self) -> bool {
        matches!(self, Self::Since(_))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Lifecycle {
    Start,
    Stop,
    Restart,
}

impl Lifecycle {
    fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }

    fn pending(self) -> &'static str {
        match self {
            Self::Start => "Starting container...",
            Self::Stop => "Stopping container...",
            Self::Restart => "Restarting container...",
        }
    }

    fn done(self) -> &'static str {
        match self {
            Self::Start => "Container started",
            Self::Stop => "Container stopped",
            Self::Restart => "Container restarted",
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RemoveKind {
    Container,
    Volume,
    Image,
}

impl RemoveKind {
    fn noun(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Volume => "volume",
            Self::Image => "image",
        }
    }

    fn done(self) -> &'static str {
        match self {
            Self::Container => "Container deleted",
            Self::Volume => "Volume deleted",
            Self::Image => "Image deleted",
        }
    }
}

/// Side effect requested by the state machine. Each task yields exactly one
/// [`Event`] once the scheduler has run it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Task {
    Refresh(NavigationMode),
    Lifecycle {
        action: Lifecycle,
        id: String,
    },
    Remove {
        kind: RemoveKind,
        id: String,
    },
    FetchLogs {
        container_id: String,
        request: LogRequest,
    },
    Inspect {
        container_id: String,
    },
    Stats {
        container_id: String,
    },
    ReadDirectory {
        path: PathBuf,
    },
    OpenBrowser {
        url: String,
    },
    Shell {
        container_id: String,
        name: String,
    },
    ScheduleTick {
        kind: TickKind,
        delay: Duration,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Containers(Vec<Container>),
    Volumes(Vec<Volume>),
    Images(Vec<Image>),
    Networks(Vec<Network>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Refreshed {
        mode: NavigationMode,
        result: Result<Listing, String>,
    },
    Lifecycle {
        action: Lifecycle,
        result: Result<(), String>,
    },
    Removed {
        kind: RemoveKind,
        result: Result<(), String>,
    },
    Logs {
        container_id: String,
        request: LogRequest,
        result: Result<Vec<u8>, String>,
    },
    Inspected {
        container_id: String,
        result: Result<String, String>,
    },
    Stats {
        container_id: String,
        result: Result<ContainerStats, String>,
    },
    Directory {
        path: PathBuf,
        result: Result<Vec<String>, String>,
    },
    Browser {
        url: String,
        result: Result<(), String>,
    },
    Shell {
        name: String,
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Action(Action),
    Resize { width: u16, height: u16 },
    Tick(TickKind),
    Completed(Outcome),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContainerRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct LogsView {
    pub target: ContainerRef,
    /// `None` until the batch load completes.
    pub buffer: Option<LogBuffer>,
    pub error: Option<String>,
    pub scroll: usize,
    pub following: bool,
    pub search: SearchState,
}

#[derive(Debug, Clone)]
pub struct InspectView {
    pub target: ContainerRef,
    pub lines: Option<Vec<String>>,
    pub scroll: usize,
}

#[derive(Debug, Clone)]
pub struct BrowseView {
    pub volume: String,
    pub root: PathBuf,
    pub path: PathBuf,
    pub entries: Option<Vec<String>>,
    pub selected: usize,
}

/// Sub-state of the active view. Each variant carries only its own payload.
#[derive(Debug, Clone)]
pub enum ViewState {
    Details,
    Logs(LogsView),
    Ports {
        target: ContainerRef,
        selected: usize,
    },
    Env {
        target: ContainerRef,
    },
    Stats {
        target: ContainerRef,
    },
    Inspect(InspectView),
    VolumeBrowse(BrowseView),
}

impl ViewState {
    pub fn mode(&self) -> ViewMode {
        match self {
            Self::Details => ViewMode::Details,
            Self::Logs(_) => ViewMode::Logs,
            Self::Ports { .. } => ViewMode::Ports,
            Self::Env { .. } => ViewMode::Env,
            Self::Stats { .. } => ViewMode::Stats,
            Self::Inspect(_) => ViewMode::Inspect,
            Self::VolumeBrowse(_) => ViewMode::VolumeBrowse,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub refresh_interval: Duration,
    pub log_tail: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(10),
            log_tail: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct App {
    running: bool,
    settings: SessionSettings,
    prefs: UiPrefs,
    snapshot: Snapshot,
    expanded: BTreeSet<String>,
    nav: NavigationMode,
    items: Vec<ListItem>,
    cursor: Option<usize>,
    view: ViewState,
    mode: InputMode,
    input: String,
    help_visible: bool,
    stats: HashMap<String, ContainerStats>,
    follow_outstanding: bool,
    status: String,
    viewport: (u16, u16),
}

impl App {
    pub fn new(settings: SessionSettings, prefs: UiPrefs) -> Self {
        Self {
            running: true,
            settings,
            prefs,
            snapshot: Snapshot::default(),
            expanded: BTreeSet::new(),
            nav: NavigationMode::Containers,
            items: Vec::new(),
            cursor: None,
            view: ViewState::Details,
            mode: InputMode::Normal,
            input: String::new(),
            help_visible: false,
            stats: HashMap::new(),
            follow_outstanding: false,
            status: String::new(),
            viewport: (0, 0),
        }
    }

    /// Initial loads plus the first auto-refresh tick.
    pub fn bootstrap(&mut self) -> Vec<Task> {
        let mut tasks = NavigationMode::ALL
            .into_iter()
            .map(Task::Refresh)
            .collect::<Vec<_>>();
        tasks.push(Task::ScheduleTick {
            kind: TickKind::AutoRefresh,
            delay: self.settings.refresh_interval,
        });
        tasks
    }

    pub fn apply(&mut self, event: Event) -> Vec<Task> {
        match event {
            Event::Action(action) if self.mode != InputMode::Normal => self.apply_input(action),
            Event::Action(action) => self.apply_action(action),
            Event::Resize { width, height } => {
                self.viewport = (width, height);
                Vec::new()
            }
            Event::Tick(kind) => self.apply_tick(kind),
            Event::Completed(outcome) => self.apply_outcome(outcome),
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn nav(&self) -> NavigationMode {
        self.nav
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view.mode()
    }

    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn prefs(&self) -> &UiPrefs {
        &self.prefs
    }

    pub fn help_visible(&self) -> bool {
        self.help_visible
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn viewport(&self) -> (u16, u16) {
        self.viewport
    }

    pub fn stats_for(&self, container_id: &str) -> Option<&ContainerStats> {
        self.stats.get(container_id)
    }

    pub fn ports_of(&self, container_id: &str) -> &[PortMapping] {
        self.snapshot
            .find_container(container_id)
            .map(|container| container.ports.as_slice())
            .unwrap_or_default()
    }

    pub fn selected_item(&self) -> Option<ListItem> {
        self.cursor.and_then(|cursor| self.items.get(cursor).copied())
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    fn apply_action(&mut self, action: Action) -> Vec<Task> {
        match action {
            Action::Quit => {
                self.running = false;
                Vec::new()
            }
            Action::Up => self.move_by(-1),
            Action::Down => self.move_by(1),
            Action::Top => self.move_by(isize::MIN),
            Action::Bottom => self.move_by(isize::MAX),
            Action::ToggleExpand => match self.view {
                ViewState::Details => self.toggle_selected_group(),
                ViewState::VolumeBrowse(_) => self.descend_directory(),
                _ => Vec::new(),
            },
            Action::SwitchNav(nav) => self.switch_nav(nav),
            Action::Restart => self.lifecycle(Lifecycle::Restart),
            Action::Delete => self.delete_selected(),
            Action::Logs => self.open_logs(),
            Action::Exec => match self.selected_target() {
                Some(target) => vec![Task::Shell {
                    container_id: target.id,
                    name: target.name,
                }],
                None => Vec::new(),
            },
            Action::Ports => self.open_container_view(|target| ViewState::Ports {
                target,
                selected: 0,
            }),
            Action::Env => self.open_container_view(|target| ViewState::Env { target }),
            Action::Stats => self.request_stats(),
            Action::Inspect => self.open_inspect(),
            Action::OpenPort => self.open_selected_port(),
            Action::ToggleFollow => self.toggle_follow(),
            Action::Browse => self.open_volume_browser(),
            Action::Back => self.back(),
            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
                Vec::new()
            }
            Action::StartSearch => {
                if matches!(self.view, ViewState::Logs(_)) {
                    self.start_input(InputMode::Search);
                }
                Vec::new()
            }
            Action::NextMatch => self.step_match(true),
            Action::PrevMatch => self.step_match(false),
            Action::StartCommand => {
                self.start_input(InputMode::Command);
                Vec::new()
            }
            Action::Refresh => self.refresh_current(),
            Action::SubmitInput
            | Action::CancelInput
            | Action::Backspace
            | Action::InputChar(_) => Vec::new(),
        }
    }

    fn apply_input(&mut self, action: Action) -> Vec<Task> {
        match action {
            Action::Quit => {
                self.running = false;
                Vec::new()
            }
            Action::InputChar(c) => {
                self.input.push(c);
                Vec::new()
            }
            Action::Backspace => {
                self.input.pop();
                Vec::new()
            }
            Action::CancelInput => {
                self.mode = InputMode::Normal;
                self.input.clear();
                Vec::new()
            }
            Action::SubmitInput => {
                let text = std::mem::take(&mut self.input);
                let mode = std::mem::replace(&mut self.mode, InputMode::Normal);
                match mode {
                    InputMode::Command => self.execute_command_line(&text),
                    InputMode::Search => {
                        self.commit_search(&text);
                        Vec::new()
                    }
                    InputMode::Normal => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn start_input(&mut self, mode: InputMode) {
        self.mode = mode;
        self.input.clear();
        self.status.clear();
    }

    fn execute_command_line(&mut self, line: &str) -> Vec<Task> {
        let command = line.trim();
        match command {
            "" => Vec::new(),
            "q" | "quit" => {
                self.running = false;
                Vec::new()
            }
            "s" | "start" => self.lifecycle(Lifecycle::Start),
            "S" | "stop" => self.lifecycle(Lifecycle::Stop),
            "noh" => {
                if let ViewState::Logs(view) = &mut self.view {
                    view.search = SearchState::default();
                }
                self.set_status("Search cleared");
                Vec::new()
            }
            "h" | "help" => {
                self.help_visible = true;
                self.status.clear();
                Vec::new()
            }
            "follow" => self.toggle_follow(),
            "r" | "refresh" => self.refresh_current(),
            _ => {
                self.set_status(format!("Unknown command: {command}"));
                Vec::new()
            }
        }
    }

    fn commit_search(&mut self, query: &str) {
        let ViewState::Logs(view) = &mut self.view else {
            return;
        };
        let lines = view
            .buffer
            .as_ref()
            .map(LogBuffer::lines)
            .unwrap_or_default();
        view.search = SearchState::commit(lines, query);
        if !view.search.is_active() {
            self.status.clear();
            return;
        }
        if let Some(line) = view.search.current_line() {
            view.scroll = line;
        }
        let status = view.search.status();
        self.set_status(status);
    }

    fn step_match(&mut self, forward: bool) -> Vec<Task> {
        let ViewState::Logs(view) = &mut self.view else {
            return Vec::new();
        };
        let line = if forward {
            view.search.next()
        } else {
            view.search.prev()
        };
        if let Some(line) = line {
            view.scroll = line;
            let status = view.search.status();
            self.set_status(status);
        }
        Vec::new()
    }

    fn switch_nav(&mut self, nav: NavigationMode) -> Vec<Task> {
        if nav == self.nav {
            return Vec::new();
        }
        self.nav = nav;
        self.view = ViewState::Details;
        self.cursor = Some(0);
        self.rebuild();
        vec![Task::Refresh(nav)]
    }

    fn refresh_current(&mut self) -> Vec<Task> {
        self.set_status(refreshing_status(self.nav));
        vec![Task::Refresh(self.nav)]
    }

    /// Re-projects the list and pulls the cursor and port selection back into
    /// range.
    fn rebuild(&mut self) {
        self.items = projector::project(&self.snapshot, self.nav, &self.expanded);
        self.cursor = projector::clamp_cursor(self.cursor, self.items.len());
        if let ViewState::Ports { target, selected } = &mut self.view {
            let len = self
                .snapshot
                .find_container(&target.id)
                .map_or(0, |container| container.ports.len());
            *selected = (*selected).min(len.saturating_sub(1));
        }
    }

    fn move_by(&mut self, delta: isize) -> Vec<Task> {
        match &mut self.view {
            ViewState::Details => {
                let len = self.items.len();
                let moved = self.cursor.map(|cursor| step(cursor, delta, len));
                self.cursor = projector::clamp_cursor(moved, len);
            }
            ViewState::Logs(view) => {
                let len = view.buffer.as_ref().map_or(0, LogBuffer::len);
                view.scroll = step(view.scroll, delta, len);
            }
            ViewState::Inspect(view) => {
                let len = view.lines.as_ref().map_or(0, Vec::len);
                view.scroll = step(view.scroll, delta, len);
            }
            ViewState::Ports { target, selected } => {
                let len = self
                    .snapshot
                    .find_container(&target.id)
                    .map_or(0, |container| container.ports.len());
                *selected = step(*selected, delta, len);
            }
            ViewState::VolumeBrowse(view) => {
                let len = view.entries.as_ref().map_or(0, Vec::len);
                view.selected = step(view.selected, delta, len);
            }
            ViewState::Env { .. } | ViewState::Stats { .. } => {}
        }
        Vec::new()
    }

    fn toggle_selected_group(&mut self) -> Vec<Task> {
        let Some(ListItem::Project { group, .. }) = self.selected_item() else {
            return Vec::new();
        };
        let Some(name) = self.snapshot.groups().get(group).map(|g| g.name.clone()) else {
            return Vec::new();
        };
        if !self.expanded.remove(&name) {
            self.expanded.insert(name);
        }
        self.rebuild();
        Vec::new()
    }

    fn selected_container(&self) -> Option<&Container> {
        let index = self.selected_item()?.container_index()?;
        self.snapshot.container(index)
    }

    fn selected_target(&self) -> Option<ContainerRef> {
        self.selected_container().map(|container| ContainerRef {
            id: container.id.clone(),
            name: container.name.clone(),
        })
    }

    fn open_container_view(&mut self, view: impl FnOnce(ContainerRef) -> ViewState) -> Vec<Task> {
        if let Some(target) = self.selected_target() {
            self.view = view(target);
            self.status.clear();
        }
        Vec::new()
    }

    fn lifecycle(&mut self, action: Lifecycle) -> Vec<Task> {
        let Some(id) = self
            .selected_container()
            .map(|container| container.id.clone())
        else {
            return Vec::new();
        };
        self.set_status(action.pending());
        vec![Task::Lifecycle { action, id }]
    }

    fn delete_selected(&mut self) -> Vec<Task> {
        let target = match (self.nav, self.selected_item()) {
            (NavigationMode::Containers, Some(ListItem::Container { index, .. })) => self
                .snapshot
                .container(index)
                .map(|container| (RemoveKind::Container, container.id.clone())),
            (NavigationMode::Volumes, Some(ListItem::Volume(index))) => self
                .snapshot
                .volumes()
                .get(index)
                .map(|volume| (RemoveKind::Volume, volume.name.clone())),
            (NavigationMode::Images, Some(ListItem::Image(index))) => self
                .snapshot
                .images()
                .get(index)
                .map(|image| (RemoveKind::Image, image.id.clone())),
            _ => None,
        };
        let Some((kind, id)) = target else {
            return Vec::new();
        };
        self.set_status(format!("Deleting {}...", kind.noun()));
        vec![Task::Remove { kind, id }]
    }

    fn open_logs(&mut self) -> Vec<Task> {
        let Some(target) = self.selected_target() else {
            return Vec::new();
        };
        let container_id = target.id.clone();
        self.view = ViewState::Logs(LogsView {
            target,
            buffer: None,
            error: None,
            scroll: 0,
            following: true,
            search: SearchState::default(),
        });
        self.status.clear();
        vec![Task::FetchLogs {
            container_id,
            request: LogRequest::Tail(self.settings.log_tail),
        }]
    }

    fn request_stats(&mut self) -> Vec<Task> {
        if let ViewState::Stats { target } = &self.view {
            return vec![Task::Stats {
                container_id: target.id.clone(),
            }];
        }
        let Some(target) = self.selected_target() else {
            return Vec::new();
        };
        let container_id = target.id.clone();
        self.view = ViewState::Stats { target };
        self.status.clear();
        vec![Task::Stats { container_id }]
    }

    fn open_inspect(&mut self) -> Vec<Task> {
        let Some(target) = self.selected_target() else {
            return Vec::new();
        };
        let container_id = target.id.clone();
        self.view = ViewState::Inspect(InspectView {
            target,
            lines: None,
            scroll: 0,
        });
        self.status.clear();
        vec![Task::Inspect { container_id }]
    }

    fn open_selected_port(&mut self) -> Vec<Task> {
        let ViewState::Ports { target, selected } = &self.view else {
            return Vec::new();
        };
        let ports = self.ports_of(&target.id);
        let url = match ports.get((*selected).min(ports.len().saturating_sub(1))) {
            None => Err("No ports available"),
            Some(PortMapping {
                public_port: None,
                ..
            }) => Err("Port is not published"),
            Some(PortMapping {
                public_port: Some(public),
                ..
            }) => Ok(format!("http://localhost:{public}")),
        };
        match url {
            Ok(url) => vec![Task::OpenBrowser { url }],
            Err(message) => {
                self.set_status(message);
                Vec::new()
            }
        }
    }

    fn open_volume_browser(&mut self) -> Vec<Task> {
        let Some(ListItem::Volume(index)) = self.selected_item() else {
            return Vec::new();
        };
        let Some(volume) = self.snapshot.volumes().get(index) else {
            return Vec::new();
        };
        if volume.mountpoint.trim().is_empty() {
            let message = format!("Volume {} has no mountpoint", volume.name);
            self.set_status(message);
            return Vec::new();
        }
        let root = PathBuf::from(&volume.mountpoint);
        self.view = ViewState::VolumeBrowse(BrowseView {
            volume: volume.name.clone(),
            root: root.clone(),
            path: root.clone(),
            entries: None,
            selected: 0,
        });
        self.status.clear();
        vec![Task::ReadDirectory { path: root }]
    }

    fn descend_directory(&mut self) -> Vec<Task> {
        let ViewState::VolumeBrowse(view) = &mut self.view else {
            return Vec::new();
        };
        let Some(dir) = view
            .entries
            .as_ref()
            .and_then(|entries| entries.get(view.selected))
            .and_then(|entry| entry.strip_suffix('/'))
        else {
            return Vec::new();
        };
        view.path = view.path.join(dir);
        view.entries = None;
        view.selected = 0;
        vec![Task::ReadDirectory {
            path: view.path.clone(),
        }]
    }

    fn back(&mut self) -> Vec<Task> {
        if self.help_visible {
            self.help_visible = false;
            self.status.clear();
            return Vec::new();
        }
        if let ViewState::VolumeBrowse(view) = &mut self.view
            && view.path != view.root
            && let Some(parent) = view.path.parent()
        {
            view.path = parent.to_path_buf();
            view.entries = None;
            view.selected = 0;
            return vec![Task::ReadDirectory {
                path: view.path.clone(),
            }];
        }
        if !matches!(self.view, ViewState::Details) {
            self.view = ViewState::Details;
            self.status.clear();
        }
        Vec::new()
    }

    fn toggle_follow(&mut self) -> Vec<Task> {
        let ViewState::Logs(view) = &mut self.view else {
            return Vec::new();
        };
        view.following = !view.following;
        let status = if view.following {
            "Following logs"
        } else {
            "Log follow paused"
        };
        self.set_status(status);
        self.schedule_follow()
    }

    /// Starts the next link of the follow chain when the logs view wants one
    /// and no tick or fetch is already outstanding.
    fn schedule_follow(&mut self) -> Vec<Task> {
        if self.follow_outstanding {
            return Vec::new();
        }
        match &self.view {
            ViewState::Logs(view) if view.following && view.buffer.is_some() => {
                self.follow_outstanding = true;
                vec![Task::ScheduleTick {
                    kind: TickKind::LogFollow,
                    delay: FOLLOW_INTERVAL,
                }]
            }
            _ => Vec::new(),
        }
    }

    fn apply_tick(&mut self, kind: TickKind) -> Vec<Task> {
        match kind {
            TickKind::AutoRefresh => {
                let mut tasks = Vec::new();
                if self.nav == NavigationMode::Containers {
                    tasks.push(Task::Refresh(NavigationMode::Containers));
                }
                tasks.push(Task::ScheduleTick {
                    kind: TickKind::AutoRefresh,
                    delay: self.settings.refresh_interval,
                });
                tasks
            }
            TickKind::LogFollow => {
                self.follow_outstanding = false;
                if let ViewState::Logs(view) = &self.view
                    && view.following
                    && let Some(buffer) = &view.buffer
                {
                    self.follow_outstanding = true;
                    return vec![Task::FetchLogs {
                        container_id: view.target.id.clone(),
                        request: LogRequest::Since(buffer.cursor().get()),
                    }];
                }
                debug!("log follow chain ended");
                Vec::new()
            }
        }
    }

    fn apply_outcome(&mut self, outcome: Outcome) -> Vec<Task> {
        match outcome {
            Outcome::Refreshed { mode, result } => {
                match result {
                    Ok(listing) => {
                        match listing {
                            Listing::Containers(containers) => {
                                self.snapshot.set_containers(containers)
                            }
                            Listing::Volumes(volumes) => self.snapshot.set_volumes(volumes),
                            Listing::Images(images) => self.snapshot.set_images(images),
                            Listing::Networks(networks) => self.snapshot.set_networks(networks),
                        }
                        self.rebuild();
                        if self.status == refreshing_status(mode) {
                            self.set_status(format!("{} refreshed", mode.title()));
                        }
                    }
                    Err(error) => self.set_status(format!(
                        "Failed to refresh {}: {error}",
                        mode.title().to_lowercase()
                    )),
                }
                Vec::new()
            }
            Outcome::Lifecycle { action, result } => match result {
                Ok(()) => {
                    self.set_status(action.done());
                    vec![Task::Refresh(self.nav)]
                }
                Err(error) => {
                    self.set_status(format!("Failed to {} container: {error}", action.verb()));
                    Vec::new()
                }
            },
            Outcome::Removed { kind, result } => match result {
                Ok(()) => {
                    self.set_status(kind.done());
                    vec![Task::Refresh(self.nav)]
                }
                Err(error) => {
                    self.set_status(format!("Failed to delete {}: {error}", kind.noun()));
                    Vec::new()
                }
            },
            Outcome::Logs {
                container_id,
                request,
                result,
            } => self.apply_logs(&container_id, request, result),
            Outcome::Inspected {
                container_id,
                result,
            } => {
                let ViewState::Inspect(view) = &mut self.view else {
                    return Vec::new();
                };
                if view.target.id != container_id {
                    return Vec::new();
                }
                match result {
                    Ok(document) => {
                        view.lines = Some(document.lines().map(str::to_string).collect())
                    }
                    Err(error) => {
                        view.lines = Some(Vec::new());
                        self.set_status(format!("Failed to inspect container: {error}"));
                    }
                }
                Vec::new()
            }
            Outcome::Stats {
                container_id,
                result,
            } => {
                match result {
                    Ok(stats) => {
                        self.stats.insert(container_id, stats);
                    }
                    Err(error) => {
                        if let ViewState::Stats { target } = &self.view
                            && target.id == container_id
                        {
                            self.set_status(format!("Failed to load stats: {error}"));
                        }
                    }
                }
                Vec::new()
            }
            Outcome::Directory { path, result } => {
                let ViewState::VolumeBrowse(view) = &mut self.view else {
                    return Vec::new();
                };
                if view.path != path {
                    return Vec::new();
                }
                match result {
                    Ok(entries) => view.entries = Some(entries),
                    Err(error) => {
                        view.entries = Some(Vec::new());
                        self.set_status(format!("Failed to read {}: {error}", path.display()));
                    }
                }
                Vec::new()
            }
            Outcome::Browser { url, result } => {
                match result {
                    Ok(()) => self.set_status(format!("Opened {url}")),
                    Err(error) => self.set_status(format!("Failed to open browser: {error}")),
                }
                Vec::new()
            }
            Outcome::Shell { name, result } => match result {
                Ok(()) => {
                    self.set_status(format!("Exited shell in {name}"));
                    vec![Task::Refresh(NavigationMode::Containers)]
                }
                Err(error) => {
                    self.set_status(format!("Failed to exec into {name}: {error}"));
                    Vec::new()
                }
            },
        }
    }

    fn apply_logs(
        &mut self,
        container_id: &str,
        request: LogRequest,
        result: Result<Vec<u8>, String>,
    ) -> Vec<Task> {
        let follow = request.is_follow();
        if follow {
            self.follow_outstanding = false;
        }
        // Results for a logs view the user has left only end the old chain.
        let ViewState::Logs(view) = &mut self.view else {
            return self.schedule_follow();
        };
        if view.target.id != container_id {
            return self.schedule_follow();
        }

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(error) => {
                view.following = false;
                let status = if follow {
                    format!("Log follow stopped: {error}")
                } else {
                    view.error = Some(error.clone());
                    format!("Failed to load logs: {error}")
                };
                self.set_status(status);
                return Vec::new();
            }
        };

        let decoded = logs::decode_all(&bytes);
        if follow {
            if !view.following {
                return Vec::new();
            }
            if let Some(buffer) = view.buffer.as_mut() {
                let at_bottom = view.scroll >= buffer.last_index();
                let added = buffer.append_follow(decoded.lines);
                if at_bottom && added > 0 {
                    view.scroll = buffer.last_index();
                }
            }
        } else {
            let malformed = decoded.is_malformed();
            let buffer = LogBuffer::from_batch(decoded.lines);
            view.scroll = buffer.last_index();
            view.buffer = Some(buffer);
            view.search = SearchState::default();
            view.error = None;
            if malformed {
                self.set_status("Log stream could not be decoded");
            }
        }
        self.schedule_follow()
    }
}

/// Moves `current` by `delta` inside `[0, len - 1]`; 0 when empty.
fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let moved = if delta < 0 {
        current.saturating_sub(delta.unsigned_abs())
    } else {
        current.saturating_add(delta as usize)
    };
    moved.min(len - 1)
}

fn refreshing_status(mode: NavigationMode) -> String {
    format!("Refreshing {}...", mode.title().to_lowercase())
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    let status = status
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_default();
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::{
        App, Event, FOLLOW_INTERVAL, InputMode, Lifecycle, Listing, LogRequest, Outcome,
        SessionSettings, Task, TickKind, ViewState,
    };
    use crate::config::UiPrefs;
    use crate::input::Action;
    use crate::logs::framed;
    use crate::model::{
        Container, ContainerStats, NavigationMode, PortMapping, ViewMode, Volume, container,
    };
    use crate::projector::ListItem;
    use chrono::{DateTime, Utc};
    use std::path::PathBuf;

    fn new_app() -> App {
        App::new(SessionSettings::default(), UiPrefs::default())
    }

    fn refreshed(app: &mut App, containers: Vec<Container>) -> Vec<Task> {
        app.apply(Event::Completed(Outcome::Refreshed {
            mode: NavigationMode::Containers,
            result: Ok(Listing::Containers(containers)),
        }))
    }

    fn act(app: &mut App, action: Action) -> Vec<Task> {
        app.apply(Event::Action(action))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            act(app, Action::InputChar(c));
        }
    }

    fn stamp(second: u32) -> String {
        format!("2024-05-01T10:00:{second:02}.000000000Z")
    }

    /// App sitting in the logs view of container `a1` with `batch` loaded.
    fn app_with_logs(batch: &[String]) -> App {
        let mut app = new_app();
        refreshed(&mut app, vec![container("a1", "api", "running", None)]);
        let tasks = act(&mut app, Action::Logs);
        assert_eq!(
            tasks,
            vec![Task::FetchLogs {
                container_id: "a1".to_string(),
                request: LogRequest::Tail(100),
            }]
        );
        let refs = batch.iter().map(String::as_str).collect::<Vec<_>>();
        let tasks = app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Tail(100),
            result: Ok(framed(&refs)),
        }));
        assert_eq!(
            tasks,
            vec![Task::ScheduleTick {
                kind: TickKind::LogFollow,
                delay: FOLLOW_INTERVAL,
            }]
        );
        app
    }

    fn logs_view(app: &App) -> &super::LogsView {
        match app.view() {
            ViewState::Logs(view) => view,
            other => panic!("expected logs view, got {:?}", other.mode()),
        }
    }

    #[test]
    fn initial_state_and_bootstrap() {
        let mut app = new_app();
        assert_eq!(app.nav(), NavigationMode::Containers);
        assert_eq!(app.view_mode(), ViewMode::Details);
        assert_eq!(app.mode(), InputMode::Normal);
        assert_eq!(app.cursor(), None);

        let tasks = app.bootstrap();
        assert_eq!(tasks.len(), 5);
        assert_eq!(
            tasks.last(),
            Some(&Task::ScheduleTick {
                kind: TickKind::AutoRefresh,
                delay: SessionSettings::default().refresh_interval,
            })
        );
    }

    #[test]
    fn toggle_expand_rebuilds_projection() {
        let mut app = new_app();
        refreshed(
            &mut app,
            vec![
                container("a1", "containerA", "running", Some("web")),
                container("b1", "containerB", "running", Some("web")),
                container("s1", "standalone", "exited", None),
            ],
        );
        assert_eq!(app.items().len(), 2);
        assert_eq!(app.cursor(), Some(0));

        act(&mut app, Action::ToggleExpand);
        assert_eq!(app.items().len(), 2, "standalone row does not expand");

        act(&mut app, Action::Down);
        act(&mut app, Action::ToggleExpand);
        assert_eq!(app.items().len(), 4);

        refreshed(
            &mut app,
            vec![
                container("a1", "containerA", "running", Some("web")),
                container("b1", "containerB", "exited", Some("web")),
            ],
        );
        assert_eq!(app.items().len(), 3, "expand state survives refresh");
    }

    #[test]
    fn shrinking_refresh_clamps_cursor() {
        let mut app = new_app();
        let many = (0..5)
            .map(|i| container(&format!("c{i}"), &format!("n{i}"), "running", None))
            .collect::<Vec<_>>();
        refreshed(&mut app, many);
        act(&mut app, Action::Bottom);
        assert_eq!(app.cursor(), Some(4));

        refreshed(&mut app, vec![container("c0", "n0", "running", None)]);
        assert_eq!(app.cursor(), Some(0));

        refreshed(&mut app, Vec::new());
        assert_eq!(app.cursor(), None);
        act(&mut app, Action::Down);
        assert_eq!(app.cursor(), None);

        refreshed(&mut app, vec![container("c9", "n9", "running", None)]);
        assert_eq!(app.cursor(), Some(0));
    }

    #[test]
    fn switching_navigation_resets_cursor_and_view() {
        let mut app = new_app();
        refreshed(
            &mut app,
            vec![
                container("a1", "api", "running", None),
                container("b1", "db", "running", None),
            ],
        );
        app.apply(Event::Completed(Outcome::Refreshed {
            mode: NavigationMode::Volumes,
            result: Ok(Listing::Volumes(vec![Volume::default(), Volume::default()])),
        }));
        act(&mut app, Action::Down);
        assert_eq!(app.cursor(), Some(1));
        act(&mut app, Action::Logs);
        assert_eq!(app.view_mode(), ViewMode::Logs);

        let tasks = act(&mut app, Action::SwitchNav(NavigationMode::Volumes));
        assert_eq!(tasks, vec![Task::Refresh(NavigationMode::Volumes)]);
        assert_eq!(app.view_mode(), ViewMode::Details);
        assert_eq!(app.cursor(), Some(0));
        assert_eq!(app.selected_item(), Some(ListItem::Volume(0)));

        assert!(act(&mut app, Action::SwitchNav(NavigationMode::Volumes)).is_empty());
    }

    #[test]
    fn container_views_need_a_container_under_cursor() {
        let mut app = new_app();
        refreshed(
            &mut app,
            vec![container("a1", "containerA", "running", Some("web"))],
        );
        assert!(act(&mut app, Action::Logs).is_empty());
        assert!(act(&mut app, Action::Inspect).is_empty());
        assert!(act(&mut app, Action::Restart).is_empty());
        act(&mut app, Action::Ports);
        assert_eq!(app.view_mode(), ViewMode::Details);
        assert_eq!(app.status(), "");
    }

    #[test]
    fn follow_chain_appends_and_reschedules() {
        let batch = (0..100)
            .map(|i| format!("{} line {i}", stamp(i / 2)))
            .collect::<Vec<_>>();
        let mut app = app_with_logs(&batch);
        assert_eq!(logs_view(&app).buffer.as_ref().map(|b| b.len()), Some(100));
        assert_eq!(logs_view(&app).scroll, 99);

        let tasks = app.apply(Event::Tick(TickKind::LogFollow));
        let since: Option<DateTime<Utc>> = stamp(49).parse().ok();
        assert_eq!(
            tasks,
            vec![Task::FetchLogs {
                container_id: "a1".to_string(),
                request: LogRequest::Since(since),
            }]
        );

        let fresh_a = format!("{} fresh a", stamp(50));
        let fresh_b = format!("{} fresh b", stamp(50));
        let body = framed(&[batch[99].as_str(), fresh_a.as_str(), fresh_b.as_str()]);
        let tasks = app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Since(since),
            result: Ok(body),
        }));
        assert_eq!(
            tasks,
            vec![Task::ScheduleTick {
                kind: TickKind::LogFollow,
                delay: FOLLOW_INTERVAL,
            }]
        );
        assert_eq!(logs_view(&app).buffer.as_ref().map(|b| b.len()), Some(102));
        assert_eq!(logs_view(&app).scroll, 101);
    }

    #[test]
    fn follow_tick_after_leaving_logs_ends_chain() {
        let mut app = app_with_logs(&[format!("{} hi", stamp(1))]);
        act(&mut app, Action::Back);
        assert_eq!(app.view_mode(), ViewMode::Details);
        assert!(app.apply(Event::Tick(TickKind::LogFollow)).is_empty());

        // A fresh logs view can start a new chain once the old one ended.
        act(&mut app, Action::Logs);
        let tasks = app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Tail(100),
            result: Ok(framed(&["x"])),
        }));
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn only_one_follow_tick_is_outstanding() {
        let mut app = app_with_logs(&[format!("{} hi", stamp(1))]);
        assert!(act(&mut app, Action::ToggleFollow).is_empty());
        assert!(!logs_view(&app).following);
        assert!(act(&mut app, Action::ToggleFollow).is_empty());
        assert!(logs_view(&app).following);
        assert_eq!(app.apply(Event::Tick(TickKind::LogFollow)).len(), 1);
    }

    #[test]
    fn follow_tick_while_paused_fetches_nothing() {
        let mut app = app_with_logs(&[format!("{} hi", stamp(1))]);
        assert!(act(&mut app, Action::ToggleFollow).is_empty());
        assert!(app.apply(Event::Tick(TickKind::LogFollow)).is_empty());

        let tasks = act(&mut app, Action::ToggleFollow);
        assert_eq!(
            tasks,
            vec![Task::ScheduleTick {
                kind: TickKind::LogFollow,
                delay: FOLLOW_INTERVAL,
            }]
        );
    }

    #[test]
    fn follow_result_after_leaving_logs_is_dropped() {
        let mut app = app_with_logs(&[format!("{} hi", stamp(1))]);
        assert_eq!(app.apply(Event::Tick(TickKind::LogFollow)).len(), 1);
        act(&mut app, Action::Back);
        act(&mut app, Action::Logs);
        assert!(logs_view(&app).buffer.is_none());

        let late = format!("{} late", stamp(2));
        let tasks = app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Since(stamp(1).parse().ok()),
            result: Ok(framed(&[late.as_str()])),
        }));
        assert!(tasks.is_empty());
        assert!(logs_view(&app).buffer.is_none());

        let tasks = app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Tail(100),
            result: Ok(framed(&["fresh"])),
        }));
        assert_eq!(
            tasks,
            vec![Task::ScheduleTick {
                kind: TickKind::LogFollow,
                delay: FOLLOW_INTERVAL,
            }]
        );
        assert_eq!(logs_view(&app).buffer.as_ref().map(|b| b.len()), Some(1));
    }

    #[test]
    fn follow_result_for_another_container_hands_over_chain() {
        let mut app = new_app();
        refreshed(
            &mut app,
            vec![
                container("a1", "api", "running", None),
                container("b1", "db", "running", None),
            ],
        );
        act(&mut app, Action::Logs);
        app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Tail(100),
            result: Ok(framed(&["api up"])),
        }));
        assert_eq!(app.apply(Event::Tick(TickKind::LogFollow)).len(), 1);

        act(&mut app, Action::Back);
        act(&mut app, Action::Down);
        act(&mut app, Action::Logs);
        let tasks = app.apply(Event::Completed(Outcome::Logs {
            container_id: "b1".to_string(),
            request: LogRequest::Tail(100),
            result: Ok(framed(&["db ready"])),
        }));
        assert!(tasks.is_empty(), "api follow fetch is still in flight");

        let late = format!("{} api late", stamp(2));
        let tasks = app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Since(None),
            result: Ok(framed(&[late.as_str()])),
        }));
        assert_eq!(
            tasks,
            vec![Task::ScheduleTick {
                kind: TickKind::LogFollow,
                delay: FOLLOW_INTERVAL,
            }]
        );
        let view = logs_view(&app);
        assert_eq!(view.target.id, "b1");
        assert_eq!(view.buffer.as_ref().map(|b| b.len()), Some(1));
    }

    #[test]
    fn follow_error_stops_following() {
        let mut app = app_with_logs(&[format!("{} hi", stamp(1))]);
        app.apply(Event::Tick(TickKind::LogFollow));
        let tasks = app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Since(None),
            result: Err("connection reset".to_string()),
        }));
        assert!(tasks.is_empty());
        assert!(!logs_view(&app).following);
        assert_eq!(app.status(), "Log follow stopped: connection reset");
        assert_eq!(logs_view(&app).buffer.as_ref().map(|b| b.len()), Some(1));
    }

    #[test]
    fn batch_error_leaves_buffer_unloaded() {
        let mut app = new_app();
        refreshed(&mut app, vec![container("a1", "api", "running", None)]);
        act(&mut app, Action::Logs);
        let tasks = app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Tail(100),
            result: Err("no such container".to_string()),
        }));
        assert!(tasks.is_empty());
        assert!(logs_view(&app).buffer.is_none());
        assert_eq!(app.status(), "Failed to load logs: no such container");
    }

    #[test]
    fn search_commit_and_wrap() {
        let mut app = app_with_logs(&[
            "GET /health".to_string(),
            "error: disk".to_string(),
            "ok".to_string(),
            "Error again".to_string(),
        ]);
        act(&mut app, Action::StartSearch);
        assert_eq!(app.mode(), InputMode::Search);
        type_text(&mut app, "error");
        act(&mut app, Action::SubmitInput);

        assert_eq!(app.mode(), InputMode::Normal);
        assert_eq!(logs_view(&app).scroll, 1);
        assert_eq!(app.status(), "Match 1/2");
        act(&mut app, Action::NextMatch);
        assert_eq!(logs_view(&app).scroll, 3);
        act(&mut app, Action::NextMatch);
        assert_eq!(logs_view(&app).scroll, 1);
        act(&mut app, Action::PrevMatch);
        assert_eq!(app.status(), "Match 2/2");

        act(&mut app, Action::StartCommand);
        type_text(&mut app, "noh");
        act(&mut app, Action::SubmitInput);
        assert!(logs_view(&app).search.matches().is_empty());
        assert_eq!(app.status(), "Search cleared");
    }

    #[test]
    fn search_is_not_recomputed_on_follow_append() {
        let mut app = app_with_logs(&[format!("{} boot error", stamp(1))]);
        act(&mut app, Action::StartSearch);
        type_text(&mut app, "error");
        act(&mut app, Action::SubmitInput);
        assert_eq!(logs_view(&app).search.matches(), &[0]);

        app.apply(Event::Tick(TickKind::LogFollow));
        let late = format!("{} late error", stamp(2));
        app.apply(Event::Completed(Outcome::Logs {
            container_id: "a1".to_string(),
            request: LogRequest::Since(stamp(1).parse().ok()),
            result: Ok(framed(&[late.as_str()])),
        }));
        assert_eq!(logs_view(&app).buffer.as_ref().map(|b| b.len()), Some(2));
        assert_eq!(logs_view(&app).search.matches(), &[0]);
    }

    #[test]
    fn search_only_opens_in_logs_view() {
        let mut app = new_app();
        act(&mut app, Action::StartSearch);
        assert_eq!(app.mode(), InputMode::Normal);
    }

    #[test]
    fn unknown_command_reports_status() {
        let mut app = new_app();
        act(&mut app, Action::StartCommand);
        type_text(&mut app, "frobnicate");
        act(&mut app, Action::SubmitInput);
        assert_eq!(app.status(), "Unknown command: frobnicate");
        assert_eq!(app.mode(), InputMode::Normal);
    }

    #[test]
    fn cancel_discards_typed_command() {
        let mut app = new_app();
        act(&mut app, Action::StartCommand);
        type_text(&mut app, "qx");
        act(&mut app, Action::Backspace);
        assert_eq!(app.input(), "q");
        act(&mut app, Action::CancelInput);
        assert_eq!(app.input(), "");
        assert!(app.running());
    }

    #[test]
    fn start_command_and_successful_result_refresh() {
        let mut app = new_app();
        refreshed(&mut app, vec![container("a1", "api", "exited", None)]);
        act(&mut app, Action::StartCommand);
        type_text(&mut app, "s");
        let tasks = act(&mut app, Action::SubmitInput);
        assert_eq!(
            tasks,
            vec![Task::Lifecycle {
                action: Lifecycle::Start,
                id: "a1".to_string(),
            }]
        );
        assert_eq!(app.status(), "Starting container...");

        let tasks = app.apply(Event::Completed(Outcome::Lifecycle {
            action: Lifecycle::Start,
            result: Ok(()),
        }));
        assert_eq!(tasks, vec![Task::Refresh(NavigationMode::Containers)]);
        assert_eq!(app.status(), "Container started");

        app.apply(Event::Completed(Outcome::Lifecycle {
            action: Lifecycle::Stop,
            result: Err("permission denied".to_string()),
        }));
        assert_eq!(app.status(), "Failed to stop container: permission denied");
    }

    #[test]
    fn stale_inspect_result_is_dropped() {
        let mut app = new_app();
        refreshed(
            &mut app,
            vec![
                container("a1", "api", "running", None),
                container("b1", "db", "running", None),
            ],
        );
        act(&mut app, Action::Inspect);
        act(&mut app, Action::Back);
        act(&mut app, Action::Down);
        act(&mut app, Action::Inspect);
        app.apply(Event::Completed(Outcome::Inspected {
            container_id: "a1".to_string(),
            result: Ok("{\n  \"Id\": \"a1\"\n}".to_string()),
        }));
        match app.view() {
            ViewState::Inspect(view) => {
                assert_eq!(view.target.id, "b1");
                assert!(view.lines.is_none());
            }
            other => panic!("unexpected view {:?}", other.mode()),
        }
    }

    #[test]
    fn stats_are_cached_even_when_stale() {
        let mut app = new_app();
        refreshed(&mut app, vec![container("a1", "api", "running", None)]);
        let tasks = act(&mut app, Action::Stats);
        assert_eq!(
            tasks,
            vec![Task::Stats {
                container_id: "a1".to_string(),
            }]
        );
        act(&mut app, Action::Back);
        app.apply(Event::Completed(Outcome::Stats {
            container_id: "a1".to_string(),
            result: Ok(ContainerStats {
                pids: 3,
                ..ContainerStats::default()
            }),
        }));
        assert_eq!(app.stats_for("a1").map(|stats| stats.pids), Some(3));
        assert_eq!(app.view_mode(), ViewMode::Details);
    }

    #[test]
    fn auto_refresh_only_reloads_containers_view() {
        let mut app = new_app();
        let tasks = app.apply(Event::Tick(TickKind::AutoRefresh));
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0], Task::Refresh(NavigationMode::Containers));

        act(&mut app, Action::SwitchNav(NavigationMode::Images));
        let tasks = app.apply(Event::Tick(TickKind::AutoRefresh));
        assert!(matches!(
            tasks.as_slice(),
            [Task::ScheduleTick {
                kind: TickKind::AutoRefresh,
                ..
            }]
        ));
    }

    #[test]
    fn manual_refresh_reports_completion() {
        let mut app = new_app();
        assert_eq!(
            act(&mut app, Action::Refresh),
            vec![Task::Refresh(NavigationMode::Containers)]
        );
        assert_eq!(app.status(), "Refreshing containers...");
        refreshed(&mut app, vec![container("a1", "api", "running", None)]);
        assert_eq!(app.status(), "Containers refreshed");

        app.set_status("Container started");
        refreshed(&mut app, Vec::new());
        assert_eq!(app.status(), "Container started");
    }

    #[test]
    fn refresh_failure_keeps_previous_snapshot() {
        let mut app = new_app();
        refreshed(&mut app, vec![container("a1", "api", "running", None)]);
        app.apply(Event::Completed(Outcome::Refreshed {
            mode: NavigationMode::Containers,
            result: Err("engine unreachable".to_string()),
        }));
        assert_eq!(app.items().len(), 1);
        assert_eq!(
            app.status(),
            "Failed to refresh containers: engine unreachable"
        );
    }

    #[test]
    fn ports_selection_clamps_and_opens_browser() {
        let mut app = new_app();
        let mut api = container("a1", "api", "running", None);
        api.ports = vec![
            PortMapping {
                private_port: 80,
                public_port: Some(8080),
                protocol: "tcp".to_string(),
                ip: "0.0.0.0".to_string(),
            },
            PortMapping {
                private_port: 9000,
                public_port: None,
                protocol: "tcp".to_string(),
                ip: String::new(),
            },
        ];
        refreshed(&mut app, vec![api]);
        act(&mut app, Action::Ports);
        assert_eq!(app.view_mode(), ViewMode::Ports);

        let tasks = act(&mut app, Action::OpenPort);
        assert_eq!(
            tasks,
            vec![Task::OpenBrowser {
                url: "http://localhost:8080".to_string(),
            }]
        );
        act(&mut app, Action::Down);
        act(&mut app, Action::Down);
        act(&mut app, Action::Down);
        assert!(matches!(app.view(), ViewState::Ports { selected: 1, .. }));
        assert!(act(&mut app, Action::OpenPort).is_empty());
        assert_eq!(app.status(), "Port is not published");
    }

    #[test]
    fn shrinking_refresh_clamps_port_selection() {
        let mut app = new_app();
        let mut api = container("a1", "api", "running", None);
        api.ports = (0..3)
            .map(|i| PortMapping {
                private_port: 80 + i,
                public_port: Some(8080 + i),
                protocol: "tcp".to_string(),
                ip: "0.0.0.0".to_string(),
            })
            .collect();
        refreshed(&mut app, vec![api.clone()]);
        act(&mut app, Action::Ports);
        act(&mut app, Action::Bottom);
        assert!(matches!(app.view(), ViewState::Ports { selected: 2, .. }));

        api.ports.truncate(1);
        refreshed(&mut app, vec![api]);
        assert!(matches!(app.view(), ViewState::Ports { selected: 0, .. }));
        assert_eq!(
            act(&mut app, Action::OpenPort),
            vec![Task::OpenBrowser {
                url: "http://localhost:8080".to_string(),
            }]
        );
    }

    #[test]
    fn open_port_without_ports() {
        let mut app = new_app();
        refreshed(&mut app, vec![container("a1", "api", "running", None)]);
        act(&mut app, Action::Ports);
        assert!(act(&mut app, Action::OpenPort).is_empty());
        assert_eq!(app.status(), "No ports available");
    }

    #[test]
    fn volume_browser_descends_and_steps_back() {
        let mut app = new_app();
        app.apply(Event::Completed(Outcome::Refreshed {
            mode: NavigationMode::Volumes,
            result: Ok(Listing::Volumes(vec![Volume {
                name: "data".to_string(),
                mountpoint: "/var/lib/docker/volumes/data/_data".to_string(),
                ..Volume::default()
            }])),
        }));
        act(&mut app, Action::SwitchNav(NavigationMode::Volumes));
        let root = PathBuf::from("/var/lib/docker/volumes/data/_data");
        let tasks = act(&mut app, Action::Browse);
        assert_eq!(tasks, vec![Task::ReadDirectory { path: root.clone() }]);

        app.apply(Event::Completed(Outcome::Directory {
            path: root.clone(),
            result: Ok(vec!["conf/".to_string(), "db.sqlite".to_string()]),
        }));
        let tasks = act(&mut app, Action::ToggleExpand);
        assert_eq!(
            tasks,
            vec![Task::ReadDirectory {
                path: root.join("conf"),
            }]
        );

        let tasks = act(&mut app, Action::Back);
        assert_eq!(tasks, vec![Task::ReadDirectory { path: root }]);
        act(&mut app, Action::Back);
        assert_eq!(app.view_mode(), ViewMode::Details);
    }

    #[test]
    fn back_closes_help_before_view() {
        let mut app = app_with_logs(&["x".to_string()]);
        act(&mut app, Action::ToggleHelp);
        act(&mut app, Action::Back);
        assert!(!app.help_visible());
        assert_eq!(app.view_mode(), ViewMode::Logs);
        act(&mut app, Action::Back);
        assert_eq!(app.view_mode(), ViewMode::Details);
    }

    #[test]
    fn delete_follows_navigation_mode() {
        let mut app = new_app();
        app.apply(Event::Completed(Outcome::Refreshed {
            mode: NavigationMode::Networks,
            result: Ok(Listing::Networks(vec![Default::default()])),
        }));
        act(&mut app, Action::SwitchNav(NavigationMode::Networks));
        assert!(act(&mut app, Action::Delete).is_empty());
    }

    #[test]
    fn resize_records_viewport() {
        let mut app = new_app();
        app.apply(Event::Resize {
            width: 120,
            height: 40,
        });
        assert_eq!(app.viewport(), (120, 40));
    }

    #[test]
    fn quit_command_stops_loop() {
        let mut app = new_app();
        act(&mut app, Action::StartCommand);
        type_text(&mut app, "quit");
        act(&mut app, Action::SubmitInput);
        assert!(!app.running());
    }
}
