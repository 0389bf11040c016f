use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const PROJECT_LABEL: &str = "com.docker.compose.project";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum NavigationMode {
    Containers,
    Volumes,
    Images,
    Networks,
}

impl NavigationMode {
    pub const ALL: [Self; 4] = [
        Self::Containers,
        Self::Volumes,
        Self::Images,
        Self::Networks,
    ];

    pub const fn title(self) -> &'static str {
        match self {
            Self::Containers => "Containers",
            Self::Volumes => "Volumes",
            Self::Images => "Images",
            Self::Networks => "Networks",
        }
    }

    pub const fn slot(self) -> usize {
        match self {
            Self::Containers => 1,
            Self::Volumes => 2,
            Self::Images => 3,
            Self::Networks => 4,
        }
    }
}

impl Display for NavigationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ViewMode {
    Details,
    Logs,
    Ports,
    Env,
    Stats,
    Inspect,
    VolumeBrowse,
}

impl ViewMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Logs => "logs",
            Self::Ports => "ports",
            Self::Env => "env",
            Self::Stats => "stats",
            Self::Inspect => "inspect",
            Self::VolumeBrowse => "volume",
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PortMapping {
    pub private_port: u16,
    pub public_port: Option<u16>,
    pub protocol: String,
    pub ip: String,
}

impl Display for PortMapping {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.public_port {
            Some(public) => write!(f, "{public}->{}/{}", self.private_port, self.protocol),
            None => write!(f, "{}/{}", self.private_port, self.protocol),
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
    pub project: Option<String>,
    pub created: i64,
    pub ports: Vec<PortMapping>,
    pub env: Vec<String>,
}

impl Container {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Volume {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub scope: String,
    pub created: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Image {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub size: i64,
    pub created: i64,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Network {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub scope: String,
    pub internal: bool,
    pub created: String,
}

/// Containers sharing one compose project label. Members are indices into
/// [`Snapshot::containers`].
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ProjectGroup {
    pub name: String,
    pub members: Vec<usize>,
}

impl ProjectGroup {
    pub fn running(&self, containers: &[Container]) -> usize {
        self.members
            .iter()
            .filter_map(|index| containers.get(*index))
            .filter(|container| container.is_running())
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerStats {
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub net_rx: u64,
    pub net_tx: u64,
    pub block_read: u64,
    pub block_write: u64,
    pub pids: u64,
}

/// Most recently fetched resource lists. Every setter replaces its list
/// wholesale; container grouping is derived again on each replacement.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    containers: Vec<Container>,
    standalone: Vec<usize>,
    groups: Vec<ProjectGroup>,
    volumes: Vec<Volume>,
    images: Vec<Image>,
    networks: Vec<Network>,
}

impl Snapshot {
    pub fn set_containers(&mut self, containers: Vec<Container>) {
        let (standalone, groups) = group_by_project(&containers);
        self.containers = containers;
        self.standalone = standalone;
        self.groups = groups;
    }

    pub fn set_volumes(&mut self, volumes: Vec<Volume>) {
        self.volumes = volumes;
    }

    pub fn set_images(&mut self, images: Vec<Image>) {
        self.images = images;
    }

    pub fn set_networks(&mut self, networks: Vec<Network>) {
        self.networks = networks;
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn standalone(&self) -> &[usize] {
        &self.standalone
    }

    pub fn groups(&self) -> &[ProjectGroup] {
        &self.groups
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    pub fn container(&self, index: usize) -> Option<&Container> {
        self.containers.get(index)
    }

    pub fn find_container(&self, id: &str) -> Option<&Container> {
        self.containers.iter().find(|container| container.id == id)
    }

    pub fn running_count(&self) -> usize {
        self.containers.iter().filter(|c| c.is_running()).count()
    }

    pub fn stopped_count(&self) -> usize {
        self.containers.len() - self.running_count()
    }
}

/// Splits containers into ungrouped ones and project groups. Groups keep the
/// order in which their first member appears so projection stays stable.
fn group_by_project(containers: &[Container]) -> (Vec<usize>, Vec<ProjectGroup>) {
    let mut standalone = Vec::new();
    let mut groups: Vec<ProjectGroup> = Vec::new();
    for (index, container) in containers.iter().enumerate() {
        match container.project.as_deref().filter(|name| !name.is_empty()) {
            None => standalone.push(index),
            Some(name) => match groups.iter_mut().find(|group| group.name == name) {
                Some(group) => group.members.push(index),
                None => groups.push(ProjectGroup {
                    name: name.to_string(),
                    members: vec![index],
                }),
            },
        }
    }
    (standalone, groups)
}

#[cfg(test)]
pub(crate) fn container(id: &str, name: &str, state: &str, project: Option<&str>) -> Container {
    Container {
        id: id.to_string(),
        name: name.to_string(),
        image: "nginx:latest".to_string(),
        state: state.to_string(),
        status: String::new(),
        project: project.map(str::to_string),
        created: 0,
        ports: Vec::new(),
        env: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{NavigationMode, PortMapping, Snapshot, container};

    #[test]
    fn grouping_keeps_first_appearance_order() {
        let mut snapshot = Snapshot::default();
        snapshot.set_containers(vec![
            container("a", "db-1", "running", Some("db")),
            container("b", "solo", "exited", None),
            container("c", "web-1", "running", Some("web")),
            container("d", "db-2", "exited", Some("db")),
        ]);

        assert_eq!(snapshot.standalone(), &[1]);
        let names: Vec<_> = snapshot.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["db", "web"]);
        assert_eq!(snapshot.groups()[0].members, vec![0, 3]);
        assert_eq!(snapshot.groups()[0].running(snapshot.containers()), 1);
    }

    #[test]
    fn empty_project_label_counts_as_standalone() {
        let mut snapshot = Snapshot::default();
        snapshot.set_containers(vec![container("a", "x", "running", Some(""))]);
        assert_eq!(snapshot.standalone(), &[0]);
        assert!(snapshot.groups().is_empty());
    }

    #[test]
    fn running_and_stopped_counts() {
        let mut snapshot = Snapshot::default();
        snapshot.set_containers(vec![
            container("a", "x", "running", None),
            container("b", "y", "exited", None),
            container("c", "z", "created", None),
        ]);
        assert_eq!(snapshot.running_count(), 1);
        assert_eq!(snapshot.stopped_count(), 2);
    }

    #[test]
    fn port_mapping_display() {
        let published = PortMapping {
            private_port: 80,
            public_port: Some(8080),
            protocol: "tcp".to_string(),
            ip: "0.0.0.0".to_string(),
        };
        let private = PortMapping {
            public_port: None,
            ..published.clone()
        };
        assert_eq!(published.to_string(), "8080->80/tcp");
        assert_eq!(private.to_string(), "80/tcp");
        assert_eq!(NavigationMode::Images.slot(), 3);
    }
}
