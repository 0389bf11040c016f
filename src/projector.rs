use crate::model::{NavigationMode, Snapshot};
use std::collections::BTreeSet;

/// One cursor-addressable row. Rows refer back into the [`Snapshot`] by index,
/// so a fresh snapshot always comes with a freshly projected list.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ListItem {
    Container { index: usize, nested: bool },
    Project { group: usize, expanded: bool },
    Volume(usize),
    Image(usize),
    Network(usize),
}

impl ListItem {
    pub fn container_index(self) -> Option<usize> {
        match self {
            Self::Container { index, .. } => Some(index),
            _ => None,
        }
    }
}

pub fn project(
    snapshot: &Snapshot,
    nav: NavigationMode,
    expanded: &BTreeSet<String>,
) -> Vec<ListItem> {
    match nav {
        NavigationMode::Containers => {
            let mut items = snapshot
                .standalone()
                .iter()
                .map(|index| ListItem::Container {
                    index: *index,
                    nested: false,
                })
                .collect::<Vec<_>>();
            for (group_index, group) in snapshot.groups().iter().enumerate() {
                let is_expanded = expanded.contains(&group.name);
                items.push(ListItem::Project {
                    group: group_index,
                    expanded: is_expanded,
                });
                if is_expanded {
                    items.extend(group.members.iter().map(|index| ListItem::Container {
                        index: *index,
                        nested: true,
                    }));
                }
            }
            items
        }
        NavigationMode::Volumes => (0..snapshot.volumes().len())
            .map(ListItem::Volume)
            .collect(),
        NavigationMode::Images => (0..snapshot.images().len()).map(ListItem::Image).collect(),
        NavigationMode::Networks => (0..snapshot.networks().len())
            .map(ListItem::Network)
            .collect(),
    }
}

/// Keeps the cursor inside `[0, len - 1]`; `None` marks an empty list.
pub fn clamp_cursor(cursor: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(cursor.unwrap_or(0).min(len - 1))
}

/// Primary label of a row as shown in the list pane.
pub fn describe(snapshot: &Snapshot, item: ListItem) -> String {
    match item {
        ListItem::Container { index, .. } => snapshot
            .container(index)
            .map(|container| container.name.clone())
            .unwrap_or_default(),
        ListItem::Project { group, .. } => snapshot
            .groups()
            .get(group)
            .map(|group| {
                format!(
                    "{} ({}/{})",
                    group.name,
                    group.running(snapshot.containers()),
                    group.members.len()
                )
            })
            .unwrap_or_default(),
        ListItem::Volume(index) => snapshot
            .volumes()
            .get(index)
            .map(|volume| volume.name.clone())
            .unwrap_or_default(),
        ListItem::Image(index) => snapshot
            .images()
            .get(index)
            .map(|image| {
                image
                    .repo_tags
                    .first()
                    .cloned()
                    .unwrap_or_else(|| format!("<none> {}", image.id))
            })
            .unwrap_or_default(),
        ListItem::Network(index) => snapshot
            .networks()
            .get(index)
            .map(|network| network.name.clone())
            .unwrap_or_default(),
    }
}
