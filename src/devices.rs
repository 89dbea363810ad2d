use std::collections::HashMap;
use tracing::{debug, warn};

use crate::console::Console;
use crate::error::ExportError;
use crate::tb_rust_client::{DeviceInfo, EntityId, TbError, ThingsBoardClient};

/// Device name to id, in first-insertion order.
///
/// Inserting a name that is already present replaces its id but keeps its
/// position, so the earlier device with that name is no longer selectable.
#[derive(Debug, Default)]
pub struct DeviceDirectory {
    entries: Vec<(String, EntityId)>,
    positions: HashMap<String, usize>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id that was replaced, if the name was already known.
    pub fn insert(&mut self, name: String, id: EntityId) -> Option<EntityId> {
        match self.positions.get(&name) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, id)),
            None => {
                self.positions.insert(name.clone(), self.entries.len());
                self.entries.push((name, id));
                None
            }
        }
    }

    pub fn extend_from_page(&mut self, devices: Vec<DeviceInfo>) {
        for device in devices {
            if let Some(replaced) = self.insert(device.name.clone(), device.id) {
                warn!("Duplicate device name '{}': id {} is replaced", device.name, replaced.id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, index: usize) -> Option<(&str, &EntityId)> {
        self.entries.get(index).map(|(name, id)| (name.as_str(), id))
    }

    pub fn id_of(&self, name: &str) -> Option<&EntityId> {
        self.positions.get(name).map(|&position| &self.entries[position].1)
    }
}

/// Walks every device page of the tenant into a [`DeviceDirectory`].
pub async fn collect_devices(client: &ThingsBoardClient, page_size: u32) -> Result<DeviceDirectory, TbError> {
    let mut directory = DeviceDirectory::new();
    let mut pages = client.device_pages(page_size);

    while let Some(devices) = pages.next_page().await? {
        directory.extend_from_page(devices);
    }

    debug!("Total devices collected: {}", directory.len());
    Ok(directory)
}

/// Lists the directory and returns the id at the position the user types.
pub fn choose_device<C>(console: &mut C, directory: &DeviceDirectory) -> Result<EntityId, ExportError>
where
    C: Console + ?Sized,
{
    console.print("\nAvailable devices:")?;
    for (index, name) in directory.names().enumerate() {
        console.print(&format!("{} - {}", index, name))?;
    }

    let answer = console.read_line("\nDevice number to extract data: ")?;
    let index = answer
        .trim()
        .parse::<usize>()
        .map_err(|source| ExportError::InvalidNumber { input: answer.clone(), source })?;

    directory
        .get(index)
        .map(|(_, id)| id.clone())
        .ok_or(ExportError::DeviceIndex { index, available: directory.len() })
}
