use crate::{error::StoreError, record::ChildRecord};
use log::{debug, info};
use ron::ser::PrettyConfig;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Where child profiles live. The scheduling engine never calls this; callers
/// fetch a snapshot here and hand it to the engine.
pub trait ProfileStore {
    fn get_by_id(&self, id: &str) -> Result<ChildRecord, StoreError>;

    /// Store a new profile, assigning an id when it has none.
    fn save(&mut self, record: ChildRecord) -> Result<ChildRecord, StoreError>;

    /// Replace an existing profile.
    fn update(&mut self, record: ChildRecord) -> Result<(), StoreError>;

    fn remove(&mut self, id: &str) -> Result<(), StoreError>;

    fn ids(&self) -> Vec<String>;
}

/// All profiles in one RON file, rewritten after every change.
#[derive(Debug)]
pub struct RonProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, ChildRecord>,
}

impl RonProfileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let profiles = if path.exists() {
            let data = fs::read_to_string(path)?;
            ron::from_str(&data)?
        } else {
            BTreeMap::new()
        };
        info!("opened profile store {} ({} profiles)", path.display(), profiles.len());
        Ok(Self {
            path: path.to_owned(),
            profiles,
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let data = ron::ser::to_string_pretty(&self.profiles, PrettyConfig::default())?;
        fs::write(&self.path, data)?;
        debug!("wrote {} profiles to {}", self.profiles.len(), self.path.display());
        Ok(())
    }

    fn next_id(&self) -> String {
        (1..)
            .map(|n| format!("child-{n}"))
            .find(|id| !self.profiles.contains_key(id))
            .unwrap_or_default()
    }
}

impl ProfileStore for RonProfileStore {
    fn get_by_id(&self, id: &str) -> Result<ChildRecord, StoreError> {
        self.profiles
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))
    }

    fn save(&mut self, mut record: ChildRecord) -> Result<ChildRecord, StoreError> {
        if record.id().is_empty() {
            *record.id_mut() = self.next_id();
        }
        self.profiles.insert(record.id().to_owned(), record.clone());
        self.persist()?;
        Ok(record)
    }

    fn update(&mut self, record: ChildRecord) -> Result<(), StoreError> {
        let Some(slot) = self.profiles.get_mut(record.id()) else {
            return Err(StoreError::NotFound(record.id().to_owned()));
        };
        *slot = record;
        self.persist()
    }

    fn remove(&mut self, id: &str) -> Result<(), StoreError> {
        if self.profiles.remove(id).is_none() {
            return Err(StoreError::NotFound(id.to_owned()));
        }
        self.persist()
    }

    fn ids(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }
}
