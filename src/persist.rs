//! Load/save of the marking session against an opaque record store.
//!
//! Three records are kept: `config` (title, sections and hotkeys), `students`
//! (the roster with marks) and `mode` (present as `"marking"` while the grid
//! is active).

use crate::model::{HotkeyBinding, Section, Session, Student};
use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const CONFIG_KEY: &str = "config";
pub const STUDENTS_KEY: &str = "students";
pub const MODE_KEY: &str = "mode";
const MODE_MARKING: &str = "marking";

/// Opaque string key-value facility.
pub trait RecordStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
    /// Writes every record or none of them.
    fn put_all(&self, records: &[(&str, &str)]) -> anyhow::Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    hotkeys: Vec<HotkeyBinding>,
}

pub struct Gateway {
    store: Box<dyn RecordStore>,
}

impl Gateway {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// `Ok(None)` when nothing was ever saved.
    pub fn load(&self) -> anyhow::Result<Option<Session>> {
        let Some(raw_config) = self.store.get(CONFIG_KEY)? else {
            return Ok(None);
        };
        let config: ConfigRecord =
            serde_json::from_str(&raw_config).context("config record is not valid JSON")?;

        let students: Vec<Student> = match self.store.get(STUDENTS_KEY)? {
            Some(raw) => {
                serde_json::from_str(&raw).context("students record is not valid JSON")?
            }
            None => Vec::new(),
        };

        Ok(Some(Session {
            title: config.title,
            sections: config.sections,
            hotkeys: config.hotkeys,
            students,
        }))
    }

    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        let config = ConfigRecord {
            title: session.title.clone(),
            sections: session.sections.clone(),
            hotkeys: session.hotkeys.clone(),
        };
        let config_json = serde_json::to_string(&config).context("failed to serialize config")?;
        let students_json =
            serde_json::to_string(&session.students).context("failed to serialize students")?;

        self.store
            .put_all(&[
                (CONFIG_KEY, config_json.as_str()),
                (STUDENTS_KEY, students_json.as_str()),
            ])
    }

    pub fn marking_mode(&self) -> anyhow::Result<bool> {
        Ok(self.store.get(MODE_KEY)?.as_deref() == Some(MODE_MARKING))
    }

    pub fn set_marking_mode(&self, on: bool) -> anyhow::Result<()> {
        if on {
            self.store.put(MODE_KEY, MODE_MARKING)
        } else {
            self.store.remove(MODE_KEY)
        }
    }
}
