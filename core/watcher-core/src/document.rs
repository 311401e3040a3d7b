//! The host's widget document (`config/widget.json`).
//!
//! Only the `"widgets"` array is interpreted. Every other key is carried
//! through untouched and in its original order.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Result, WatcherError};
use crate::store;

const WIDGETS_KEY: &str = "widgets";

#[derive(Debug, Clone)]
pub struct WidgetDocument {
    path: PathBuf,
    root: Map<String, Value>,
}

impl WidgetDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let value: Value = store::read_json(path)?;
        match value {
            Value::Object(root) => Ok(Self {
                path: path.to_path_buf(),
                root,
            }),
            _ => Err(WatcherError::InvalidConfig {
                path: path.to_path_buf(),
                reason: "document root is not an object".to_string(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the widget list. An absent key reads as empty; anything that
    /// isn't an array of strings is rejected.
    pub fn widgets(&self) -> Result<Vec<String>> {
        let Some(value) = self.root.get(WIDGETS_KEY) else {
            return Ok(Vec::new());
        };
        let Value::Array(items) = value else {
            return Err(self.invalid("\"widgets\" is not an array"));
        };
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid("\"widgets\" contains a non-string entry"))
            })
            .collect()
    }

    /// Last entry of the widget list.
    pub fn terminal_widget(&self) -> Result<String> {
        self.widgets()?
            .pop()
            .ok_or_else(|| self.invalid("\"widgets\" is empty or missing"))
    }

    pub fn set_widgets(&mut self, widgets: Vec<String>) {
        let items = widgets.into_iter().map(Value::String).collect();
        match self.root.get_mut(WIDGETS_KEY) {
            Some(slot) => *slot = Value::Array(items),
            None => {
                self.root
                    .insert(WIDGETS_KEY.to_string(), Value::Array(items));
            }
        }
    }

    /// Replaces the terminal slot. Fails on an empty list.
    pub fn set_terminal_widget(&mut self, value: &str) -> Result<()> {
        let mut widgets = self.widgets()?;
        let Some(last) = widgets.last_mut() else {
            return Err(self.invalid("\"widgets\" is empty or missing"));
        };
        *last = value.to_string();
        self.set_widgets(widgets);
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        store::write_json_atomic(&self.path, &self.root)
    }

    fn invalid(&self, reason: &str) -> WatcherError {
        WatcherError::InvalidConfig {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Index of the first entry equal to `marker`.
pub fn find_widget(widgets: &[String], marker: &str) -> Option<usize> {
    widgets.iter().position(|w| w == marker)
}
