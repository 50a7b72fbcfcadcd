//! Interactive menus on top of dialoguer

use crate::types::{FormatEntry, MenuItem, Preset};
use dialoguer::{MultiSelect, Select, theme::ColorfulTheme};

pub struct Selector {
    theme: ColorfulTheme,
}

impl Selector {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Pick one item; `None` when the list is empty or the user aborts
    pub fn select<T: Clone>(&self, items: &[MenuItem<T>], prompt: &str) -> Option<T> {
        if items.is_empty() {
            return None;
        }

        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();

        let selection = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact_opt()
            .ok()
            .flatten()?;

        items.get(selection).map(|item| item.value.clone())
    }

    /// Pick any number of items; empty on abort
    pub fn select_many<T: Clone>(&self, items: &[MenuItem<T>], prompt: &str) -> Vec<T> {
        if items.is_empty() {
            return Vec::new();
        }

        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();

        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&labels)
            .interact_opt()
            .ok()
            .flatten()
            .unwrap_or_default();

        picked
            .into_iter()
            .filter_map(|i| items.get(i).map(|item| item.value.clone()))
            .collect()
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

/// Menu rows for a format table, keyed by format id
pub fn format_menu(formats: &[&FormatEntry]) -> Vec<MenuItem<String>> {
    formats
        .iter()
        .map(|f| MenuItem {
            label: f.display_label(),
            value: f.format_id.clone(),
        })
        .collect()
}

/// Menu rows for presets; the default one is starred
pub fn preset_menu(presets: &[Preset]) -> Vec<MenuItem<String>> {
    presets
        .iter()
        .map(|p| MenuItem {
            label: format!(
                "{}{:<8} {}",
                if p.is_default { "* " } else { "  " },
                p.name,
                p.args
            ),
            value: p.name.clone(),
        })
        .collect()
}
