// Which activities a render covers, in output order

use crate::safile::{ActivityCatalog, ActivityFile, FormatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedActivity {
    pub id: u16,
    /// Markup outputs close this activity's element explicitly
    pub close_markup: bool,
}

/// Ordered set of selected activities. Fixed before the first record is
/// read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySelection {
    activities: Vec<SelectedActivity>,
}

impl ActivitySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unless `activity.id` is already selected
    pub fn push(&mut self, activity: SelectedActivity) -> bool {
        if self.contains(activity.id) {
            return false;
        }
        self.activities.push(activity);
        true
    }

    /// Select ids with the close-markup trait the catalog defines. Ids
    /// unknown to the catalog are kept without it.
    pub fn from_ids(ids: impl IntoIterator<Item = u16>, catalog: &ActivityCatalog) -> Self {
        let mut selection = Self::new();
        for id in ids {
            selection.push(SelectedActivity {
                id,
                close_markup: catalog.get(id).is_some_and(|spec| spec.close_markup),
            });
        }
        selection
    }

    pub fn from_names<S: AsRef<str>>(
        names: impl IntoIterator<Item = S>,
        catalog: &ActivityCatalog,
    ) -> Result<Self> {
        let mut ids = Vec::new();
        for name in names {
            let name = name.as_ref();
            let spec = catalog
                .by_name(name)
                .ok_or_else(|| FormatError::UnknownActivityName(name.to_string()))?;
            ids.push(spec.id);
        }
        Ok(Self::from_ids(ids, catalog))
    }

    /// Every decodable activity of `file`, in descriptor order
    pub fn all_in(file: &ActivityFile) -> Self {
        let mut selection = Self::new();
        for descriptor in file.descriptors() {
            if let Some(spec) = descriptor.spec {
                selection.push(SelectedActivity {
                    id: spec.id,
                    close_markup: spec.close_markup,
                });
            }
        }
        selection
    }

    pub fn get(&self, id: u16) -> Option<&SelectedActivity> {
        self.activities.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectedActivity> {
        self.activities.iter()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}
