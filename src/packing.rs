use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::models::{CategoryGroup, ItemCategory, PackingItem, PackingSummary};
use crate::store::{self, Db, PACKING_ITEMS_KEY};

pub struct PackingList {
    conn: Db,
    items: Mutex<Vec<PackingItem>>,
}

impl PackingList {
    /// Loads the saved list, seeding the default items when there is nothing saved.
    pub fn load(conn: Db) -> Result<Self> {
        let items: Vec<PackingItem> = store::load(&conn, PACKING_ITEMS_KEY).unwrap_or_default();
        let list = Self {
            conn,
            items: Mutex::new(items),
        };
        let mut items = list.lock();
        if items.is_empty() {
            *items = default_items();
            store::save(&list.conn, PACKING_ITEMS_KEY, &*items)?;
            info!("Seeded {} default packing items", items.len());
        }
        drop(items);
        Ok(list)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PackingItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, items: &[PackingItem]) -> Result<()> {
        store::save(&self.conn, PACKING_ITEMS_KEY, items)
    }

    pub fn items(&self) -> Vec<PackingItem> {
        self.lock().clone()
    }

    /// Returns `None` without touching the list when `name` is blank.
    pub fn add_item(&self, name: &str, category: ItemCategory) -> Result<Option<PackingItem>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let item = PackingItem::new(name, category);
        let mut items = self.lock();
        let mut next = items.clone();
        next.push(item.clone());
        self.persist(&next)?;
        *items = next;
        Ok(Some(item))
    }

    /// Flips the packed flag. Unknown ids leave the list untouched and return `None`.
    pub fn toggle_packed(&self, id: Uuid) -> Result<Option<PackingItem>> {
        let mut items = self.lock();
        let mut next = items.clone();
        let Some(item) = next.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        item.is_packed = !item.is_packed;
        let toggled = item.clone();
        self.persist(&next)?;
        *items = next;
        Ok(Some(toggled))
    }

    pub fn delete_item(&self, id: Uuid) -> Result<bool> {
        Ok(self.delete_items(&[id])? == 1)
    }

    /// Removes every item whose id is listed and returns how many were removed.
    pub fn delete_items(&self, ids: &[Uuid]) -> Result<usize> {
        let ids: HashSet<&Uuid> = ids.iter().collect();
        let mut items = self.lock();
        let next: Vec<PackingItem> = items
            .iter()
            .filter(|i| !ids.contains(&i.id))
            .cloned()
            .collect();
        let removed = items.len() - next.len();
        if removed == 0 {
            return Ok(0);
        }
        self.persist(&next)?;
        *items = next;
        Ok(removed)
    }

    pub fn filtered(&self, category: Option<ItemCategory>) -> Vec<PackingItem> {
        self.lock()
            .iter()
            .filter(|i| category.map_or(true, |c| i.category == c))
            .cloned()
            .collect()
    }

    /// Counts and per-category groups for the (optionally filtered) list.
    pub fn summary(&self, category: Option<ItemCategory>) -> PackingSummary {
        let items = self.filtered(category);
        let total = items.len();
        let packed = items.iter().filter(|i| i.is_packed).count();
        let progress = if total == 0 {
            0.0
        } else {
            packed as f64 / total as f64
        };
        PackingSummary {
            packed,
            total,
            unpacked: total - packed,
            progress,
            groups: group_by_category(&items),
        }
    }
}

/// Non-empty groups ordered by category label.
pub fn group_by_category(items: &[PackingItem]) -> Vec<CategoryGroup> {
    let mut categories = ItemCategory::ALL.to_vec();
    categories.sort_by_key(|c| c.label());
    categories
        .into_iter()
        .filter_map(|category| {
            let members: Vec<PackingItem> = items
                .iter()
                .filter(|i| i.category == category)
                .cloned()
                .collect();
            (!members.is_empty()).then(|| CategoryGroup {
                category,
                label: category.label(),
                icon: category.icon(),
                items: members,
            })
        })
        .collect()
}

pub fn default_items() -> Vec<PackingItem> {
    use ItemCategory::*;
    [
        ("Passport", Documents),
        ("Tickets", Documents),
        ("Phone", Electronics),
        ("Charger", Electronics),
        ("Laptop", Electronics),
        ("T-shirts", Clothing),
        ("Trousers", Clothing),
        ("Shoes", Clothing),
        ("Toothbrush", Toiletries),
        ("Shampoo", Toiletries),
        ("First-aid kit", Medicine),
        ("Umbrella", Other),
    ]
    .into_iter()
    .map(|(name, category)| PackingItem::new(name, category))
    .collect()
}
