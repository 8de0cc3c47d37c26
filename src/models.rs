use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Countries
// ────────────────────────────────────────────────────────────────────────────

/// A catalog entry. Field names follow the remote JSON document (camelCase).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    #[serde(default = "Uuid::new_v4", deserialize_with = "id_or_generate")]
    pub id: Uuid,
    pub name: String,
    pub capital: String,
    pub currency: String,
    pub currency_code: String,
    pub language: String,
    pub time_zone: String,
    pub visa_required: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub visa_office: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub required_documents: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub attractions: Vec<String>,
    pub useful_info: String,
    pub flag: String,
    #[serde(rename = "imageURL", default, deserialize_with = "lenient")]
    pub image_url: Option<String>,
}

/// A missing or malformed id is replaced with a fresh one instead of failing the record.
fn id_or_generate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(parse_id(raw.as_ref()))
}

pub(crate) fn parse_id(raw: Option<&Value>) -> Uuid {
    raw.and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4)
}

/// Optional fields tolerate a wrong type by treating it as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).ok())
}

fn lenient_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    lenient(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogStatus {
    pub loading: bool,
    pub error: Option<String>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DataSourceUrl {
    pub url: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Packing list
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Clothing,
    Documents,
    Electronics,
    Toiletries,
    Medicine,
    #[default]
    Other,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 6] = [
        ItemCategory::Clothing,
        ItemCategory::Documents,
        ItemCategory::Electronics,
        ItemCategory::Toiletries,
        ItemCategory::Medicine,
        ItemCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ItemCategory::Clothing => "Clothing",
            ItemCategory::Documents => "Documents",
            ItemCategory::Electronics => "Electronics",
            ItemCategory::Toiletries => "Toiletries",
            ItemCategory::Medicine => "Medicine",
            ItemCategory::Other => "Other",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ItemCategory::Clothing => "tshirt.fill",
            ItemCategory::Documents => "doc.text.fill",
            ItemCategory::Electronics => "iphone",
            ItemCategory::Toiletries => "sparkles",
            ItemCategory::Medicine => "cross.case.fill",
            ItemCategory::Other => "bag.fill",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PackingItem {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub is_packed: bool,
    #[serde(default)]
    pub category: ItemCategory,
}

impl PackingItem {
    pub fn new(name: impl Into<String>, category: ItemCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_packed: false,
            category,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewItemInput {
    pub name: String,
    #[serde(default)]
    pub category: ItemCategory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeleteItemsInput {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Clone)]
pub struct CategoryGroup {
    pub category: ItemCategory,
    pub label: &'static str,
    pub icon: &'static str,
    pub items: Vec<PackingItem>,
}

#[derive(Debug, Serialize, Clone)]
pub struct PackingSummary {
    pub packed: usize,
    pub total: usize,
    pub unpacked: usize,
    pub progress: f64,
    pub groups: Vec<CategoryGroup>,
}

// ────────────────────────────────────────────────────────────────────────────
// Reminder
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Reminder {
    pub id: Uuid,
    pub is_enabled: bool,
    pub date: DateTime<Utc>,
    pub check_iron: bool,
    pub check_water: bool,
    pub check_packing_list: bool,
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            is_enabled: false,
            date: Utc::now(),
            check_iron: true,
            check_water: true,
            check_packing_list: true,
        }
    }
}

/// Body of an edit; the reminder keeps its id across edits.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReminderInput {
    pub is_enabled: bool,
    pub date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub check_iron: bool,
    #[serde(default = "default_true")]
    pub check_water: bool,
    #[serde(default = "default_true")]
    pub check_packing_list: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    Disabled,
    Armed,
}

/// A one-shot alert handed to the notification service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NotificationRequest {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ReminderView {
    pub reminder: Reminder,
    pub state: ReminderState,
}

#[derive(Debug, Serialize, Clone)]
pub struct Advisory {
    pub unpacked_items: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub db: String,
}
