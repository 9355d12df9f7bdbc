use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A project category. Exactly one fixed category exists ("Tous"), always at
/// index 0 of any ordered listing; it cannot be renamed, moved or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_system_image")]
    pub system_image: String,
    #[serde(default)]
    pub is_fixed: bool,
}

fn default_system_image() -> String {
    "folder".to_string()
}

impl Category {
    /// Well-known id of the fixed "all projects" pseudo-category. Projects
    /// with no category belong here.
    pub const ALL_ID: Uuid = Uuid::from_u128(0xaa);

    pub fn all() -> Self {
        Self {
            id: Self::ALL_ID,
            name: "Tous".to_string(),
            system_image: "tray.full.fill".to_string(),
            is_fixed: true,
        }
    }

    pub fn new(name: impl Into<String>, system_image: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            system_image: system_image.into(),
            is_fixed: false,
        }
    }
}
