use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fallback color used whenever a stored hex string cannot be parsed.
pub const NEUTRAL_COLOR_HEX: &str = "#808080";

/// A project status. The five system statuses ship with the app and can be
/// renamed and recolored, but never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: Uuid,
    pub name: String,
    pub color_hex: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub is_system: bool,
}

impl Status {
    pub const NOT_STARTED_ID: Uuid = Uuid::from_u128(0x01);
    pub const IN_PROGRESS_ID: Uuid = Uuid::from_u128(0x02);
    pub const STANDBY_ID: Uuid = Uuid::from_u128(0x03);
    pub const FINISHING_ID: Uuid = Uuid::from_u128(0x04);
    pub const FINISHED_ID: Uuid = Uuid::from_u128(0x05);

    pub fn new(name: impl Into<String>, color_hex: &str, order: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color_hex: normalize_color_hex(color_hex),
            order,
            is_system: false,
        }
    }

    fn system(id: Uuid, name: &str, color_hex: &str, order: i32) -> Self {
        Self {
            id,
            name: name.to_string(),
            color_hex: color_hex.to_string(),
            order,
            is_system: true,
        }
    }

    /// The five built-in statuses, in display order.
    pub fn defaults() -> Vec<Status> {
        vec![
            Status::system(Self::NOT_STARTED_ID, "Pas commencé", "#808080", 0),
            Status::system(Self::IN_PROGRESS_ID, "En cours", "#007AFF", 1),
            Status::system(Self::STANDBY_ID, "Stand By", "#FF9500", 2),
            Status::system(Self::FINISHING_ID, "Finitions", "#AF52DE", 3),
            Status::system(Self::FINISHED_ID, "Terminé", "#34C759", 4),
        ]
    }
}

/// Normalize a user-supplied color to `#RRGGBB` / `#AARRGGBB` form.
/// Anything that is not six or eight hex digits degrades to the neutral gray
/// instead of failing.
pub fn normalize_color_hex(input: &str) -> String {
    let digits: String = input
        .trim()
        .trim_start_matches('#')
        .chars()
        .collect();

    let valid = matches!(digits.len(), 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        format!("#{}", digits.to_uppercase())
    } else {
        NEUTRAL_COLOR_HEX.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_five_ordered_system_statuses() {
        let defaults = Status::defaults();
        assert_eq!(defaults.len(), 5);
        assert!(defaults.iter().all(|s| s.is_system));
        assert_eq!(defaults[0].id, Status::NOT_STARTED_ID);
        let orders: Vec<i32> = defaults.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_normalize_color_hex_accepts_six_and_eight_digits() {
        assert_eq!(normalize_color_hex("#34C759"), "#34C759");
        assert_eq!(normalize_color_hex("34c759"), "#34C759");
        assert_eq!(normalize_color_hex("#FF34C759"), "#FF34C759");
    }

    #[test]
    fn test_normalize_color_hex_degrades_to_neutral() {
        assert_eq!(normalize_color_hex(""), NEUTRAL_COLOR_HEX);
        assert_eq!(normalize_color_hex("#12345"), NEUTRAL_COLOR_HEX);
        assert_eq!(normalize_color_hex("bleu"), NEUTRAL_COLOR_HEX);
        assert_eq!(normalize_color_hex("#GGGGGG"), NEUTRAL_COLOR_HEX);
    }
}
