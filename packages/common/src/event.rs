use std::fmt;

/// Webhook event families the reconciler knows how to apply.
///
/// Parsing never fails: tags nobody handles become [`EventType::Unknown`], which the
/// reconciler drains as a no-op instead of retrying forever.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    LoadCreated,
    LoadStatusUpdated,
    LoadInfoUpdated,
    LoadDatesUpdated,
    LoadEquipmentUpdated,
    Unknown(String),
}

impl EventType {
    /// Every tag with a dedicated handler.
    pub const KNOWN: &'static [&'static str] = &[
        "load#created",
        "load#status_updated",
        "load#info_updated",
        "load#dates_updated",
        "load#equipment_updated",
    ];

    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "load#created" => Self::LoadCreated,
            "load#status_updated" => Self::LoadStatusUpdated,
            "load#info_updated" => Self::LoadInfoUpdated,
            "load#dates_updated" => Self::LoadDatesUpdated,
            "load#equipment_updated" => Self::LoadEquipmentUpdated,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::LoadCreated => "load#created",
            Self::LoadStatusUpdated => "load#status_updated",
            Self::LoadInfoUpdated => "load#info_updated",
            Self::LoadDatesUpdated => "load#dates_updated",
            Self::LoadEquipmentUpdated => "load#equipment_updated",
            Self::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
