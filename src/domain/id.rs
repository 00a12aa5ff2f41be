use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MarketError;

/// Payment-provider authorization identifier (`pi_xxx`). One hold per bid.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldId(String);

impl HoldId {
    pub fn new(id: impl Into<String>) -> Result<Self, MarketError> {
        let id = id.into();
        if !id.starts_with("pi_") {
            return Err(MarketError::Validation(format!(
                "HoldId must start with pi_, got: {id}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Video room name. Deterministic per purchased slot (`call-{uuid}`), which
/// is how webhook events are mapped back to a slot.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    pub fn for_slot(purchased_slot_id: Uuid) -> Self {
        Self(format!("call-{purchased_slot_id}"))
    }

    pub fn parse(name: impl Into<String>) -> Result<Self, MarketError> {
        let name = name.into();
        if Self::slot_id_of(&name).is_none() {
            return Err(MarketError::Validation(format!(
                "RoomName must be call-<uuid>, got: {name}"
            )));
        }
        Ok(Self(name))
    }

    pub fn purchased_slot_id(&self) -> Uuid {
        Self::slot_id_of(&self.0).expect("validated at construction")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn slot_id_of(name: &str) -> Option<Uuid> {
        name.strip_prefix("call-")?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_id_requires_pi_prefix() {
        assert!(HoldId::new("pi_123").is_ok());
        assert!(HoldId::new("re_123").is_err());
        assert!(HoldId::new("").is_err());
    }

    #[test]
    fn room_name_round_trips_slot_id() {
        let slot = Uuid::now_v7();
        let name = RoomName::for_slot(slot);
        assert_eq!(name.purchased_slot_id(), slot);

        let parsed = RoomName::parse(name.as_str().to_string()).unwrap();
        assert_eq!(parsed.purchased_slot_id(), slot);
    }

    #[test]
    fn room_name_rejects_foreign_names() {
        assert!(RoomName::parse("lobby").is_err());
        assert!(RoomName::parse("call-not-a-uuid").is_err());
    }
}
