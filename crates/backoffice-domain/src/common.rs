//! Shared traits, identifiers and enums for back office documents.

use std::{fmt, str::FromStr};

use chrono::{DateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

const OBJECT_ID_BYTES: usize = 12;

/// Twelve-byte document identifier rendered as 24 lowercase hex characters.
///
/// The first four bytes hold the big-endian creation timestamp in seconds,
/// the remaining eight are random.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_BYTES]);

impl ObjectId {
    /// Generates a fresh identifier stamped with the current time.
    pub fn new() -> Self {
        let mut bytes = [0u8; OBJECT_ID_BYTES];
        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&Uuid::new_v4().as_bytes()[..8]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; OBJECT_ID_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; OBJECT_ID_BYTES] {
        self.0
    }

    /// Parses a 24-character hex string.
    pub fn parse_str(value: &str) -> Result<Self, ObjectIdError> {
        let trimmed = value.trim();
        if trimmed.len() != OBJECT_ID_BYTES * 2 {
            return Err(ObjectIdError::InvalidLength(trimmed.len()));
        }
        let mut bytes = [0u8; OBJECT_ID_BYTES];
        for (idx, chunk) in trimmed.as_bytes().chunks(2).enumerate() {
            let high = hex_value(chunk[0]).ok_or(ObjectIdError::InvalidCharacter)?;
            let low = hex_value(chunk[1]).ok_or(ObjectIdError::InvalidCharacter)?;
            bytes[idx] = (high << 4) | low;
        }
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{:02x}", byte)).collect()
    }

    /// Creation time encoded in the leading four bytes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let mut seconds = [0u8; 4];
        seconds.copy_from_slice(&self.0[..4]);
        Utc.timestamp_opt(u32::from_be_bytes(seconds) as i64, 0)
            .single()
            .unwrap_or_default()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ObjectId::parse_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectIdError {
    InvalidLength(usize),
    InvalidCharacter,
}

impl fmt::Display for ObjectIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectIdError::InvalidLength(len) => {
                write!(f, "object id must be 24 hex characters, got {len}")
            }
            ObjectIdError::InvalidCharacter => f.write_str("object id contains non-hex characters"),
        }
    }
}

impl std::error::Error for ObjectIdError {}

/// Exposes a stable identifier for stored documents.
pub trait Identifiable {
    fn id(&self) -> ObjectId;
}

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Entities carrying an allocated code.
pub trait Coded {
    /// Stored field holding the code.
    const CODE_FIELD: &'static str = "code";

    fn code(&self) -> &str;
}

/// Binds a domain type to its collection in the document store.
///
/// `MODEL` is the model name used when composing counter keys.
pub trait Document: Identifiable + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const MODEL: &'static str;
}

/// Levels of the chart of accounts, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HierarchyLevel {
    AccountGroup,
    TotalAccount,
    FixedAccount,
    DetailedAccount,
}

impl HierarchyLevel {
    /// Width of the full code at this level.
    pub fn code_width(self) -> usize {
        match self {
            HierarchyLevel::AccountGroup => 2,
            HierarchyLevel::TotalAccount => 4,
            HierarchyLevel::FixedAccount => 6,
            HierarchyLevel::DetailedAccount => 8,
        }
    }

    /// Digits appended to the parent code; detailed codes are not prefixed.
    pub fn sequence_width(self) -> usize {
        match self {
            HierarchyLevel::DetailedAccount => 8,
            _ => 2,
        }
    }

    pub fn parent(self) -> Option<HierarchyLevel> {
        match self {
            HierarchyLevel::AccountGroup => None,
            HierarchyLevel::TotalAccount => Some(HierarchyLevel::AccountGroup),
            HierarchyLevel::FixedAccount => Some(HierarchyLevel::TotalAccount),
            HierarchyLevel::DetailedAccount => Some(HierarchyLevel::FixedAccount),
        }
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HierarchyLevel::AccountGroup => "account group",
            HierarchyLevel::TotalAccount => "total account",
            HierarchyLevel::FixedAccount => "fixed account",
            HierarchyLevel::DetailedAccount => "detailed account",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_hex_is_24_chars_and_parses_back() {
        let id = ObjectId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 24);
        assert_eq!(ObjectId::parse_str(&hex).unwrap(), id);
    }

    #[test]
    fn object_id_rejects_malformed_input() {
        assert_eq!(
            ObjectId::parse_str("abc"),
            Err(ObjectIdError::InvalidLength(3))
        );
        assert_eq!(
            ObjectId::parse_str("zzzzzzzzzzzzzzzzzzzzzzzz"),
            Err(ObjectIdError::InvalidCharacter)
        );
    }

    #[test]
    fn object_id_serializes_as_plain_string() {
        let id = ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"65a1f0c2e4b0a1b2c3d4e5f6\"");
        assert_eq!(id.timestamp().timestamp(), 0x65a1f0c2);
    }
}
