use serde::{Deserialize, Serialize};

/// Persisted monotonic sequence backing code allocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub sequence_value: u64,
}

impl Counter {
    pub const COLLECTION: &'static str = "counters";

    pub fn new(id: impl Into<String>, sequence_value: u64) -> Self {
        Self {
            id: id.into(),
            sequence_value,
        }
    }

    /// Key for flat per-model sequences: `<Model>_<prefix>`.
    pub fn model_key(model: &str, prefix: &str) -> String {
        format!("{model}_{prefix}")
    }

    /// Key for sequences scoped to a hierarchy parent: `<Model>:<scope>`.
    pub fn scoped_key(model: &str, scope: &str) -> String {
        format!("{model}:{scope}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_documented_shapes() {
        assert_eq!(Counter::model_key("Provider", "PRV"), "Provider_PRV");
        assert_eq!(
            Counter::scoped_key("TotalAccount", "65a1f0c2e4b0a1b2c3d4e5f6"),
            "TotalAccount:65a1f0c2e4b0a1b2c3d4e5f6"
        );
    }
}
