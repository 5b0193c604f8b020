use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FiscalYear {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub closed: bool,
    pub created_at: DateTime<Utc>,
}

impl FiscalYear {
    pub fn new(name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            start,
            end,
            closed: false,
            created_at: Utc::now(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl Identifiable for FiscalYear {
    fn id(&self) -> ObjectId {
        self.id
    }
}

impl NamedEntity for FiscalYear {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Document for FiscalYear {
    const COLLECTION: &'static str = "fiscalyears";
    const MODEL: &'static str = "FiscalYear";
}
