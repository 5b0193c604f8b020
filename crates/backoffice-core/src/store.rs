//! Document store contract consumed by every service.
//!
//! Stores deal in raw JSON documents keyed by their `_id`; [`StoreExt`] layers typed
//! helpers for any [`Document`] on top. Field paths use dot notation and fan out through
//! arrays, so `detailedAccounts` matches an array containing the value and
//! `debitEntries.detailed1` matches any line's account.

use std::cmp::Ordering;

use backoffice_domain::{Counter, Document, ObjectId};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::Value as Json;

use crate::{
    pagination::{Page, Pagination},
    CoreError, CoreResult,
};

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Json),
    In(String, Vec<Json>),
    Regex {
        path: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// Inclusive bounds; strings compare lexicographically, numbers numerically.
    Range {
        path: String,
        gte: Option<Json>,
        lte: Option<Json>,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Serialize) -> Self {
        Filter::Eq(path.into(), to_json(value))
    }

    pub fn is_in<T: Serialize>(path: impl Into<String>, values: impl IntoIterator<Item = T>) -> Self {
        Filter::In(path.into(), values.into_iter().map(to_json).collect())
    }

    pub fn id(id: ObjectId) -> Self {
        Filter::eq(ID_FIELD, id)
    }

    /// Case-insensitive substring match on a text field.
    pub fn contains_text(path: impl Into<String>, needle: &str) -> Self {
        Filter::Regex {
            path: path.into(),
            pattern: regex::escape(needle.trim()),
            case_insensitive: true,
        }
    }

    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, other) => other,
            (filter, Filter::All) => filter,
            (Filter::And(mut parts), other) => {
                parts.push(other);
                Filter::And(parts)
            }
            (filter, other) => Filter::And(vec![filter, other]),
        }
    }

    /// Compiles regex patterns once so the matcher can be reused per document.
    pub fn compile(&self) -> CoreResult<Matcher> {
        Ok(match self {
            Filter::All => Matcher::All,
            Filter::Eq(path, value) => Matcher::Eq(path.clone(), value.clone()),
            Filter::In(path, values) => Matcher::In(path.clone(), values.clone()),
            Filter::Regex {
                path,
                pattern,
                case_insensitive,
            } => Matcher::Regex(
                path.clone(),
                RegexBuilder::new(pattern)
                    .case_insensitive(*case_insensitive)
                    .build()?,
            ),
            Filter::Range { path, gte, lte } => {
                Matcher::Range(path.clone(), gte.clone(), lte.clone())
            }
            Filter::And(parts) => Matcher::And(
                parts
                    .iter()
                    .map(Filter::compile)
                    .collect::<CoreResult<Vec<_>>>()?,
            ),
            Filter::Or(parts) => Matcher::Or(
                parts
                    .iter()
                    .map(Filter::compile)
                    .collect::<CoreResult<Vec<_>>>()?,
            ),
        })
    }
}

/// Compiled form of a [`Filter`].
#[derive(Debug)]
pub enum Matcher {
    All,
    Eq(String, Json),
    In(String, Vec<Json>),
    Regex(String, Regex),
    Range(String, Option<Json>, Option<Json>),
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, document: &Json) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Eq(path, expected) => resolve_path(document, path)
                .into_iter()
                .any(|value| value == expected),
            Matcher::In(path, candidates) => resolve_path(document, path)
                .into_iter()
                .any(|value| candidates.contains(value)),
            Matcher::Regex(path, regex) => resolve_path(document, path)
                .into_iter()
                .filter_map(Json::as_str)
                .any(|text| regex.is_match(text)),
            Matcher::Range(path, gte, lte) => {
                resolve_path(document, path).into_iter().any(|value| {
                    let above = gte
                        .as_ref()
                        .map(|bound| compare_json(value, bound) != Ordering::Less)
                        .unwrap_or(true);
                    let below = lte
                        .as_ref()
                        .map(|bound| compare_json(value, bound) != Ordering::Greater)
                        .unwrap_or(true);
                    above && below
                })
            }
            Matcher::And(parts) => parts.iter().all(|part| part.matches(document)),
            Matcher::Or(parts) => parts.iter().any(|part| part.matches(document)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<(String, SortOrder)>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn sorted(path: impl Into<String>, order: SortOrder) -> Self {
        Self {
            sort: vec![(path.into(), order)],
            ..Self::default()
        }
    }

    pub fn first() -> Self {
        Self {
            limit: Some(1),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn paginated(mut self, pagination: Pagination) -> Self {
        self.skip = pagination.skip();
        self.limit = Some(pagination.limit as usize);
        self
    }

    /// Orders documents by the configured sort keys.
    pub fn compare(&self, left: &Json, right: &Json) -> Ordering {
        for (path, order) in &self.sort {
            let lhs = resolve_path(left, path).into_iter().next();
            let rhs = resolve_path(right, path).into_iter().next();
            let ordering = match (lhs, rhs) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => compare_json(a, b),
            };
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Element edit applied to one array field of one document.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayOp {
    /// Appends the value unless an equal element is already present.
    AddToSet(Json),
    /// Removes every element equal to the value.
    Pull(Json),
}

/// In-place array edit that stores apply indivisibly, like `$addToSet`/`$pull`
/// combined with a `$set` of the resulting length.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayUpdate {
    pub field: String,
    pub op: ArrayOp,
    pub length_field: Option<String>,
}

impl ArrayUpdate {
    pub fn add_to_set(field: impl Into<String>, value: impl Serialize) -> Self {
        Self {
            field: field.into(),
            op: ArrayOp::AddToSet(to_json(value)),
            length_field: None,
        }
    }

    pub fn pull(field: impl Into<String>, value: impl Serialize) -> Self {
        Self {
            field: field.into(),
            op: ArrayOp::Pull(to_json(value)),
            length_field: None,
        }
    }

    /// Also rewrites `field` with the array's new length.
    pub fn tracking_length(mut self, field: impl Into<String>) -> Self {
        self.length_field = Some(field.into());
        self
    }

    /// Edits `document` and returns the new array length. A missing or null
    /// field counts as an empty array.
    pub fn apply(&self, document: &mut Json) -> CoreResult<usize> {
        let Some(object) = document.as_object_mut() else {
            return Err(CoreError::Validation("array update target is not an object".into()));
        };
        let slot = object
            .entry(self.field.clone())
            .or_insert_with(|| Json::Array(Vec::new()));
        if slot.is_null() {
            *slot = Json::Array(Vec::new());
        }
        let Some(items) = slot.as_array_mut() else {
            return Err(CoreError::Validation(format!(
                "field `{}` is not an array",
                self.field
            )));
        };
        match &self.op {
            ArrayOp::AddToSet(value) => {
                if !items.contains(value) {
                    items.push(value.clone());
                }
            }
            ArrayOp::Pull(value) => items.retain(|item| item != value),
        }
        let length = items.len();
        if let Some(length_field) = &self.length_field {
            object.insert(length_field.clone(), Json::from(length));
        }
        Ok(length)
    }
}

/// Persistence collaborator. Implementations must make `increment_counter` and
/// `seed_counter` indivisible with respect to concurrent callers.
pub trait DocumentStore: Send + Sync {
    /// Inserts a document carrying an `_id`; duplicate ids are a conflict.
    fn insert(&self, collection: &str, document: Json) -> CoreResult<()>;
    fn get(&self, collection: &str, id: &str) -> CoreResult<Option<Json>>;
    /// Replaces an existing document; returns false when it does not exist.
    fn replace(&self, collection: &str, id: &str, document: Json) -> CoreResult<bool>;
    fn delete(&self, collection: &str, id: &str) -> CoreResult<bool>;
    fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> CoreResult<Vec<Json>>;
    fn count(&self, collection: &str, filter: &Filter) -> CoreResult<usize>;
    /// Applies `update` in one step; returns the new array length, or `None`
    /// when the document does not exist.
    fn update_array(&self, collection: &str, id: &str, update: &ArrayUpdate) -> CoreResult<Option<usize>>;
    /// Upserts the counter and returns the incremented value in one step.
    fn increment_counter(&self, key: &str) -> CoreResult<u64>;
    /// Creates the counter at `value` unless it exists; returns whether it was created.
    fn seed_counter(&self, key: &str, value: u64) -> CoreResult<bool>;
    fn counter(&self, key: &str) -> CoreResult<Option<Counter>>;
}

/// Typed helpers over any [`DocumentStore`].
pub trait StoreExt: DocumentStore {
    fn insert_doc<D: Document>(&self, document: &D) -> CoreResult<()> {
        self.insert(D::COLLECTION, serde_json::to_value(document)?)
    }

    fn get_doc<D: Document>(&self, id: ObjectId) -> CoreResult<Option<D>> {
        self.get(D::COLLECTION, &id.to_hex())?
            .map(serde_json::from_value)
            .transpose()
            .map_err(CoreError::from)
    }

    fn replace_doc<D: Document>(&self, document: &D) -> CoreResult<bool> {
        self.replace(
            D::COLLECTION,
            &document.id().to_hex(),
            serde_json::to_value(document)?,
        )
    }

    fn delete_doc<D: Document>(&self, id: ObjectId) -> CoreResult<bool> {
        self.delete(D::COLLECTION, &id.to_hex())
    }

    fn find_docs<D: Document>(&self, filter: &Filter, options: &FindOptions) -> CoreResult<Vec<D>> {
        self.find(D::COLLECTION, filter, options)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(CoreError::from))
            .collect()
    }

    fn find_one<D: Document>(&self, filter: &Filter) -> CoreResult<Option<D>> {
        Ok(self
            .find_docs::<D>(filter, &FindOptions::first())?
            .into_iter()
            .next())
    }

    fn update_doc_array<D: Document>(&self, id: ObjectId, update: &ArrayUpdate) -> CoreResult<Option<usize>> {
        self.update_array(D::COLLECTION, &id.to_hex(), update)
    }

    fn count_docs<D: Document>(&self, filter: &Filter) -> CoreResult<usize> {
        self.count(D::COLLECTION, filter)
    }

    fn find_page<D: Document>(
        &self,
        filter: &Filter,
        options: FindOptions,
        pagination: Pagination,
    ) -> CoreResult<Page<D>> {
        let total = self.count_docs::<D>(filter)?;
        let items = self.find_docs::<D>(filter, &options.paginated(pagination))?;
        Ok(Page::new(items, pagination, total))
    }
}

impl<S: DocumentStore + ?Sized> StoreExt for S {}

pub(crate) fn to_json(value: impl Serialize) -> Json {
    serde_json::to_value(value).unwrap_or(Json::Null)
}

/// Collects every value reachable through a dotted path, fanning out through arrays.
/// A terminal array yields both the array and its elements.
pub fn resolve_path<'a>(document: &'a Json, path: &str) -> Vec<&'a Json> {
    let mut current = vec![document];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Json::Object(map) => {
                    if let Some(child) = map.get(segment) {
                        next.push(child);
                    }
                }
                Json::Array(items) => {
                    for item in items {
                        if let Some(child) = item.as_object().and_then(|map| map.get(segment)) {
                            next.push(child);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    let mut resolved = Vec::with_capacity(current.len());
    for value in current {
        resolved.push(value);
        if let Json::Array(items) = value {
            resolved.extend(items.iter());
        }
    }
    resolved
}

pub fn compare_json(left: &Json, right: &Json) -> Ordering {
    match (left, right) {
        (Json::Number(a), Json::Number(b)) => {
            let a = a.as_f64().unwrap_or_default();
            let b = b.as_f64().unwrap_or_default();
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Json::String(a), Json::String(b)) => a.cmp(b),
        (Json::Bool(a), Json::Bool(b)) => a.cmp(b),
        (Json::Null, Json::Null) => Ordering::Equal,
        (Json::Null, _) => Ordering::Less,
        (_, Json::Null) => Ordering::Greater,
        _ => left.to_string().cmp(&right.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn journal() -> Json {
        json!({
            "_id": "a",
            "documentNumber": "AS0001",
            "date": "2024-02-10",
            "debitEntries": [{"detailed1": "x", "amount": 10.0}, {"detailed1": "y", "detailed2": "z", "amount": 5.0}],
            "tags": ["opening", "manual"]
        })
    }

    #[test]
    fn dotted_paths_fan_out_through_arrays() {
        let doc = journal();
        let values = resolve_path(&doc, "debitEntries.detailed2");
        assert_eq!(values, vec![&json!("z")]);
        assert!(Filter::eq("debitEntries.detailed1", "y")
            .compile()
            .unwrap()
            .matches(&doc));
    }

    #[test]
    fn equality_on_array_field_matches_membership() {
        let doc = journal();
        assert!(Filter::eq("tags", "manual").compile().unwrap().matches(&doc));
        assert!(!Filter::eq("tags", "closing").compile().unwrap().matches(&doc));
    }

    #[test]
    fn range_and_regex_filters_combine() {
        let doc = journal();
        let filter = Filter::Range {
            path: "date".into(),
            gte: Some(json!("2024-02-01")),
            lte: Some(json!("2024-02-29")),
        }
        .and(Filter::contains_text("documentNumber", "as00"));
        assert!(filter.compile().unwrap().matches(&doc));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let filter = Filter::Regex {
            path: "name".into(),
            pattern: "(".into(),
            case_insensitive: false,
        };
        assert!(matches!(filter.compile(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn descending_sort_orders_codes() {
        let options = FindOptions::sorted("code", SortOrder::Descending);
        let low = json!({"code": "01"});
        let high = json!({"code": "02"});
        assert_eq!(options.compare(&high, &low), Ordering::Less);
    }

    #[test]
    fn array_updates_keep_a_set_and_its_length() {
        let mut doc = json!({"_id": "f", "detailedAccounts": ["a"], "detailedCount": 1});
        let add = ArrayUpdate::add_to_set("detailedAccounts", "b").tracking_length("detailedCount");

        assert_eq!(add.apply(&mut doc).unwrap(), 2);
        assert_eq!(add.apply(&mut doc).unwrap(), 2);
        assert_eq!(doc["detailedAccounts"], json!(["a", "b"]));

        let pull = ArrayUpdate::pull("detailedAccounts", "a").tracking_length("detailedCount");
        assert_eq!(pull.apply(&mut doc).unwrap(), 1);
        assert_eq!(doc["detailedCount"], json!(1));

        let mut fresh = json!({"_id": "g"});
        assert_eq!(ArrayUpdate::add_to_set("tags", "x").apply(&mut fresh).unwrap(), 1);
        let mut scalar = json!({"_id": "h", "tags": 3});
        assert!(matches!(
            ArrayUpdate::add_to_set("tags", "x").apply(&mut scalar),
            Err(CoreError::Validation(_))
        ));
    }
}
