//! Response envelopes for frontends that speak HTTP-style status codes.
//!
//! Successes are `{ <entity>: value }` or `{ <plural>: [...], pagination: {...} }`;
//! failures are `{ error: message }` with the status from [`CoreError::status_code`].

use serde::Serialize;
use serde_json::{json, Map, Value as Json};
use tracing::error;

use crate::{pagination::Page, CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Json,
}

impl ApiResponse {
    pub fn ok<T: Serialize>(entity: &str, value: &T) -> Self {
        Self::single(200, entity, value)
    }

    pub fn created<T: Serialize>(entity: &str, value: &T) -> Self {
        Self::single(201, entity, value)
    }

    pub fn list<T: Serialize>(plural: &str, page: &Page<T>) -> Self {
        let mut body = Map::new();
        body.insert(plural.to_string(), serialize_or_null(&page.items));
        body.insert("pagination".into(), serialize_or_null(&page.pagination));
        Self {
            status: 200,
            body: Json::Object(body),
        }
    }

    pub fn from_error(err: &CoreError) -> Self {
        let status = err.status_code();
        if status >= 500 {
            error!(error = %err, "request failed");
        }
        Self {
            status,
            body: json!({ "error": err.to_string() }),
        }
    }

    /// Wraps a single-entity result.
    pub fn respond<T: Serialize>(entity: &str, result: CoreResult<T>) -> Self {
        match result {
            Ok(value) => Self::ok(entity, &value),
            Err(err) => Self::from_error(&err),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn single<T: Serialize>(status: u16, entity: &str, value: &T) -> Self {
        let mut body = Map::new();
        body.insert(entity.to_string(), serialize_or_null(value));
        Self {
            status,
            body: Json::Object(body),
        }
    }
}

fn serialize_or_null<T: Serialize + ?Sized>(value: &T) -> Json {
    serde_json::to_value(value).unwrap_or(Json::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::Pagination;

    #[test]
    fn list_envelope_carries_pagination() {
        let page = Page::new(vec!["a", "b"], Pagination::new(1, 2).unwrap(), 3);
        let response = ApiResponse::list("groups", &page);
        assert_eq!(response.status, 200);
        assert_eq!(response.body["groups"], json!(["a", "b"]));
        assert_eq!(response.body["pagination"]["totalPages"], 2);
    }

    #[test]
    fn errors_map_to_status_and_message() {
        let response = ApiResponse::respond::<()>(
            "group",
            Err(CoreError::not_found("account group", "abc")),
        );
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        assert_eq!(response.body["error"], "account group not found: abc");
    }

    #[test]
    fn created_wraps_entity() {
        let response = ApiResponse::created("provider", &json!({"code": "PRV0001"}));
        assert_eq!(response.status, 201);
        assert_eq!(response.body["provider"]["code"], "PRV0001");
    }
}
