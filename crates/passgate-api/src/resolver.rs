//! Ordered field lookup across request and response values.
//!
//! Callers put the password and the stored hash in different places, so both are
//! found by walking a fixed list of `(container, field)` lookups and taking the first
//! non-blank string. The order is part of the public contract. The same list renders
//! the "Should be in ..." part of error messages, so the two can never drift apart.

use passgate_common::validation::{non_empty_array, string_property};
use serde_json::{Map, Value};

use crate::pipeline::ResponseState;

/// Field names tried, in order, in every container.
pub const PASSWORD_FIELDS: [&str; 3] = ["password", "pwd", "pwdHash"];

/// One place a value may live.
#[derive(Debug, Clone, Copy)]
struct Lookup<'a> {
    label: &'static str,
    container: Option<&'a Map<String, Value>>,
    field: &'static str,
}

/// An ordered list of lookups, tried first to last.
#[derive(Debug, Clone, Default)]
pub struct FieldResolver<'a> {
    lookups: Vec<Lookup<'a>>,
}

impl<'a> FieldResolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one lookup per field, in the given order, against `container`.
    pub fn source(
        mut self,
        label: &'static str,
        container: Option<&'a Map<String, Value>>,
        fields: &[&'static str],
    ) -> Self {
        self.lookups.extend(fields.iter().map(|&field| Lookup {
            label,
            container,
            field,
        }));
        self
    }

    /// First non-blank string value, if any.
    pub fn resolve(&self) -> Option<&'a str> {
        self.lookups
            .iter()
            .find_map(|l| l.container.and_then(|c| string_property(c, l.field)))
    }

    /// Every accepted location, e.g. `body.password or body.pwd`.
    pub fn locations(&self) -> String {
        self.lookups
            .iter()
            .map(|l| format!("{}.{}", l.label, l.field))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// First element of a non-empty collection, when it is an object.
pub fn first_row(rows: Option<&Value>) -> Option<&Map<String, Value>> {
    non_empty_array(rows)
        .and_then(|items| items.first())
        .and_then(Value::as_object)
}

/// Candidate password: `body.password`, `body.pwd`, `body.pwdHash`.
pub fn password_resolver(body: &Value) -> FieldResolver<'_> {
    FieldResolver::new().source("body", body.as_object(), &PASSWORD_FIELDS)
}

/// Stored hash: `rows[0]`, then the response's direct fields, then `locals.rows[0]`.
pub fn hash_resolver(response: &ResponseState) -> FieldResolver<'_> {
    FieldResolver::new()
        .source("rows[0]", first_row(Some(&response.rows)), &PASSWORD_FIELDS)
        .source("res", Some(&response.fields), &PASSWORD_FIELDS)
        .source(
            "locals.rows[0]",
            first_row(response.locals.get("rows")),
            &PASSWORD_FIELDS,
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> ResponseState {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn password_prefers_password_over_pwd() {
        let body = json!({ "pwdHash": "c", "pwd": "b", "password": "a" });
        assert_eq!(password_resolver(&body).resolve(), Some("a"));

        let body = json!({ "pwdHash": "c", "pwd": "b" });
        assert_eq!(password_resolver(&body).resolve(), Some("b"));

        let body = json!({ "pwdHash": "c" });
        assert_eq!(password_resolver(&body).resolve(), Some("c"));
    }

    #[test]
    fn blank_and_non_string_values_fall_through() {
        let body = json!({ "password": "   ", "pwd": 1234, "pwdHash": "x" });
        assert_eq!(password_resolver(&body).resolve(), Some("x"));
        assert_eq!(password_resolver(&json!(null)).resolve(), None);
        assert_eq!(password_resolver(&json!(["password"])).resolve(), None);
    }

    #[test]
    fn rows_outrank_direct_fields_and_locals() {
        let res = response(json!({
            "rows": [{ "pwd": "from-rows" }],
            "password": "from-res",
            "locals": { "rows": [{ "password": "from-locals" }] }
        }));
        assert_eq!(hash_resolver(&res).resolve(), Some("from-rows"));
    }

    #[test]
    fn direct_fields_outrank_locals() {
        let res = response(json!({
            "rows": [],
            "pwdHash": "from-res",
            "locals": { "rows": [{ "password": "from-locals" }] }
        }));
        assert_eq!(hash_resolver(&res).resolve(), Some("from-res"));
    }

    #[test]
    fn invalid_rows_fall_back_to_locals() {
        let res = response(json!({
            "rows": [{ "password": null, "pwd": "", "pwdHash": 3 }],
            "locals": { "rows": [{ "pwdHash": "from-locals" }] }
        }));
        assert_eq!(hash_resolver(&res).resolve(), Some("from-locals"));

        let res = response(json!({ "rows": "nope", "locals": { "rows": [] } }));
        assert_eq!(hash_resolver(&res).resolve(), None);
    }

    #[test]
    fn only_the_first_row_is_consulted() {
        let res = response(json!({ "rows": [{ "name": "a" }, { "password": "second" }] }));
        assert_eq!(hash_resolver(&res).resolve(), None);
    }

    #[test]
    fn locations_follow_lookup_order() {
        assert_eq!(
            password_resolver(&Value::Null).locations(),
            "body.password or body.pwd or body.pwdHash"
        );
        let res = ResponseState::default();
        assert_eq!(
            hash_resolver(&res).locations(),
            "rows[0].password or rows[0].pwd or rows[0].pwdHash or \
             res.password or res.pwd or res.pwdHash or \
             locals.rows[0].password or locals.rows[0].pwd or locals.rows[0].pwdHash"
        );
    }
}
