// Canned-response `Api` used by the unit tests.

use std::cell::RefCell;
use std::collections::HashMap;

use reqwest::StatusCode;
use serde_json::Value;

use crate::api::{Api, Method};
use crate::error::{HabitsError, Result};

#[derive(Default)]
pub struct FakeApi {
    responses: HashMap<String, Value>,
    failures: HashMap<String, (u16, String)>,
    calls: RefCell<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `"GET /user"`-style requests with `body`.
    pub fn on(mut self, route: &str, body: Value) -> Self {
        self.responses.insert(route.to_string(), body);
        self
    }

    /// Fail `route` with an HTTP error carrying `message`.
    pub fn fail(mut self, route: &str, status: u16, message: &str) -> Self {
        self.failures
            .insert(route.to_string(), (status, message.to_string()));
        self
    }

    /// Routes requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Api for FakeApi {
    fn request(&self, method: Method, path: &str, _body: Option<&Value>) -> Result<Value> {
        let route = format!("{method} {path}");
        self.calls.borrow_mut().push(route.clone());
        if let Some((status, message)) = self.failures.get(&route) {
            return Err(HabitsError::Http {
                status: *status,
                reason: StatusCode::from_u16(*status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown")
                    .into(),
                url: format!("https://habitica.test/api/v3{path}"),
                message: Some(message.clone()),
            });
        }
        match self.responses.get(&route) {
            Some(body) => Ok(body.clone()),
            None => panic!("unexpected request: {route}"),
        }
    }
}

#[test]
fn default_methods_route_through_request() {
    let api = FakeApi::new()
        .on("PUT /tasks/x", serde_json::json!({"data": {}}))
        .on("DELETE /tasks/x", serde_json::json!({"data": {}}));
    api.put("/tasks/x", None).unwrap();
    api.delete("/tasks/x").unwrap();
    assert_eq!(api.calls(), ["PUT /tasks/x", "DELETE /tasks/x"]);
}

#[test]
fn failures_carry_the_matching_reason() {
    let api = FakeApi::new().fail("GET /user", 401, "There is no account that uses those credentials.");
    let err = api.get("/user").unwrap_err();
    assert!(
        err.to_string().starts_with("401 Client Error: Unauthorized for URL:"),
        "{err}"
    );
}
