//! Request matching and dispatch.
//!
//! An interception layer (a test harness, a local HTTP shim) turns each outgoing
//! API call into a [`MockRequest`] and hands it to [`Router::dispatch`]. The router
//! picks the first route whose method and path pattern match, runs its
//! [`Handler`] and converts any [`MockError`] into an error envelope. Dispatch
//! never fails: unmatched requests get a not-found envelope.

use crate::config::MockConfig;
use crate::payload::Payload;
use crate::state::MockState;
use cloudmock_core::entity::EntityId;
use cloudmock_core::envelope::Response;
use cloudmock_core::error::MockError;
use cloudmock_core::query::{FILTER_FIELD, ListQuery, PageRequest};
use http::Method;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An intercepted API call.
#[derive(Clone, Debug, PartialEq)]
pub struct MockRequest {
    /// HTTP method
    pub method: Method,
    /// Path without scheme, host or query (`/v4/domains/1`)
    pub path: String,
    /// Query parameters
    pub query: BTreeMap<String, String>,
    /// Headers, keyed by lower-cased name
    pub headers: BTreeMap<String, String>,
    /// JSON body, if any
    pub body: Option<Value>,
}

impl MockRequest {
    /// Builds a request from a method and a URL or path.
    ///
    /// Scheme and host are dropped; a `?query` suffix fills [`MockRequest::query`].
    #[must_use]
    pub fn new(method: Method, url: &str) -> Self {
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        let path_and_query = if url.contains("://") {
            without_scheme
                .find('/')
                .map_or("/", |start| &without_scheme[start..])
        } else {
            url
        };
        let (path, raw_query) = path_and_query
            .split_once('?')
            .unwrap_or((path_and_query, ""));

        let query = raw_query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (key.to_string(), value.to_string())
            })
            .collect();

        Self {
            method,
            path: path.to_string(),
            query,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// `GET url`
    #[must_use]
    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    /// `POST url` with a JSON body
    #[must_use]
    pub fn post(url: &str, body: Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    /// `PUT url` with a JSON body
    #[must_use]
    pub fn put(url: &str, body: Value) -> Self {
        Self::new(Method::PUT, url).with_body(body)
    }

    /// `DELETE url`
    #[must_use]
    pub fn delete(url: &str) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Builder: set the body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Builder: add a query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.query.insert(key.into(), value.to_string());
        self
    }

    /// Builder: add a header
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Builder: set the `X-Filter` header
    #[must_use]
    pub fn with_filter(self, filter: &Value) -> Self {
        self.with_header(FILTER_FIELD, filter.to_string())
    }

    /// Header value, case-insensitive
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A request together with the route it matched.
#[derive(Debug)]
pub struct MatchedRequest<'a> {
    request: &'a MockRequest,
    route: &'static str,
    params: BTreeMap<&'a str, &'a str>,
}

impl<'a> MatchedRequest<'a> {
    /// The underlying request
    #[must_use]
    pub const fn request(&self) -> &'a MockRequest {
        self.request
    }

    /// Name of the matched route
    #[must_use]
    pub const fn route(&self) -> &'static str {
        self.route
    }

    /// A `:name` path parameter.
    ///
    /// # Errors
    ///
    /// [`MockError::Internal`] if the route pattern has no such parameter.
    pub fn param(&self, name: &str) -> Result<&'a str, MockError> {
        self.params
            .get(name)
            .copied()
            .ok_or_else(|| MockError::Internal(format!("route {} has no :{name}", self.route)))
    }

    /// A numeric id path parameter.
    ///
    /// # Errors
    ///
    /// [`MockError::NotFound`] if the segment is not a number; nothing can live
    /// under such an id.
    pub fn id(&self, name: &str) -> Result<EntityId, MockError> {
        let raw = self.param(name)?;
        raw.parse()
            .map_err(|_| MockError::NotFound(format!("{name} {raw}")))
    }

    /// The body, read field by field
    ///
    /// # Errors
    ///
    /// [`MockError::Validation`] if the body is not a JSON object.
    pub fn payload(&self) -> Result<Payload, MockError> {
        Payload::from_body(self.request.body.as_ref())
    }

    /// `page` and `page_size`, with the session's defaults
    ///
    /// # Errors
    ///
    /// [`MockError::Validation`] for malformed values.
    pub fn page_request(&self, config: &MockConfig) -> Result<PageRequest, MockError> {
        PageRequest::parse(
            self.request.query.get("page").map(String::as_str),
            self.request.query.get("page_size").map(String::as_str),
            config.page_size,
            config.max_page_size,
        )
    }

    /// Filter and ordering from the `X-Filter` header
    ///
    /// # Errors
    ///
    /// [`MockError::Validation`] on field `X-Filter` when malformed.
    pub fn list_query(&self) -> Result<ListQuery, MockError> {
        ListQuery::parse(self.request.header(FILTER_FIELD))
    }
}

/// Request handler contract.
///
/// A handler validates its input, performs any store operations, enqueues any
/// event chains and returns a response. A handler that returns an error must not
/// have changed the store or enqueued anything.
pub trait Handler: Send + Sync {
    /// Handles one matched request
    ///
    /// # Errors
    ///
    /// Any [`MockError`]; the router converts it into an error envelope.
    fn handle(&self, state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError>;
}

impl<F> Handler for F
where
    F: Fn(&MockState, &MatchedRequest<'_>) -> Result<Response, MockError> + Send + Sync,
{
    fn handle(&self, state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
        self(state, request)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// One registered route.
pub struct Route {
    name: &'static str,
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    handler: Box<dyn Handler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

impl Route {
    fn new(name: &'static str, method: Method, pattern: &str, handler: Box<dyn Handler>) -> Self {
        let segments = split(pattern)
            .map(|segment| match segment.strip_prefix(':') {
                Some(param) => Segment::Param(param.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            name,
            method,
            pattern: pattern.to_string(),
            segments,
            handler,
        }
    }

    /// Route name (`domains.create`)
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path pattern (`/v4/domains/:id`)
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn matches<'a>(&'a self, request: &'a MockRequest) -> Option<BTreeMap<&'a str, &'a str>> {
        if self.method != request.method {
            return None;
        }
        let parts: Vec<&str> = split(&request.path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {},
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.as_str(), part);
                },
            }
        }
        Some(params)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// Ordered route table. The first matching route wins.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: registers a route
    #[must_use]
    pub fn route(
        mut self,
        name: &'static str,
        method: Method,
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Self {
        self.routes
            .push(Route::new(name, method, pattern, Box::new(handler)));
        self
    }

    /// Builder: drops every route whose name is in `names`
    #[must_use]
    pub fn without(mut self, names: &BTreeSet<String>) -> Self {
        self.routes.retain(|route| {
            let keep = !names.contains(route.name);
            if !keep {
                tracing::info!(route = route.name, "Handler disabled");
            }
            keep
        });
        self
    }

    /// Registered routes, in match order
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Whether a route with this name is registered
    #[must_use]
    pub fn has_route(&self, name: &str) -> bool {
        self.routes.iter().any(|route| route.name == name)
    }

    /// Handles one request.
    ///
    /// Errors raised by the handler become error envelopes; a request no route
    /// matches gets a not-found envelope.
    #[tracing::instrument(
        skip(self, state, request),
        fields(method = %request.method, path = %request.path)
    )]
    pub fn dispatch(&self, state: &MockState, request: &MockRequest) -> Response {
        let matched = self
            .routes
            .iter()
            .find_map(|route| route.matches(request).map(|params| (route, params)));

        let response = match matched {
            None => {
                tracing::debug!("No route matched");
                Response::from(MockError::NotFound(format!(
                    "route {} {}",
                    request.method, request.path
                )))
            },
            Some((route, params)) => {
                let matched = MatchedRequest {
                    request,
                    route: route.name,
                    params,
                };
                match route.handler.handle(state, &matched) {
                    Ok(response) => response,
                    Err(err) => {
                        if matches!(err, MockError::Internal(_)) {
                            tracing::error!(route = route.name, error = %err, "Handler failed");
                        } else {
                            tracing::debug!(route = route.name, error = %err, "Request rejected");
                        }
                        Response::from(err)
                    },
                }
            },
        };

        metrics::counter!("mock.requests", "status" => response.status.as_u16().to_string())
            .increment(1);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudmock_core::envelope::Page;
    use cloudmock_testing::test_clock;
    use http::StatusCode;
    use serde_json::json;

    fn state() -> MockState {
        MockState::new(test_clock(), MockConfig::default())
    }

    fn echo(_: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
        let id = request.id("id")?;
        Response::entity(&json!({"id": id, "route": request.route()}))
    }

    fn special(_: &MockState, _: &MatchedRequest<'_>) -> Result<Response, MockError> {
        Ok(Response::empty())
    }

    fn reject(_: &MockState, _: &MatchedRequest<'_>) -> Result<Response, MockError> {
        Err(MockError::invalid("label", "label is required"))
    }

    fn list(state: &MockState, request: &MatchedRequest<'_>) -> Result<Response, MockError> {
        let page = request.page_request(state.config())?;
        let query = request.list_query()?;
        let items = query.apply(vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})])?;
        Response::page(&page.paginate(items))
    }

    #[test]
    fn request_parses_urls() {
        let request = MockRequest::get("https://api.example.com/v4/domains?page=2&page_size=10");
        assert_eq!(request.path, "/v4/domains");
        assert_eq!(request.query.get("page").map(String::as_str), Some("2"));
        assert_eq!(request.query.get("page_size").map(String::as_str), Some("10"));

        let request = MockRequest::get("/v4/domains/5").with_header("X-Filter", "{}");
        assert_eq!(request.path, "/v4/domains/5");
        assert_eq!(request.header("x-filter"), Some("{}"));
    }

    #[test]
    fn params_are_captured() {
        let router = Router::new().route("things.get", Method::GET, "/v4/things/:id", echo);
        let response = router.dispatch(&state(), &MockRequest::get("/v4/things/42"));
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, json!({"data": {"id": 42, "route": "things.get"}}));
    }

    #[test]
    fn method_and_shape_must_match() {
        let router = Router::new().route("things.get", Method::GET, "/v4/things/:id", echo);
        let state = state();

        for request in [
            MockRequest::delete("/v4/things/42"),
            MockRequest::get("/v4/things"),
            MockRequest::get("/v4/things/42/extra"),
            MockRequest::get("/v4/other/42"),
        ] {
            let response = router.dispatch(&state, &request);
            assert_eq!(response.status, StatusCode::NOT_FOUND, "{request:?}");
        }
    }

    #[test]
    fn non_numeric_id_is_not_found() {
        let router = Router::new().route("things.get", Method::GET, "/v4/things/:id", echo);
        let response = router.dispatch(&state(), &MockRequest::get("/v4/things/abc"));
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn first_match_wins() {
        let router = Router::new()
            .route("things.special", Method::GET, "/v4/things/special", special)
            .route("things.get", Method::GET, "/v4/things/:id", echo);
        let response = router.dispatch(&state(), &MockRequest::get("/v4/things/special"));
        assert_eq!(response.body, json!({}));
    }

    #[test]
    fn handler_errors_become_envelopes() {
        let router = Router::new().route("things.create", Method::POST, "/v4/things", reject);
        let response = router.dispatch(&state(), &MockRequest::post("/v4/things", json!({})));
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.errors()[0].field.as_deref(), Some("label"));
    }

    #[test]
    fn list_helpers_read_query_and_filter() {
        let router = Router::new().route("things.list", Method::GET, "/v4/things", list);
        let state = state();

        let request = MockRequest::get("/v4/things?page_size=1&page=2")
            .with_filter(&json!({"+order_by": "n", "+order": "desc"}));
        let page: Page<Value> = router.dispatch(&state, &request).parse().unwrap();
        assert_eq!(page.data, vec![json!({"n": 2})]);
        assert_eq!(page.pages, 3);

        let bad = MockRequest::get("/v4/things").with_header("X-Filter", "{nope");
        let response = router.dispatch(&state, &bad);
        assert_eq!(response.errors()[0].field.as_deref(), Some(FILTER_FIELD));
    }

    #[test]
    fn without_removes_named_routes() {
        let disabled: BTreeSet<String> = ["things.get".to_string()].into();
        let router = Router::new()
            .route("things.get", Method::GET, "/v4/things/:id", echo)
            .without(&disabled);
        assert!(!router.has_route("things.get"));
        let response = router.dispatch(&state(), &MockRequest::get("/v4/things/1"));
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
