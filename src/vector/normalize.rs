//! Rewrites non-deterministic request and response fields to stable values.
//!
//! Dispatch is structural over a closed set of rules. Every rule that
//! matches is applied; anything no rule matches passes through unchanged.
//! All rules are idempotent, so a value may be normalized more than once.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::ports::{Request, Response};

/// Height written into every event of an `events` response.
pub const NORMALIZED_HEIGHT: u64 = 1;

/// Session-scoped mapping between original subscription ids and the small
/// counters that replace them.
///
/// The normalized form of an original id is its insertion index, rendered
/// as a decimal string. Every substitution is remembered together with the
/// id of the response that carried it, so a response that was already
/// normalized keeps its counter while a live id that merely looks like a
/// counter still gets one of its own.
#[derive(Debug, Default)]
pub struct SubstitutionTable {
    originals: Vec<String>,
    by_original: HashMap<String, usize>,
    emitted: HashSet<(String, String)>,
}

impl SubstitutionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the normalized id for `id` carried by response `response_id`,
    /// allocating the next counter when `id` has never been seen.
    pub fn substitute(&mut self, response_id: &str, id: &str) -> String {
        let carried = (response_id.to_string(), id.to_string());
        if self.emitted.contains(&carried) {
            return id.to_string();
        }
        let index = match self.by_original.get(id) {
            Some(index) => *index,
            None => {
                let index = self.originals.len();
                self.originals.push(id.to_string());
                self.by_original.insert(id.to_string(), index);
                index
            }
        };
        let normalized = index.to_string();
        self.emitted.insert((carried.0, normalized.clone()));
        normalized
    }

    /// Looks up the original id behind a normalized one.
    #[must_use]
    pub fn original(&self, normalized: &str) -> Option<&str> {
        normalized
            .parse::<usize>()
            .ok()
            .filter(|index| index.to_string() == normalized)
            .and_then(|index| self.originals.get(index))
            .map(String::as_str)
    }

    /// Looks up the normalized id already issued for an original one.
    #[must_use]
    pub fn normalized(&self, original: &str) -> Option<String> {
        self.by_original.get(original).map(ToString::to_string)
    }

    /// Number of substitutions issued so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// Whether no substitution has been issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

/// Response shapes that carry non-deterministic data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseRule {
    /// `result.events` is an array of events with block heights.
    EventHeights,
    /// `result.subId` is a freshly allocated subscription id.
    SubscriptionId,
    /// `result.TxHash` is a transaction hash; replaced by the response id.
    TxHash,
}

impl ResponseRule {
    /// Every response rule, in application order.
    pub const ALL: [ResponseRule; 3] =
        [ResponseRule::EventHeights, ResponseRule::SubscriptionId, ResponseRule::TxHash];

    /// Whether the response has the shape this rule rewrites.
    #[must_use]
    pub fn matches(self, response: &Response) -> bool {
        let Some(result) = response.result.as_ref() else {
            return false;
        };
        match self {
            ResponseRule::EventHeights => result.get("events").is_some_and(Value::is_array),
            ResponseRule::SubscriptionId => result.get("subId").is_some_and(Value::is_string),
            ResponseRule::TxHash => result.get("TxHash").is_some_and(Value::is_string),
        }
    }
}

/// Request shapes that reference a substituted id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestRule {
    /// `params.subId` names a subscription.
    SubscriptionRef,
}

impl RequestRule {
    /// Returns the referenced id when the request has this rule's shape.
    #[must_use]
    pub fn subject(self, request: &Request) -> Option<&str> {
        match self {
            RequestRule::SubscriptionRef => request.params.get("subId").and_then(Value::as_str),
        }
    }
}

/// Applies the normalization rules using a session-owned substitution table.
#[derive(Debug, Default)]
pub struct Normalizer {
    table: SubstitutionTable,
}

impl Normalizer {
    /// Creates a normalizer with a fresh substitution table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The substitutions issued so far.
    #[must_use]
    pub fn table(&self) -> &SubstitutionTable {
        &self.table
    }

    /// Rewrites a request into its persisted form: original subscription ids
    /// are replaced by the normalized ids issued for them.
    #[must_use]
    pub fn normalize_request(&self, mut request: Request) -> Request {
        let replacement = RequestRule::SubscriptionRef
            .subject(&request)
            .and_then(|id| self.table.normalized(id));
        if let Some(id) = replacement {
            request.params["subId"] = Value::String(id);
        }
        request
    }

    /// Rewrites a request into its live form: normalized subscription ids are
    /// translated back to the originals before forwarding.
    #[must_use]
    pub fn resolve_request(&self, mut request: Request) -> Request {
        let replacement = RequestRule::SubscriptionRef
            .subject(&request)
            .and_then(|id| self.table.original(id))
            .map(ToString::to_string);
        if let Some(id) = replacement {
            request.params["subId"] = Value::String(id);
        }
        request
    }

    /// Rewrites every non-deterministic field a response carries.
    pub fn normalize_response(&mut self, mut response: Response) -> Response {
        for rule in ResponseRule::ALL {
            if rule.matches(&response) {
                self.apply(rule, &mut response);
            }
        }
        response
    }

    fn apply(&mut self, rule: ResponseRule, response: &mut Response) {
        let id = response.id.clone();
        let Some(result) = response.result.as_mut() else {
            return;
        };
        match rule {
            ResponseRule::EventHeights => {
                if let Some(events) = result.get_mut("events").and_then(Value::as_array_mut) {
                    for log in events.iter_mut().filter_map(|e| e.get_mut("EventDataLog")) {
                        if let Some(log) = log.as_object_mut() {
                            log.insert("Height".to_string(), Value::from(NORMALIZED_HEIGHT));
                        }
                    }
                }
            }
            ResponseRule::SubscriptionId => {
                if let Some(original) = result.get("subId").and_then(Value::as_str) {
                    let normalized = self.table.substitute(&id, original);
                    result["subId"] = Value::String(normalized);
                }
            }
            ResponseRule::TxHash => {
                result["TxHash"] = Value::String(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn events_response(height: u64) -> Response {
        Response::ok(
            "4",
            json!({"events": [{"EventDataLog": {"Height": height, "Address": "00AB"}}]}),
        )
    }

    #[test]
    fn event_heights_are_replaced_with_sentinel() {
        let mut normalizer = Normalizer::new();
        let response = normalizer.normalize_response(events_response(58213));
        assert_eq!(
            response.result,
            Some(json!({"events": [{"EventDataLog": {"Height": 1, "Address": "00AB"}}]}))
        );
    }

    #[test]
    fn events_without_log_data_are_left_alone() {
        let mut normalizer = Normalizer::new();
        let raw = Response::ok("4", json!({"events": [{"Other": {"Height": 9}}]}));
        assert_eq!(normalizer.normalize_response(raw.clone()), raw);
    }

    #[test]
    fn subscription_ids_become_counters_and_resolve_back() {
        let mut normalizer = Normalizer::new();
        let first = normalizer.normalize_response(Response::ok("1", json!({"subId": "abc123"})));
        let second = normalizer.normalize_response(Response::ok("2", json!({"subId": "def456"})));
        assert_eq!(first.result, Some(json!({"subId": "0"})));
        assert_eq!(second.result, Some(json!({"subId": "1"})));

        let request = Request::new("3", "eventPoll", json!({"subId": "0"}));
        let live = normalizer.resolve_request(request);
        assert_eq!(live.params, json!({"subId": "abc123"}));
    }

    #[test]
    fn persisted_requests_use_normalized_ids() {
        let mut normalizer = Normalizer::new();
        normalizer.normalize_response(Response::ok("1", json!({"subId": "abc123"})));
        let request = Request::new("2", "eventUnsubscribe", json!({"subId": "abc123"}));
        assert_eq!(normalizer.normalize_request(request).params, json!({"subId": "0"}));
    }

    #[test]
    fn unknown_subscription_references_pass_through() {
        let normalizer = Normalizer::new();
        let request = Request::new("2", "eventPoll", json!({"subId": "7"}));
        assert_eq!(normalizer.resolve_request(request.clone()), request);
        assert_eq!(normalizer.normalize_request(request.clone()), request);
    }

    #[test]
    fn tx_hash_is_replaced_by_response_id() {
        let mut normalizer = Normalizer::new();
        let response = normalizer.normalize_response(Response::ok(
            "12",
            json!({"TxHash": "9F86D081884C7D65", "CreatesContract": 0}),
        ));
        assert_eq!(response.result, Some(json!({"TxHash": "12", "CreatesContract": 0})));
    }

    #[test]
    fn normalization_is_idempotent() {
        let responses = vec![
            events_response(77),
            Response::ok("1", json!({"subId": "abc123"})),
            Response::ok("2", json!({"TxHash": "FFEE"})),
            Response::ok("3", json!({"unrelated": [1, 2, 3]})),
        ];
        let mut normalizer = Normalizer::new();
        for raw in responses {
            let once = normalizer.normalize_response(raw);
            let twice = normalizer.normalize_response(once.clone());
            assert_eq!(twice, once);
        }
        assert_eq!(normalizer.table().len(), 1);
    }

    #[test]
    fn repeated_original_id_reuses_its_counter() {
        let mut table = SubstitutionTable::new();
        assert_eq!(table.substitute("1", "abc"), "0");
        assert_eq!(table.substitute("4", "abc"), "0");
        assert_eq!(table.substitute("5", "xyz"), "1");
        assert_eq!(table.original("01"), None);
    }

    #[test]
    fn live_id_shaped_like_a_counter_gets_its_own_counter() {
        let mut normalizer = Normalizer::new();
        let first = normalizer.normalize_response(Response::ok("1", json!({"subId": "abc123"})));
        let second = normalizer.normalize_response(Response::ok("2", json!({"subId": "0"})));
        assert_eq!(first.result, Some(json!({"subId": "0"})));
        assert_eq!(second.result, Some(json!({"subId": "1"})));

        let poll_first = normalizer.resolve_request(Request::new("3", "eventPoll", json!({"subId": "0"})));
        let poll_second = normalizer.resolve_request(Request::new("4", "eventPoll", json!({"subId": "1"})));
        assert_eq!(poll_first.params, json!({"subId": "abc123"}));
        assert_eq!(poll_second.params, json!({"subId": "0"}));

        assert_eq!(normalizer.normalize_response(second.clone()), second);
    }

    #[test]
    fn error_responses_pass_through() {
        let mut normalizer = Normalizer::new();
        let raw = Response::err(
            "5",
            crate::ports::RpcFault { code: -32601, message: "no such method".into(), data: None },
        );
        assert_eq!(normalizer.normalize_response(raw.clone()), raw);
    }
}
