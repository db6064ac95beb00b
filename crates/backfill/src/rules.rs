//! Per-collection default rules.
//!
//! Each rule inspects a document's current field mapping and returns a
//! [`Patch`] containing only the fields that need a default. Every rule is
//! idempotent: once a field holds its default, the rule's condition is
//! false on the next pass, so re-running a migration over an
//! already-migrated dataset produces empty patches everywhere.

use serde_json::{json, Map, Value};

use crate::Patch;

/// Returns `true` when a field value counts as absent for defaulting.
///
/// Absent means: missing key, `null`, `false`, numeric zero, or the empty
/// string. Empty objects and empty arrays are present values and are
/// never treated as absent.
pub fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => false,
    }
}

/// Default rule for the `users` collection.
///
/// Sets `role` to `"agent"` when it is absent, and `isOnline` to `false`
/// when the key is missing entirely.
///
/// Note the coupling: `isOnline` is only defaulted when `role` was
/// defaulted in this same pass. A user whose `role` is already `"agent"`
/// but who has no `isOnline` field is left alone. This mirrors the
/// upstream migration literally; it looks unintended there, but until
/// product intent says otherwise the behavior is preserved as-is.
pub fn user_defaults(data: &Map<String, Value>) -> Patch {
    let mut patch = Patch::new();
    if is_falsy(data.get("role")) {
        patch.set("role", json!("agent"));
        if !data.contains_key("isOnline") {
            patch.set("isOnline", json!(false));
        }
    }
    patch
}

/// Default rule for the `queries` collection.
///
/// Sets `status` to `"pending"` when it is absent, and each of the
/// assignment/resolution fields to `null` when the key is missing. The
/// assignment fields check key presence, not falsiness: an explicit
/// `null` already satisfies the default and is not rewritten.
pub fn query_defaults(data: &Map<String, Value>) -> Patch {
    let mut patch = Patch::new();
    if is_falsy(data.get("status")) {
        patch.set("status", json!("pending"));
    }
    for field in ["assignedTo", "assignedBy", "assignedAt", "resolvedAt"] {
        if !data.contains_key(field) {
            patch.set(field, Value::Null);
        }
    }
    patch
}

/// Default rule for the `chats` collection.
///
/// Sets `participants` to an empty mapping when it is absent. An
/// intentionally empty `participants` object is a present value and is
/// not rewritten, which is also what makes the rule idempotent.
pub fn chat_defaults(data: &Map<String, Value>) -> Patch {
    let mut patch = Patch::new();
    if is_falsy(data.get("participants")) {
        patch.set("participants", json!({}));
    }
    patch
}

/// Default rule for the `messages` collection.
///
/// Sets `status` to `"sent"` when it is absent (including the falsy empty
/// string).
pub fn message_defaults(data: &Map<String, Value>) -> Patch {
    let mut patch = Patch::new();
    if is_falsy(data.get("status")) {
        patch.set("status", json!("sent"));
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be a JSON object"),
        }
    }

    /// Applies a patch the way a merge-update would, then re-runs the rule.
    fn second_pass(
        rule: fn(&Map<String, Value>) -> Patch,
        mut data: Map<String, Value>,
    ) -> Patch {
        let patch = rule(&data);
        for (field, value) in patch.as_map() {
            data.insert(field.clone(), value.clone());
        }
        rule(&data)
    }

    #[test]
    fn test_falsy_table() {
        assert!(is_falsy(None));
        assert!(is_falsy(Some(&Value::Null)));
        assert!(is_falsy(Some(&json!(false))));
        assert!(is_falsy(Some(&json!(0))));
        assert!(is_falsy(Some(&json!(0.0))));
        assert!(is_falsy(Some(&json!(""))));

        assert!(!is_falsy(Some(&json!(true))));
        assert!(!is_falsy(Some(&json!(1))));
        assert!(!is_falsy(Some(&json!("agent"))));
        assert!(!is_falsy(Some(&json!({}))));
        assert!(!is_falsy(Some(&json!([]))));
    }

    #[test]
    fn test_user_missing_role_and_is_online() {
        let patch = user_defaults(&as_map(json!({})));
        assert_eq!(
            patch.into_value(),
            json!({"role": "agent", "isOnline": false})
        );
    }

    #[test]
    fn test_user_role_present_leaves_is_online_alone() {
        let patch = user_defaults(&as_map(json!({"role": "lead"})));
        assert!(patch.is_empty());
    }

    #[test]
    fn test_user_role_already_agent_leaves_is_online_alone() {
        // The quirky coupling: role == "agent" is not falsy, so isOnline
        // is not defaulted even though the key is missing.
        let patch = user_defaults(&as_map(json!({"role": "agent"})));
        assert!(patch.is_empty());
    }

    #[test]
    fn test_user_falsy_role_with_existing_is_online() {
        let patch =
            user_defaults(&as_map(json!({"role": "", "isOnline": true})));
        assert_eq!(patch.into_value(), json!({"role": "agent"}));
    }

    #[test]
    fn test_user_explicit_null_is_online_is_present() {
        // `null` is a present key; only a missing key gets the default.
        let patch =
            user_defaults(&as_map(json!({"role": null, "isOnline": null})));
        assert_eq!(patch.into_value(), json!({"role": "agent"}));
    }

    #[test]
    fn test_query_empty_document_gets_all_defaults() {
        let patch = query_defaults(&as_map(json!({})));
        assert_eq!(
            patch.into_value(),
            json!({
                "status": "pending",
                "assignedTo": null,
                "assignedBy": null,
                "assignedAt": null,
                "resolvedAt": null
            })
        );
    }

    #[test]
    fn test_query_explicit_nulls_are_not_rewritten() {
        let patch = query_defaults(&as_map(json!({
            "status": "resolved",
            "assignedTo": null,
            "assignedBy": "admin-1",
            "assignedAt": null,
            "resolvedAt": null
        })));
        assert!(patch.is_empty());
    }

    #[test]
    fn test_query_falsy_status_zero() {
        let patch = query_defaults(&as_map(json!({
            "status": 0,
            "assignedTo": "agent-1",
            "assignedBy": "admin-1",
            "assignedAt": "2024-01-01",
            "resolvedAt": null
        })));
        assert_eq!(patch.into_value(), json!({"status": "pending"}));
    }

    #[test]
    fn test_chat_missing_participants() {
        let patch = chat_defaults(&as_map(json!({})));
        assert_eq!(patch.into_value(), json!({"participants": {}}));
    }

    #[test]
    fn test_chat_existing_participants_untouched() {
        let patch =
            chat_defaults(&as_map(json!({"participants": {"u1": true}})));
        assert!(patch.is_empty());
    }

    #[test]
    fn test_chat_empty_participants_map_is_not_falsy() {
        // An intentionally empty map is a present value, and rewriting it
        // would make the rule non-idempotent anyway.
        let patch = chat_defaults(&as_map(json!({"participants": {}})));
        assert!(patch.is_empty());
    }

    #[test]
    fn test_message_empty_string_status() {
        let patch = message_defaults(&as_map(json!({"status": ""})));
        assert_eq!(patch.into_value(), json!({"status": "sent"}));
    }

    #[test]
    fn test_message_existing_status_untouched() {
        let patch = message_defaults(&as_map(json!({"status": "read"})));
        assert!(patch.is_empty());
    }

    #[test]
    fn test_all_rules_are_idempotent() {
        let cases: Vec<(fn(&Map<String, Value>) -> Patch, Value)> = vec![
            (user_defaults, json!({})),
            (user_defaults, json!({"role": ""})),
            (user_defaults, json!({"role": null, "isOnline": true})),
            (query_defaults, json!({})),
            (query_defaults, json!({"status": "", "assignedTo": "a"})),
            (chat_defaults, json!({})),
            (chat_defaults, json!({"participants": null})),
            (message_defaults, json!({})),
            (message_defaults, json!({"status": ""})),
        ];

        for (rule, fixture) in cases {
            let repeat = second_pass(rule, as_map(fixture.clone()));
            assert!(
                repeat.is_empty(),
                "second pass over {fixture} produced {repeat}"
            );
        }
    }
}
