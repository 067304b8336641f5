//! Integration tests for contract validation
//!
//! Tests the complete validation flow:
//! - Envelope and payload errors merged in one result
//! - First-party event types and mandates
//! - Schema reload from disk
//! - Trace correlation of emitted events

use ocn_contracts::{
    activate_from_envelope, inject_into_envelope, CloudEvent, ContractError, ContractValidator,
    ContractsConfig, SchemaCategory, SchemaKey,
};
use ocn_trace::{get_current_trace_id, TraceContext, TraceId};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn validator() -> ContractValidator {
    ContractValidator::new(ContractsConfig::default())
}

fn envelope(event_type: &str, data: Value) -> Value {
    json!({
        "specversion": "1.0",
        "id": "4b1f0e7a-5c5d-4d42-8d7e-0c9f1b2a3d4e",
        "source": "https://agents.ocn.ai/test",
        "type": event_type,
        "subject": "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d",
        "time": "2024-01-21T12:00:00Z",
        "datacontenttype": "application/json",
        "data": data
    })
}

fn decision_data() -> Value {
    json!({
        "result": "APPROVE",
        "amount": 125.5,
        "currency": "USD",
        "risk_score": 0.12,
        "reasons": ["Low risk transaction"],
        "actions": ["Process payment"]
    })
}

fn orion_event() -> Value {
    envelope(
        "ocn.orion.explanation.v1",
        json!({
            "transaction_id": "txn_001",
            "verification_result": {
                "best_rail": "ACH",
                "explanation": "ACH offers the lowest cost for this amount",
                "candidates": [
                    {"rail": "ACH", "score": 0.91, "cost_bps": 25},
                    {"rail": "RTP", "score": 0.74, "cost_bps": 80}
                ]
            }
        }),
    )
}

fn okra_event() -> Value {
    envelope(
        "ocn.okra.bnpl_quote.v1",
        json!({
            "customer_id": "cust_42",
            "quote_result": {
                "approved": true,
                "score": 0.82,
                "limit": 1500,
                "apr": 19.99,
                "term_months": 6,
                "currency": "USD"
            }
        }),
    )
}

fn onyx_event() -> Value {
    envelope(
        "ocn.onyx.kyb_verified.v1",
        json!({
            "entity_id": "biz_7",
            "verification_result": {
                "status": "verified",
                "checks": [
                    {"name": "registry_lookup", "status": "passed"},
                    {"name": "sanctions", "status": "passed"}
                ],
                "verified_at": "2024-01-21T12:00:00Z"
            }
        }),
    )
}

fn write_schema(root: &Path, key: &SchemaKey, text: &str) {
    let path = root.join(key.relative_path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

#[test]
fn test_well_formed_decision() {
    let result = validator()
        .validate_cloudevent_value(&envelope("ocn.orca.decision.v1", decision_data()))
        .unwrap();
    assert!(result.is_valid(), "{:?}", result.errors());
    assert!(result.errors().is_empty());
}

#[test]
fn test_scenario_envelope_and_payload_errors() {
    let event = json!({
        "specversion": "1.0.2",
        "id": "",
        "type": "ocn.orca.decision.v1",
        "source": "s",
        "time": "bad-time",
        "data": {"result": "APPROVE"}
    });

    let result = validator().validate_cloudevent_value(&event).unwrap();
    assert!(!result.is_valid());
    assert!(result.has_path("/id"));
    assert!(result.has_path("/time"));
    assert!(result.has_path("/data/amount"));
    assert!(!result.has_rule("specversion"));
}

#[test]
fn test_missing_id_and_payload_field() {
    let mut event = envelope("ocn.orca.decision.v1", decision_data());
    event.as_object_mut().unwrap().remove("id");
    event["data"].as_object_mut().unwrap().remove("currency");

    let result = validator().validate_cloudevent_value(&event).unwrap();
    let paths: Vec<&str> = result.errors().iter().map(|e| e.path.as_str()).collect();
    assert!(paths.len() >= 2);
    assert!(paths.contains(&"/id"));
    assert!(paths.contains(&"/data/currency"));
}

#[test]
fn test_unknown_type() {
    let result = validator()
        .validate_cloudevent_value(&envelope("ocn.unknown.event.v1", decision_data()))
        .unwrap();
    assert!(!result.is_valid());
    assert_eq!(result.errors().len(), 1);
    assert!(result.errors()[0].message.contains("ocn.unknown.event.v1"));
}

#[test]
fn test_registered_types_have_object_schemas() {
    let validator = validator();
    for event_type in validator.event_types() {
        let schema = validator.schema_for(&event_type).unwrap();
        assert_eq!(schema.top_level_type(), Some("object"), "{}", event_type);
    }
}

#[test]
fn test_phase_two_events_validate() {
    let validator = validator();
    for event in [orion_event(), okra_event(), onyx_event()] {
        let result = validator.validate_cloudevent_value(&event).unwrap();
        assert!(result.is_valid(), "{}: {:?}", event["type"], result.errors());
    }
}

#[test]
fn test_orion_missing_best_rail() {
    let mut event = orion_event();
    event["data"]["verification_result"]
        .as_object_mut()
        .unwrap()
        .remove("best_rail");

    let result = validator().validate_cloudevent_value(&event).unwrap();
    assert!(result.has_path("/data/verification_result/best_rail"));
}

#[test]
fn test_okra_score_out_of_range() {
    let mut event = okra_event();
    event["data"]["quote_result"]["score"] = json!(1.5);

    let result = validator().validate_cloudevent_value(&event).unwrap();
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].path, "/data/quote_result/score");
    assert_eq!(result.errors()[0].schema_rule, "maximum");
}

#[test]
fn test_onyx_invalid_statuses() {
    let validator = validator();

    let mut event = onyx_event();
    event["data"]["verification_result"]["status"] = json!("invalid_status");
    let result = validator.validate_cloudevent_value(&event).unwrap();
    assert!(result.has_path("/data/verification_result/status"));

    let mut event = onyx_event();
    event["data"]["verification_result"]["checks"][0]["status"] = json!("invalid_check_status");
    let result = validator.validate_cloudevent_value(&event).unwrap();
    assert!(result.has_path("/data/verification_result/checks/0/status"));
    assert!(result.has_rule("enum"));
}

#[test]
fn test_specversion_and_content_type() {
    let validator = validator();

    let mut event = orion_event();
    event["specversion"] = json!("2.0");
    assert!(validator
        .validate_cloudevent_value(&event)
        .unwrap()
        .has_path("/specversion"));

    let mut event = okra_event();
    event["datacontenttype"] = json!("application/xml");
    assert!(validator
        .validate_cloudevent_value(&event)
        .unwrap()
        .has_path("/datacontenttype"));
}

#[test]
fn test_malformed_json_text() {
    let text = r#"{"specversion": "1.0", "id": "test", "type": "ocn.orion.explanation.v1""#;
    let result = validator().validate_cloudevent_str(text).unwrap();
    assert!(!result.is_valid());
    assert_eq!(result.errors()[0].schema_rule, "format");
}

#[test]
fn test_reload_after_fixing_schema() {
    let dir = TempDir::new().unwrap();
    let key = SchemaKey::event("ocn.weave.audit.v1");
    write_schema(dir.path(), &key, r#"{"type": "object", "required": ["#);

    let validator = ContractValidator::new(
        ContractsConfig::default().with_schema_root(dir.path()),
    );
    let event = envelope("ocn.weave.audit.v1", json!({"transaction_id": "txn_1"}));

    let err = validator.validate_cloudevent_value(&event).unwrap_err();
    assert!(err.is_configuration_error());
    assert!(matches!(err, ContractError::SchemaParseError { .. }));

    write_schema(
        dir.path(),
        &key,
        r#"{"type": "object", "required": ["transaction_id", "receipt_hash"]}"#,
    );
    validator.reload_schema(&key).unwrap();

    let result = validator.validate_cloudevent_value(&event).unwrap();
    assert_eq!(result.errors().len(), 1);
    assert!(result.has_path("/data/receipt_hash"));
}

#[test]
fn test_schema_root_overrides_bundled_schema() {
    let dir = TempDir::new().unwrap();
    let key = SchemaKey::event("ocn.orca.decision.v1");
    write_schema(dir.path(), &key, r#"{"type": "object", "required": ["merchant_id"]}"#);

    let validator = ContractValidator::new(
        ContractsConfig::default().with_schema_root(dir.path()),
    );
    let result = validator
        .validate_cloudevent_value(&envelope("ocn.orca.decision.v1", decision_data()))
        .unwrap();
    assert!(result.has_path("/data/merchant_id"));

    let available = validator.list_available_schemas();
    assert!(available[&SchemaCategory::Events].contains(&"orca.decision.v1".to_string()));
    assert!(available[&SchemaCategory::Mandates].contains(&"cart_mandate".to_string()));
}

#[test]
fn test_runtime_registration_with_schema_path() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("settlement.json"),
        r#"{"type": "object", "properties": {"amount": {"type": "number", "minimum": 0}}}"#,
    )
    .unwrap();

    let validator = ContractValidator::new(
        ContractsConfig::default().with_schema_root(dir.path()),
    );
    validator.register_event_type(
        "ocn.partner.settlement.v1",
        Some("settlement.json".into()),
        SchemaCategory::Events,
    );

    let result = validator
        .validate_cloudevent_value(&envelope("ocn.partner.settlement.v1", json!({"amount": -5})))
        .unwrap();
    assert!(result.has_path("/data/amount"));
}

#[test]
fn test_mandates() {
    let validator = validator();

    let cart = json!({
        "merchant_id": "m_1",
        "items": [{"sku": "A-1", "quantity": 2, "unit_price": 10.0}],
        "amount": 20.0,
        "currency": "USD"
    });
    assert!(validator.validate_mandate("cart_mandate", &cart).unwrap().is_valid());

    let bad_cart = json!({
        "items": [{"sku": "A-1", "quantity": 0, "unit_price": -1}],
        "amount": 20.0,
        "currency": "USD"
    });
    let result = validator.validate_mandate("cart_mandate", &bad_cart).unwrap();
    assert!(result.has_path("/items/0/quantity"));
    assert!(result.has_path("/items/0/unit_price"));

    let intent = json!({
        "actor": "human",
        "intent_type": "purchase",
        "channel": "web",
        "timestamps": {"created": "2024-01-21T12:00:00Z", "expires": "2024-01-22T12:00:00Z"}
    });
    assert!(validator.validate_mandate("intent_mandate", &intent).unwrap().is_valid());
}

#[tokio::test]
async fn test_trace_flows_from_inbound_event_to_emitted_event() {
    let inbound: CloudEvent = serde_json::from_value(orion_event()).unwrap();
    let inbound_trace = inbound.trace_id().unwrap();

    let emitted = TraceContext::new()
        .scope(async move {
            activate_from_envelope(&inbound);
            tokio::task::yield_now().await;

            let outbound = CloudEvent::new(
                "ocn.orca.decision.v1",
                "https://orca.ocn.ai/decide",
                decision_data(),
            );
            inject_into_envelope(&outbound)
        })
        .await;

    assert_eq!(emitted.trace_id(), Some(inbound_trace));
    assert!(get_current_trace_id().is_none());
    assert!(validator().validate_cloudevent(&emitted).unwrap().is_valid());
}

#[test]
fn test_inject_then_read_subject() {
    let trace_id = TraceId::parse("correlation-1").unwrap();
    let event = CloudEvent::new("ocn.weave.audit.v1", "urn:ocn:weave", json!({}));

    let injected = TraceContext::with_trace_id(trace_id.clone())
        .sync_scope(|| inject_into_envelope(&event));
    assert_eq!(injected.subject.as_deref(), Some("correlation-1"));
    assert!(event.subject.is_none());
}

proptest! {
    #[test]
    fn prop_each_missing_required_field_is_reported(mask in 1u8..16) {
        let required = ["result", "amount", "currency", "risk_score"];
        let mut data = decision_data();
        let mut removed = Vec::new();
        for (i, field) in required.iter().enumerate() {
            if mask & (1 << i) != 0 {
                data.as_object_mut().unwrap().remove(*field);
                removed.push(format!("/data/{}", field));
            }
        }

        let result = validator()
            .validate_cloudevent_value(&envelope("ocn.orca.decision.v1", data))
            .unwrap();
        prop_assert!(!result.is_valid());
        prop_assert_eq!(result.errors().len(), removed.len());
        for path in &removed {
            prop_assert!(result.has_path(path));
        }
    }
}
