//! First-party event types and schemas bundled into the crate.

use std::borrow::Cow;

use crate::key::{SchemaCategory, SchemaKey};
use crate::registry::ContractRegistry;
use crate::store::{SchemaSource, SchemaStore};

/// First-party CloudEvent types and their payload schemas.
pub const EVENT_SCHEMAS: &[(&str, &str)] = &[
    (
        "ocn.orca.decision.v1",
        include_str!("../schemas/events/v1/orca.decision.v1.schema.json"),
    ),
    (
        "ocn.orca.explanation.v1",
        include_str!("../schemas/events/v1/orca.explanation.v1.schema.json"),
    ),
    (
        "ocn.weave.audit.v1",
        include_str!("../schemas/events/v1/weave.audit.v1.schema.json"),
    ),
    (
        "ocn.orion.explanation.v1",
        include_str!("../schemas/events/v1/orion.explanation.v1.schema.json"),
    ),
    (
        "ocn.okra.bnpl_quote.v1",
        include_str!("../schemas/events/v1/okra.bnpl_quote.v1.schema.json"),
    ),
    (
        "ocn.onyx.kyb_verified.v1",
        include_str!("../schemas/events/v1/onyx.kyb_verified.v1.schema.json"),
    ),
];

/// AP2 mandate schemas.
pub const MANDATE_SCHEMAS: &[(&str, &str)] = &[
    (
        "intent_mandate",
        include_str!("../schemas/mandates/intent_mandate.schema.json"),
    ),
    (
        "cart_mandate",
        include_str!("../schemas/mandates/cart_mandate.schema.json"),
    ),
    (
        "payment_mandate",
        include_str!("../schemas/mandates/payment_mandate.schema.json"),
    ),
];

/// Register the first-party event types and bind the bundled schemas as
/// fallbacks, so files under a configured schema root still take precedence.
pub fn install(registry: &ContractRegistry, store: &SchemaStore) {
    for (event_type, text) in EVENT_SCHEMAS {
        registry.register(*event_type, None, SchemaCategory::Events);
        store.bind_fallback(
            SchemaKey::event(*event_type),
            SchemaSource::Inline(Cow::Borrowed(*text)),
        );
    }

    for (name, text) in MANDATE_SCHEMAS {
        store.bind_fallback(
            SchemaKey::mandate(*name),
            SchemaSource::Inline(Cow::Borrowed(*text)),
        );
    }

    tracing::debug!(
        event_types = EVENT_SCHEMAS.len(),
        mandates = MANDATE_SCHEMAS.len(),
        "Installed built-in contracts"
    );
}
