// crates/approval-gate-core/src/identifiers.rs
// ============================================================================
// Module: Approval Gate Identifiers
// Description: Canonical opaque identifiers for approvals, chains, and tenants.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout the
//! approval lifecycle engine. All identifiers are opaque UTF-8 strings on
//! the wire; no normalization is applied by these types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Macro: Opaque String Identifier
// ============================================================================

macro_rules! opaque_string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "`.")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning the owned string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

opaque_string_id!(ApprovalId, "Server-assigned opaque identifier for an approval record.");
opaque_string_id!(RequestId, "Caller-supplied request identifier, unique per tenant+operator.");
opaque_string_id!(OperatorId, "Identifier for the authenticated operator submitting or deciding.");
opaque_string_id!(WorkspaceId, "Identifier for the workspace an approval is scoped to.");
opaque_string_id!(TenantId, "Identifier for the tenant an approval is scoped to.");
opaque_string_id!(MunicipalityId, "Identifier for the municipality an approval is scoped to.");
opaque_string_id!(StepId, "Identifier for a chain step instance.");
opaque_string_id!(TemplateId, "Identifier for a chain template.");
opaque_string_id!(ConnectorName, "Name of an external connector a dispatcher handler serves.");
opaque_string_id!(DelegationId, "Identifier for a delegation grant.");

/// Default chain template identifier.
///
/// # Invariants
/// - The default template always exists and cannot be deleted or structurally edited.
pub const DEFAULT_TEMPLATE_ID: &str = "default";

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::ApprovalId;

    #[test]
    fn round_trips_through_json() {
        let id = ApprovalId::new("apr-123");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"apr-123\"");
        let back: ApprovalId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn displays_as_raw_string() {
        let id = ApprovalId::new("apr-xyz");
        assert_eq!(id.to_string(), "apr-xyz");
        assert_eq!(id.as_str(), "apr-xyz");
    }
}
