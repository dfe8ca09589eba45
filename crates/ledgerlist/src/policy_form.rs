//! Access-policy form reconciliation.
//!
//! The form edits the full desired policy set at once. Submitting it
//! diffs against the previously saved set: addresses that disappeared are
//! deleted (behind a confirmation), then the submitted set is written in
//! one update. Deletes run to completion before the update so a delete
//! failure never leaves the server holding policies the form no longer
//! shows.

use ledgerbase::{AccessClient, AccessPolicy, AccessPolicyType, AddressPolicy, Session};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::AppError;
use crate::todo::{FieldError, ValidationError};

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^0x[a-fA-F0-9]{40}$").expect("address pattern is valid"));

/// Whether `address` is a well-formed 20-byte hex chain address.
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_RE.is_match(address)
}

/// One row of the policy form as the user filled it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPolicy {
    pub address: String,
    pub policy_type: AccessPolicyType,
    pub access_rules: Vec<ledgerbase::AccessRule>,
}

impl FormPolicy {
    /// Convert to the wire shape. Field rules only apply to field-based
    /// policies and are dropped for full-access rows.
    pub fn into_address_policy(self) -> AddressPolicy {
        let access_rules = match self.policy_type {
            AccessPolicyType::AllowFullAccess => Vec::new(),
            AccessPolicyType::FieldBased => self.access_rules,
        };
        AddressPolicy {
            address: self.address,
            policy: AccessPolicy {
                policy_type: self.policy_type,
                access_rules,
            },
        }
    }
}

fn validate_rows(submitted: &[FormPolicy]) -> Result<(), ValidationError> {
    let mut fields = Vec::new();
    for row in submitted {
        if !is_valid_address(&row.address) {
            fields.push(FieldError {
                field: "address",
                message: format!("'{}' is not a valid address", row.address),
            });
        }
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            message: "Some addresses are invalid".to_string(),
            fields,
        })
    }
}

/// Addresses present in `previous` but absent from `submitted`, sorted.
pub fn removal_set(previous: &[AddressPolicy], submitted: &[FormPolicy]) -> Vec<String> {
    let mut removed: Vec<String> = previous
        .iter()
        .filter(|p| !submitted.iter().any(|s| s.address == p.address))
        .map(|p| p.address.clone())
        .collect();
    removed.sort();
    removed
}

/// Reconcile the submitted form against the saved policy set.
///
/// Rows are validated before any network call. Removed addresses are
/// deleted first, gated by `confirm`; declining the confirmation skips
/// the deletes but the update still runs, so edits to surviving rows are
/// never lost.
pub async fn apply_policy_form(
    access: &AccessClient,
    session: &Session,
    deployment_id: &str,
    previous: &[AddressPolicy],
    submitted: Vec<FormPolicy>,
    confirm: impl FnOnce(&[String]) -> bool,
) -> Result<(), AppError> {
    validate_rows(&submitted)?;

    let removed = removal_set(previous, &submitted);
    if !removed.is_empty() {
        if confirm(&removed) {
            access.delete_policies(session, deployment_id, &removed).await?;
        } else {
            log::info!("policy removal declined for {} address(es)", removed.len());
        }
    }

    let policies: Vec<AddressPolicy> = submitted
        .into_iter()
        .map(FormPolicy::into_address_policy)
        .collect();
    access.set_policies(session, deployment_id, &policies).await?;
    Ok(())
}
