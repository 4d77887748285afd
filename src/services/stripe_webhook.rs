// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stripe webhook signature verification and event envelope.
//!
//! The `Stripe-Signature` header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`.
//! Each `v1` is HMAC-SHA256 of `"<t>.<raw body>"` keyed with the endpoint
//! secret. Any matching `v1` is accepted.

use crate::error::AppError;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age (either direction) of a signed timestamp.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Verify a webhook payload against its signature header at time `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), AppError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => {
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        tracing::warn!("Webhook signature header has no timestamp");
        return Err(AppError::InvalidSignature);
    };
    if signatures.is_empty() {
        tracing::warn!("Webhook signature header has no v1 signature");
        return Err(AppError::InvalidSignature);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        tracing::warn!(timestamp, now, "Webhook signature timestamp outside tolerance");
        return Err(AppError::InvalidSignature);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    if signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok())
    {
        Ok(())
    } else {
        tracing::warn!("Webhook signature mismatch");
        Err(AppError::InvalidSignature)
    }
}

/// Compute a `Stripe-Signature` header value for `payload`.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// Type-specific object, parsed once the event type is known
    pub object: serde_json::Value,
}

/// How an event type is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckoutSessionCompleted,
    InvoicePaid,
    InvoicePaymentFailed,
    SubscriptionDeleted,
    /// Subscription updated, paused or resumed
    SubscriptionChanged,
    /// Known event with no effect on our state
    Ignored,
    Unrecognized,
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "customer.subscription.updated"
            | "customer.subscription.paused"
            | "customer.subscription.resumed" => Self::SubscriptionChanged,
            "payment_method.attached"
            | "payment_method.detached"
            | "customer.updated"
            | "customer.tax_id.created"
            | "customer.tax_id.updated"
            | "customer.tax_id.deleted"
            | "billing_portal.configuration.created"
            | "billing_portal.configuration.updated"
            | "billing_portal.session.created" => Self::Ignored,
            _ => Self::Unrecognized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_760_000_000;
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"invoice.paid","data":{"object":{}}}"#;

    #[test]
    fn test_valid_signature() {
        let header = sign_payload(PAYLOAD, SECRET, NOW).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, NOW).is_ok());
        // Within tolerance on either side
        assert!(verify_signature(PAYLOAD, &header, SECRET, NOW + 300).is_ok());
        assert!(verify_signature(PAYLOAD, &header, SECRET, NOW - 300).is_ok());
    }

    #[test]
    fn test_wrong_secret() {
        let header = sign_payload(PAYLOAD, "whsec_other", NOW).unwrap();
        assert!(matches!(
            verify_signature(PAYLOAD, &header, SECRET, NOW),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_body() {
        let header = sign_payload(PAYLOAD, SECRET, NOW).unwrap();
        let tampered = br#"{"id":"evt_1","type":"invoice.paid","data":{"object":{"x":1}}}"#;
        assert!(verify_signature(tampered, &header, SECRET, NOW).is_err());
    }

    #[test]
    fn test_stale_timestamp() {
        let header = sign_payload(PAYLOAD, SECRET, NOW - 301).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, NOW).is_err());
    }

    #[test]
    fn test_malformed_headers() {
        for header in ["", "garbage", "t=abc,v1=00", "t=1760000000", "v1=deadbeef"] {
            assert!(
                verify_signature(PAYLOAD, header, SECRET, NOW).is_err(),
                "header {:?} should be rejected",
                header
            );
        }
    }

    #[test]
    fn test_any_v1_may_match() {
        let signed = sign_payload(PAYLOAD, SECRET, NOW).unwrap();
        let good = signed.split_once(",v1=").unwrap().1;
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good);
        assert!(verify_signature(PAYLOAD, &header, SECRET, NOW).is_ok());
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(
            EventKind::from_type("invoice.paid"),
            EventKind::InvoicePaid
        );
        assert_eq!(
            EventKind::from_type("customer.subscription.paused"),
            EventKind::SubscriptionChanged
        );
        assert_eq!(
            EventKind::from_type("customer.tax_id.created"),
            EventKind::Ignored
        );
        assert_eq!(
            EventKind::from_type("charge.refunded"),
            EventKind::Unrecognized
        );
    }
}
