//! Identity-provider event payloads.

use serde::Deserialize;

use crate::webhook::WebhookError;

/// What a verified delivery asks of the local user mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// `user.created` or `user.updated`: insert or refresh by external id.
    UpsertUser {
        external_id: String,
        email: Option<String>,
    },
    /// Any other event type; acknowledged and otherwise ignored.
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

impl IdentityEvent {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|e| WebhookError::Payload(e.to_string()))?;

        match envelope.kind.as_str() {
            "user.created" | "user.updated" => {
                let data: UserData = serde_json::from_value(envelope.data)
                    .map_err(|e| WebhookError::Payload(e.to_string()))?;
                Ok(IdentityEvent::UpsertUser {
                    external_id: data.id,
                    email: data.email_addresses.into_iter().next().map(|e| e.email_address),
                })
            }
            _ => Ok(IdentityEvent::Ignored(envelope.kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_created_takes_first_email() {
        let body = br#"{
            "type": "user.created",
            "data": {
                "id": "user_29w83sxmDNGwOuEthce5gg56FcC",
                "email_addresses": [
                    {"email_address": "gudang@example.com"},
                    {"email_address": "lain@example.com"}
                ]
            }
        }"#;

        assert_eq!(
            IdentityEvent::parse(body).unwrap(),
            IdentityEvent::UpsertUser {
                external_id: "user_29w83sxmDNGwOuEthce5gg56FcC".to_string(),
                email: Some("gudang@example.com".to_string()),
            }
        );
    }

    #[test]
    fn user_without_email_is_still_upserted() {
        let body = br#"{"type":"user.updated","data":{"id":"user_1","email_addresses":[]}}"#;
        assert_eq!(
            IdentityEvent::parse(body).unwrap(),
            IdentityEvent::UpsertUser {
                external_id: "user_1".to_string(),
                email: None,
            }
        );
    }

    #[test]
    fn other_events_are_ignored() {
        let body = br#"{"type":"session.created","data":{"id":"sess_1"}}"#;
        assert_eq!(
            IdentityEvent::parse(body).unwrap(),
            IdentityEvent::Ignored("session.created".to_string())
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(matches!(
            IdentityEvent::parse(b"not json"),
            Err(WebhookError::Payload(_))
        ));
        assert!(matches!(
            IdentityEvent::parse(br#"{"type":"user.created","data":{}}"#),
            Err(WebhookError::Payload(_))
        ));
    }
}
