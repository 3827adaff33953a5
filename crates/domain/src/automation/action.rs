//! Action: the effect performed when a rule fires.
//!
//! On the wire an action is `{type, config, delay_seconds}`. The `config`
//! object is decoded into a typed variant of [`ActionKind`] (and validated)
//! once, when the action is deserialized, so the engine never re-parses
//! free-form maps at fire time.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ValidationError;

/// Discriminant of [`ActionKind`], also the `type` field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    SetStatus,
    AddTag,
    SendEmail,
    CreateInvoice,
    Webhook,
}

impl ActionType {
    pub const ALL: [Self; 5] = [
        Self::SetStatus,
        Self::AddTag,
        Self::SendEmail,
        Self::CreateInvoice,
        Self::Webhook,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetStatus => "set_status",
            Self::AddTag => "add_tag",
            Self::SendEmail => "send_email",
            Self::CreateInvoice => "create_invoice",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownActionType(s.to_string()))
    }
}

/// Move the triggering entity to a new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetStatusConfig {
    pub status: String,
}

/// Attach a tag to the triggering entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddTagConfig {
    pub tag: String,
}

/// Send an outbound email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendEmailConfig {
    /// Recipient; when absent the sink resolves the customer's address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Generate an invoice for the triggering order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInvoiceConfig {
    #[serde(default)]
    pub send_to_customer: bool,
}

/// Deliver the event to an outbound webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// Typed action configuration, one variant per supported integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    SetStatus(SetStatusConfig),
    AddTag(AddTagConfig),
    SendEmail(SendEmailConfig),
    CreateInvoice(CreateInvoiceConfig),
    Webhook(WebhookConfig),
}

impl ActionKind {
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::SetStatus(_) => ActionType::SetStatus,
            Self::AddTag(_) => ActionType::AddTag,
            Self::SendEmail(_) => ActionType::SendEmail,
            Self::CreateInvoice(_) => ActionType::CreateInvoice,
            Self::Webhook(_) => ActionType::Webhook,
        }
    }

    /// Decode an untyped `config` object for the given action type.
    ///
    /// A missing config (`null`) is read as an empty object so actions
    /// without required fields (`create_invoice`) may omit it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidActionConfig`] when the config
    /// does not decode or fails [`ActionKind::validate`].
    pub fn from_config(
        action_type: ActionType,
        config: serde_json::Value,
    ) -> Result<Self, ValidationError> {
        let config = if config.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            config
        };
        let invalid = |err: serde_json::Error| ValidationError::InvalidActionConfig {
            action: action_type.as_str(),
            reason: err.to_string(),
        };
        let kind = match action_type {
            ActionType::SetStatus => {
                Self::SetStatus(serde_json::from_value(config).map_err(invalid)?)
            }
            ActionType::AddTag => Self::AddTag(serde_json::from_value(config).map_err(invalid)?),
            ActionType::SendEmail => {
                Self::SendEmail(serde_json::from_value(config).map_err(invalid)?)
            }
            ActionType::CreateInvoice => {
                Self::CreateInvoice(serde_json::from_value(config).map_err(invalid)?)
            }
            ActionType::Webhook => Self::Webhook(serde_json::from_value(config).map_err(invalid)?),
        };
        kind.validate()?;
        Ok(kind)
    }

    /// Check field-level invariants of the config.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidActionConfig`] naming the action.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let reason = match self {
            Self::SetStatus(c) if c.status.trim().is_empty() => Some("status must not be empty"),
            Self::AddTag(c) if c.tag.trim().is_empty() => Some("tag must not be empty"),
            Self::SendEmail(c) if c.subject.trim().is_empty() => {
                Some("subject must not be empty")
            }
            Self::SendEmail(SendEmailConfig { to: Some(to), .. }) if !to.contains('@') => {
                Some("recipient must be an email address")
            }
            Self::Webhook(c)
                if !(c.url.starts_with("https://") || c.url.starts_with("http://")) =>
            {
                Some("url must use http or https")
            }
            _ => None,
        };
        match reason {
            Some(reason) => Err(ValidationError::InvalidActionConfig {
                action: self.action_type().as_str(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetStatus(c) => write!(f, "set_status({})", c.status),
            Self::AddTag(c) => write!(f, "add_tag({})", c.tag),
            Self::SendEmail(c) => write!(f, "send_email({})", c.subject),
            Self::CreateInvoice(_) => f.write_str("create_invoice"),
            Self::Webhook(c) => write!(f, "webhook({})", c.url),
        }
    }
}

/// One step of a rule's action pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAction")]
pub struct Action {
    pub kind: ActionKind,
    /// `0` runs inline; anything else defers the action to the worker.
    pub delay_seconds: u32,
}

impl Action {
    /// An action that runs inline when the rule fires.
    #[must_use]
    pub fn immediate(kind: ActionKind) -> Self {
        Self {
            kind,
            delay_seconds: 0,
        }
    }

    /// An action deferred by `delay_seconds`.
    #[must_use]
    pub fn delayed(kind: ActionKind, delay_seconds: u32) -> Self {
        Self {
            kind,
            delay_seconds,
        }
    }

    #[must_use]
    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }

    #[must_use]
    pub fn is_delayed(&self) -> bool {
        self.delay_seconds > 0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_delayed() {
            write!(f, "{} after {}s", self.kind, self.delay_seconds)
        } else {
            self.kind.fmt(f)
        }
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Action", 3)?;
        state.serialize_field("type", &self.action_type())?;
        match &self.kind {
            ActionKind::SetStatus(c) => state.serialize_field("config", c)?,
            ActionKind::AddTag(c) => state.serialize_field("config", c)?,
            ActionKind::SendEmail(c) => state.serialize_field("config", c)?,
            ActionKind::CreateInvoice(c) => state.serialize_field("config", c)?,
            ActionKind::Webhook(c) => state.serialize_field("config", c)?,
        }
        state.serialize_field("delay_seconds", &self.delay_seconds)?;
        state.end()
    }
}

/// Untyped wire form, decoded into [`Action`] through [`ActionKind::from_config`].
#[derive(Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default)]
    config: serde_json::Value,
    #[serde(default)]
    delay_seconds: u32,
}

impl TryFrom<RawAction> for Action {
    type Error = ValidationError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        let action_type = raw.action_type.parse::<ActionType>()?;
        Ok(Self {
            kind: ActionKind::from_config(action_type, raw.config)?,
            delay_seconds: raw.delay_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn email() -> ActionKind {
        ActionKind::SendEmail(SendEmailConfig {
            to: None,
            subject: "Your order shipped".to_string(),
            template: Some("order_shipped".to_string()),
        })
    }

    #[test]
    fn should_decode_config_into_typed_variant() {
        let action: Action = serde_json::from_value(json!({
            "type": "webhook",
            "config": {"url": "https://hooks.example.com/orders", "headers": {"x-key": "k"}},
            "delay_seconds": 30
        }))
        .unwrap();
        assert_eq!(action.delay_seconds, 30);
        match action.kind {
            ActionKind::Webhook(c) => {
                assert_eq!(c.url, "https://hooks.example.com/orders");
                assert_eq!(c.headers.get("x-key").map(String::as_str), Some("k"));
            }
            other => panic!("expected webhook, got {other:?}"),
        }
    }

    #[test]
    fn should_default_delay_to_zero() {
        let action: Action = serde_json::from_value(json!({
            "type": "add_tag",
            "config": {"tag": "vip"}
        }))
        .unwrap();
        assert!(!action.is_delayed());
        assert_eq!(action.action_type(), ActionType::AddTag);
    }

    #[test]
    fn should_accept_missing_config_for_create_invoice() {
        let action: Action = serde_json::from_value(json!({"type": "create_invoice"})).unwrap();
        assert_eq!(
            action.kind,
            ActionKind::CreateInvoice(CreateInvoiceConfig::default())
        );
    }

    #[test]
    fn should_reject_unknown_action_type() {
        let result: Result<Action, _> =
            serde_json::from_value(json!({"type": "launch_rocket", "config": {}}));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown action type `launch_rocket`"), "{err}");
    }

    #[test]
    fn should_reject_config_missing_required_field() {
        let result = ActionKind::from_config(ActionType::SetStatus, json!({}));
        assert!(matches!(
            result,
            Err(ValidationError::InvalidActionConfig {
                action: "set_status",
                ..
            })
        ));
    }

    #[test]
    fn should_reject_config_with_fields_of_another_action() {
        let result = ActionKind::from_config(ActionType::AddTag, json!({"tag": "x", "url": "y"}));
        assert!(result.is_err());
    }

    #[test]
    fn should_reject_webhook_without_http_scheme() {
        let result =
            ActionKind::from_config(ActionType::Webhook, json!({"url": "ftp://example.com"}));
        assert!(matches!(
            result,
            Err(ValidationError::InvalidActionConfig {
                action: "webhook",
                ..
            })
        ));
    }

    #[test]
    fn should_reject_blank_status_and_tag() {
        assert!(ActionKind::from_config(ActionType::SetStatus, json!({"status": " "})).is_err());
        assert!(ActionKind::from_config(ActionType::AddTag, json!({"tag": ""})).is_err());
    }

    #[test]
    fn should_reject_email_recipient_without_at_sign() {
        let result = ActionKind::from_config(
            ActionType::SendEmail,
            json!({"to": "customer", "subject": "Hi"}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn should_serialize_back_to_wire_shape() {
        let action = Action::delayed(email(), 3600);
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "send_email",
                "config": {"subject": "Your order shipped", "template": "order_shipped"},
                "delay_seconds": 3600
            })
        );
        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn should_display_action_with_delay() {
        let action = Action::delayed(
            ActionKind::SetStatus(SetStatusConfig {
                status: "archived".to_string(),
            }),
            60,
        );
        assert_eq!(action.to_string(), "set_status(archived) after 60s");
        assert_eq!(Action::immediate(email()).to_string(), "send_email(Your order shipped)");
    }
}
