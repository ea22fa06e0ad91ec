//! Schema-driven outbound message builders.
//!
//! A builder is a plain record: an event name plus ordered field defaults.
//! Building coerces the operator's raw text and wraps it as
//! `{event, data}`. There is one build function for every template.

use crate::coercion::coerce_fields;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Default chat content for `ChatRoomChat`.
const DEFAULT_GREETING: &str = "歪————————";

/// Outbound message shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBuilderTemplate {
    /// Wire event name; also the registry key.
    pub event_name: String,
    /// Field names with their default raw text, in display order.
    pub field_defaults: IndexMap<String, String>,
}

impl MessageBuilderTemplate {
    pub fn new<I, K, V>(event_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            event_name: event_name.into(),
            field_defaults: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Coerces `values` and wraps them as `{event, data}`.
    ///
    /// Total over any string mapping; never fails.
    pub fn build(&self, values: &IndexMap<String, String>) -> Value {
        json!({
            "event": self.event_name,
            "data": Value::Object(coerce_fields(values)),
        })
    }
}

/// Builders shipped with the console.
pub fn bundled_builders() -> Vec<MessageBuilderTemplate> {
    vec![
        MessageBuilderTemplate::new("AccountLogin", [("AccountName", ""), ("Password", "")]),
        MessageBuilderTemplate::new(
            "ChatRoomSearch",
            [
                ("Query", "Catnest"),
                ("Language", ""),
                ("Space", ""),
                ("Game", ""),
                ("FullRooms", "true"),
                ("ShowLocked", "true"),
            ],
        ),
        MessageBuilderTemplate::new("ChatRoomJoin", [("Name", "Catnest")]),
        MessageBuilderTemplate::new("ChatRoomLeave", Vec::<(String, String)>::new()),
        MessageBuilderTemplate::new(
            "ChatRoomChat",
            [("Content", DEFAULT_GREETING), ("Type", "Chat")],
        ),
    ]
}

/// Ordered registry of builder templates.
#[derive(Debug, Clone)]
pub struct BuilderRegistry {
    templates: IndexMap<String, MessageBuilderTemplate>,
}

impl BuilderRegistry {
    /// Creates a registry holding `templates` in the given order.
    ///
    /// A later template with an existing name replaces the earlier one in
    /// place, keeping its position.
    pub fn new(templates: impl IntoIterator<Item = MessageBuilderTemplate>) -> Self {
        let mut registry = Self {
            templates: IndexMap::new(),
        };
        registry.extend(templates);
        registry
    }

    /// Creates a registry with the bundled builders.
    pub fn bundled() -> Self {
        Self::new(bundled_builders())
    }

    /// Adds templates after the existing ones, replacing same-named entries
    /// in place.
    pub fn extend(&mut self, templates: impl IntoIterator<Item = MessageBuilderTemplate>) {
        for template in templates {
            let name = template.event_name.clone();
            if self.templates.insert(name.clone(), template).is_some() {
                warn!(builder = %name, "Builder definition replaced");
            } else {
                debug!(builder = %name, "Builder registered");
            }
        }
    }

    /// Builder names in registration order.
    pub fn list(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&MessageBuilderTemplate> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Ordered field defaults for `name`.
    pub fn fields_of(&self, name: &str) -> Result<&IndexMap<String, String>> {
        self.template(name).map(|t| &t.field_defaults)
    }

    /// Builds a payload from exactly the given values.
    pub fn build(&self, name: &str, values: &IndexMap<String, String>) -> Result<Value> {
        Ok(self.template(name)?.build(values))
    }

    /// Builds a payload from the template defaults with `overrides` applied.
    ///
    /// Overriding a field the template does not declare is an error.
    pub fn build_with_defaults(
        &self,
        name: &str,
        overrides: &IndexMap<String, String>,
    ) -> Result<Value> {
        let template = self.template(name)?;
        let mut values = template.field_defaults.clone();
        for (field, value) in overrides {
            match values.get_mut(field) {
                Some(slot) => *slot = value.clone(),
                None => {
                    return Err(Error::UnknownField {
                        builder: name.to_string(),
                        field: field.clone(),
                    });
                }
            }
        }
        Ok(template.build(&values))
    }

    /// Pretty-printed payload for defaults plus `overrides`.
    pub fn preview(&self, name: &str, overrides: &IndexMap<String, String>) -> Result<String> {
        let payload = self.build_with_defaults(name, overrides)?;
        Ok(format!("{payload:#}"))
    }

    fn template(&self, name: &str) -> Result<&MessageBuilderTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| Error::UnknownBuilder(name.to_string()))
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::bundled()
    }
}
