use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A view selection: the name of the view to render next plus a model built
/// from flow-scope attributes.
///
/// Produced after every state entry or terminal transition. End states with
/// no configured view produce the null form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    /// The logical view name, `None` for the null view selection
    pub view_name: Option<String>,

    /// Model attributes exposed to the view
    pub model: HashMap<String, Value>,
}

impl ViewDescriptor {
    /// A view selection with the given name and model.
    pub fn new(view_name: impl Into<String>, model: HashMap<String, Value>) -> Self {
        Self {
            view_name: Some(view_name.into()),
            model,
        }
    }

    /// The null view selection: nothing to render.
    pub fn none() -> Self {
        Self::default()
    }

    /// True when there is no view to render.
    pub fn is_none(&self) -> bool {
        self.view_name.is_none()
    }

    /// Adds one model attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.model.insert(key.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_view_selection() {
        let view = ViewDescriptor::none();
        assert!(view.is_none());
        assert!(view.model.is_empty());
    }

    #[test]
    fn test_set_attribute() {
        let mut view = ViewDescriptor::new("confirmation", HashMap::new());
        view.set_attribute("orderId", json!("42"));
        assert!(!view.is_none());
        assert_eq!(view.model.get("orderId"), Some(&json!("42")));
    }
}
