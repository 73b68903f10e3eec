use crate::domain::scope::Scope;

/// Maps attributes between a parent flow and one of its sub-flows.
///
/// A sub-flow state may reference a mapper by id. On sub-flow spawn the
/// mapper selects which parent attributes become the child's input; when the
/// sub-flow ends, it copies ending attributes back up into the resuming
/// parent's scope. A sub-flow state with no mapper passes nothing in either
/// direction.
pub trait FlowAttributeMapper: Send + Sync {
    /// Builds the input scope for a spawning sub-flow from the parent's
    /// scope.
    fn map_to_sub_flow(&self, parent: &Scope) -> Scope;

    /// Copies attributes of the ended sub-flow session into the resuming
    /// parent's scope.
    fn map_to_resuming_parent(&self, ending: &Scope, parent: &mut Scope);
}

/// A mapper that copies a fixed set of attributes verbatim in both
/// directions. Attributes absent from the source scope are skipped.
pub struct AttributeCopyMapper {
    keys: Vec<String>,
}

impl AttributeCopyMapper {
    /// A mapper copying the given attribute keys.
    pub fn new(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl FlowAttributeMapper for AttributeCopyMapper {
    fn map_to_sub_flow(&self, parent: &Scope) -> Scope {
        let mut input = Scope::new();
        for key in &self.keys {
            if let Some(value) = parent.get(key) {
                input.set(key.clone(), value.clone());
            }
        }
        input
    }

    fn map_to_resuming_parent(&self, ending: &Scope, parent: &mut Scope) {
        for key in &self.keys {
            if let Some(value) = ending.get(key) {
                parent.set(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_copy_mapper_maps_down_and_up() {
        let mapper = AttributeCopyMapper::new(["customer", "total"]);

        let mut parent = Scope::new();
        parent.set("customer", json!("C-7"));
        parent.set("internal", json!("hidden"));

        let input = mapper.map_to_sub_flow(&parent);
        assert_eq!(input.get_str("customer"), Some("C-7"));
        assert!(!input.contains("internal"));

        let mut ending = Scope::new();
        ending.set("total", json!(99));
        mapper.map_to_resuming_parent(&ending, &mut parent);
        assert_eq!(parent.get_i64("total"), Some(99));
    }
}
