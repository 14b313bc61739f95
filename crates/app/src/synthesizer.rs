//! Virtual-value synthesizer.
//!
//! A virtual value is derived from a fixed set of physical values on the
//! same node. Each controller owns one [`VirtualValueCache`]; a
//! [`VirtualRecipe`] says which nodes get a virtual value, which inputs it
//! needs, how to derive its state and how to split a write back onto the
//! inputs.
//!
//! Entries are created lazily by [`VirtualValueCache::resolve`], at most once
//! per address: the existence check, input gathering and insertion all run
//! under one lock, and an entry is only stored when every input is present.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use homelink_domain::address::ControlAddress;
use homelink_domain::error::HubError;
use homelink_domain::node::{NodeSignature, Value, ValueType};

use crate::ports::BackendNode;

/// Writes one raw value to a physical point.
pub trait ValueWriter: Send + Sync {
    /// Returns `false` when the write was rejected.
    fn write_value(&self, address: &ControlAddress, value: &str)
    -> impl Future<Output = bool> + Send;
}

/// How one kind of virtual value is built.
pub trait VirtualRecipe: Send + Sync {
    /// Value id of the virtual value inside its node.
    fn value_id(&self) -> &str;

    fn name(&self) -> &str;

    fn value_type(&self) -> ValueType;

    /// Whether nodes with this signature carry the virtual value.
    fn applies_to(&self, signature: &NodeSignature) -> bool;

    /// Value ids of the physical inputs, in the node.
    fn inputs(&self) -> &[&str];

    /// Derived state from the current raw inputs, keyed by value id.
    /// `None` when the inputs do not form a valid state yet.
    fn derive(&self, inputs: &BTreeMap<String, String>) -> Option<String>;

    /// Ordered `(input value id, raw value)` writes realizing `raw`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidValue`] when `raw` cannot be interpreted.
    fn decompose(&self, raw: &str) -> Result<Vec<(String, String)>, HubError>;
}

/// A synthesized value, holding its inputs by address.
pub struct VirtualValue {
    address: ControlAddress,
    inputs: Vec<ControlAddress>,
    recipe: Arc<dyn VirtualRecipe>,
    state: Mutex<Option<String>>,
}

impl VirtualValue {
    #[must_use]
    pub fn address(&self) -> &ControlAddress {
        &self.address
    }

    #[must_use]
    pub fn inputs(&self) -> &[ControlAddress] {
        &self.inputs
    }

    /// Descriptor to list in the owning node.
    #[must_use]
    pub fn descriptor(&self) -> Value {
        Value::virtual_value(
            self.recipe.value_id(),
            self.recipe.name(),
            self.recipe.value_type(),
        )
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.recipe.value_type()
    }

    /// Last derived state.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recompute from `read`. Returns the new state when it changed.
    pub fn refresh(&self, read: impl Fn(&ControlAddress) -> Option<String>) -> Option<String> {
        let derived = derive_from(self.recipe.as_ref(), &self.inputs, read);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if derived.is_some() && *state != derived {
            state.clone_from(&derived);
            derived
        } else {
            None
        }
    }
}

impl std::fmt::Debug for VirtualValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualValue")
            .field("address", &self.address)
            .field("inputs", &self.inputs)
            .field("state", &self.current())
            .finish_non_exhaustive()
    }
}

/// Outcome of resolving one recipe on one node.
#[derive(Debug)]
pub enum Synthesis {
    /// The node does not carry this virtual value.
    NotApplicable,
    /// Some inputs are missing; retried on the next resolution.
    Incomplete { missing: Vec<String> },
    Created(Arc<VirtualValue>),
    Cached(Arc<VirtualValue>),
}

impl Synthesis {
    #[must_use]
    pub fn value(&self) -> Option<&Arc<VirtualValue>> {
        match self {
            Self::Created(value) | Self::Cached(value) => Some(value),
            Self::NotApplicable | Self::Incomplete { .. } => None,
        }
    }
}

/// Result of splitting a virtual write onto its inputs.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub attempted: usize,
    pub failed: Vec<ControlAddress>,
}

impl WriteReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Per-controller cache of virtual values keyed by address.
pub struct VirtualValueCache {
    recipes: Vec<Arc<dyn VirtualRecipe>>,
    entries: Mutex<HashMap<String, Arc<VirtualValue>>>,
}

impl VirtualValueCache {
    #[must_use]
    pub fn new(recipes: Vec<Arc<dyn VirtualRecipe>>) -> Self {
        Self {
            recipes,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Virtual values of `node`, synthesizing missing ones when possible.
    pub fn resolve(
        &self,
        controller: &str,
        node: &BackendNode,
        read: impl Fn(&ControlAddress) -> Option<String>,
    ) -> Vec<Arc<VirtualValue>> {
        self.recipes
            .iter()
            .filter_map(|recipe| {
                self.resolve_recipe(controller, node, recipe, &read)
                    .value()
                    .cloned()
            })
            .collect()
    }

    /// Resolve one recipe on one node.
    pub fn resolve_recipe(
        &self,
        controller: &str,
        node: &BackendNode,
        recipe: &Arc<dyn VirtualRecipe>,
        read: impl Fn(&ControlAddress) -> Option<String>,
    ) -> Synthesis {
        let Some(signature) = node.signature else {
            return Synthesis::NotApplicable;
        };
        if !recipe.applies_to(&signature) {
            return Synthesis::NotApplicable;
        }

        let address = ControlAddress::new(controller, &node.id, recipe.value_id());
        let key = address.key();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(&key) {
            return Synthesis::Cached(Arc::clone(existing));
        }

        let missing: Vec<String> = recipe
            .inputs()
            .iter()
            .filter(|id| node.value(id).is_none())
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            tracing::debug!(address = %address, ?missing, "virtual value inputs incomplete");
            return Synthesis::Incomplete { missing };
        }

        let inputs: Vec<ControlAddress> = recipe
            .inputs()
            .iter()
            .map(|id| address.with_value(*id))
            .collect();
        let state = derive_from(recipe.as_ref(), &inputs, read);
        let value = Arc::new(VirtualValue {
            address,
            inputs,
            recipe: Arc::clone(recipe),
            state: Mutex::new(state),
        });
        entries.insert(key, Arc::clone(&value));
        tracing::info!(address = %value.address, "virtual value synthesized");
        Synthesis::Created(value)
    }

    #[must_use]
    pub fn get(&self, address: &ControlAddress) -> Option<Arc<VirtualValue>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&address.key())
            .cloned()
    }

    /// Every cached value, ordered by address.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<VirtualValue>> {
        let mut values: Vec<_> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        values.sort_by(|a, b| a.address.cmp(&b.address));
        values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split a write on a virtual value into ordered writes on its inputs.
    ///
    /// Every write is attempted; failures are logged and reported, earlier
    /// writes are not rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidValue`] when the address is not a cached
    /// virtual value or `raw` cannot be decomposed.
    pub async fn write<W: ValueWriter>(
        &self,
        address: &ControlAddress,
        raw: &str,
        writer: &W,
    ) -> Result<WriteReport, HubError> {
        let value = self
            .get(address)
            .ok_or_else(|| HubError::invalid_value(address.key(), "unknown virtual value"))?;
        let writes = value.recipe.decompose(raw)?;

        let mut report = WriteReport::default();
        for (input_id, input_value) in writes {
            let target = address.with_value(input_id);
            report.attempted += 1;
            if !writer.write_value(&target, &input_value).await {
                tracing::warn!(address = %target, value = %input_value, "virtual value input write failed");
                report.failed.push(target);
            }
        }
        Ok(report)
    }

    /// Recompute every virtual value fed by `changed`.
    ///
    /// Returns the values whose derived state moved, with the new state.
    pub fn on_input_changed(
        &self,
        changed: &ControlAddress,
        read: impl Fn(&ControlAddress) -> Option<String>,
    ) -> Vec<(Arc<VirtualValue>, String)> {
        let affected: Vec<Arc<VirtualValue>> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|value| value.inputs.contains(changed))
            .cloned()
            .collect();

        affected
            .into_iter()
            .filter_map(|value| {
                let state = value.refresh(&read)?;
                Some((value, state))
            })
            .collect()
    }
}

fn derive_from(
    recipe: &dyn VirtualRecipe,
    inputs: &[ControlAddress],
    read: impl Fn(&ControlAddress) -> Option<String>,
) -> Option<String> {
    let raw: BTreeMap<String, String> = inputs
        .iter()
        .filter_map(|address| read(address).map(|value| (address.value_id.clone(), value)))
        .collect();
    recipe.derive(&raw)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::ports::BackendValue;

    use super::*;

    const SIGNATURE: NodeSignature = NodeSignature::new(1, 2, 3);

    /// Sum of two integer inputs; writes split the value in halves.
    struct SumRecipe;

    impl VirtualRecipe for SumRecipe {
        fn value_id(&self) -> &str {
            "virt_sum"
        }
        fn name(&self) -> &str {
            "Sum"
        }
        fn value_type(&self) -> ValueType {
            ValueType::SensorMultilevel
        }
        fn applies_to(&self, signature: &NodeSignature) -> bool {
            *signature == SIGNATURE
        }
        fn inputs(&self) -> &[&str] {
            &["a", "b"]
        }
        fn derive(&self, inputs: &BTreeMap<String, String>) -> Option<String> {
            let a: i64 = inputs.get("a")?.parse().ok()?;
            let b: i64 = inputs.get("b")?.parse().ok()?;
            Some((a + b).to_string())
        }
        fn decompose(&self, raw: &str) -> Result<Vec<(String, String)>, HubError> {
            let total: i64 = raw
                .parse()
                .map_err(|_| HubError::invalid_value(raw, "not an integer"))?;
            let half = total / 2;
            Ok(vec![
                ("a".to_string(), half.to_string()),
                ("b".to_string(), (total - half).to_string()),
            ])
        }
    }

    fn cache() -> VirtualValueCache {
        VirtualValueCache::new(vec![Arc::new(SumRecipe)])
    }

    fn node(values: &[&str]) -> BackendNode {
        values.iter().fold(
            BackendNode::new("7", "Sensor").with_signature(SIGNATURE),
            |node, id| node.with_value(BackendValue::new(*id, *id, ValueType::SensorMultilevel)),
        )
    }

    fn reader(a: &'static str, b: &'static str) -> impl Fn(&ControlAddress) -> Option<String> {
        move |address| match address.value_id.as_str() {
            "a" => Some(a.to_string()),
            "b" => Some(b.to_string()),
            _ => None,
        }
    }

    struct RecordingWriter {
        writes: Mutex<Vec<(String, String)>>,
        reject: &'static str,
        calls: AtomicUsize,
    }

    impl RecordingWriter {
        fn new(reject: &'static str) -> Self {
            Self {
                writes: Mutex::new(Vec::new()),
                reject,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ValueWriter for RecordingWriter {
        fn write_value(
            &self,
            address: &ControlAddress,
            value: &str,
        ) -> impl Future<Output = bool> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.writes
                .lock()
                .unwrap()
                .push((address.value_id.clone(), value.to_string()));
            let accepted = address.value_id != self.reject;
            async move { accepted }
        }
    }

    #[test]
    fn should_synthesize_once_and_reuse_cached_entry() {
        let cache = cache();
        let node = node(&["a", "b"]);

        let first = cache.resolve("mesh", &node, reader("1", "2"));
        let second = cache.resolve("mesh", &node, reader("5", "5"));

        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first[0], &second[0]));
        assert_eq!(first[0].current().as_deref(), Some("3"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn should_defer_when_an_input_is_missing() {
        let cache = cache();
        let recipe: Arc<dyn VirtualRecipe> = Arc::new(SumRecipe);

        let outcome = cache.resolve_recipe("mesh", &node(&["a"]), &recipe, reader("1", "2"));

        assert!(matches!(outcome, Synthesis::Incomplete { ref missing } if missing == &["b"]));
        assert!(cache.is_empty());

        let retried = cache.resolve_recipe("mesh", &node(&["a", "b"]), &recipe, reader("1", "2"));
        assert!(matches!(retried, Synthesis::Created(_)));
    }

    #[test]
    fn should_skip_nodes_with_other_signature() {
        let cache = cache();
        let other = BackendNode::new("8", "Other")
            .with_signature(NodeSignature::new(9, 9, 9))
            .with_value(BackendValue::new("a", "a", ValueType::Dimmer))
            .with_value(BackendValue::new("b", "b", ValueType::Dimmer));

        assert!(cache.resolve("mesh", &other, reader("1", "1")).is_empty());
        assert!(cache.resolve("mesh", &BackendNode::new("9", "Bare"), reader("1", "1")).is_empty());
    }

    #[test]
    fn should_create_exactly_one_entry_under_concurrent_resolution() {
        let cache = cache();
        let node = node(&["a", "b"]);

        let resolved: Vec<Arc<VirtualValue>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| cache.resolve("mesh", &node, reader("1", "2")).remove(0)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), 1);
        assert!(resolved.iter().all(|v| Arc::ptr_eq(v, &resolved[0])));
    }

    #[test]
    fn should_keep_cached_state_until_inputs_change() {
        let cache = cache();
        let node = node(&["a", "b"]);
        let value = cache.resolve("mesh", &node, reader("1", "2")).remove(0);

        // No recompute on plain reads.
        assert_eq!(value.current().as_deref(), Some("3"));

        let changed = cache.on_input_changed(&value.address().with_value("a"), reader("10", "2"));
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].1, "12");
        assert_eq!(value.current().as_deref(), Some("12"));

        let unchanged = cache.on_input_changed(&value.address().with_value("b"), reader("10", "2"));
        assert!(unchanged.is_empty());
    }

    #[test]
    fn should_ignore_changes_of_unrelated_values() {
        let cache = cache();
        let value = cache.resolve("mesh", &node(&["a", "b"]), reader("1", "2")).remove(0);
        let changed = cache.on_input_changed(&value.address().with_value("zz"), reader("9", "9"));
        assert!(changed.is_empty());
    }

    #[tokio::test]
    async fn should_write_inputs_in_recipe_order() {
        let cache = cache();
        let value = cache.resolve("mesh", &node(&["a", "b"]), reader("0", "0")).remove(0);
        let writer = RecordingWriter::new("");

        let report = cache.write(value.address(), "7", &writer).await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.attempted, 2);
        assert_eq!(
            *writer.writes.lock().unwrap(),
            vec![
                ("a".to_string(), "3".to_string()),
                ("b".to_string(), "4".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn should_attempt_every_write_when_one_fails() {
        let cache = cache();
        let value = cache.resolve("mesh", &node(&["a", "b"]), reader("0", "0")).remove(0);
        let writer = RecordingWriter::new("a");

        let report = cache.write(value.address(), "8", &writer).await.unwrap();

        assert_eq!(writer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.failed, vec![value.address().with_value("a")]);
    }

    #[tokio::test]
    async fn should_reject_write_to_unknown_virtual_value() {
        let cache = cache();
        let writer = RecordingWriter::new("");
        let result = cache
            .write(&ControlAddress::new("mesh", "1", "virt_sum"), "1", &writer)
            .await;
        assert!(matches!(result, Err(HubError::InvalidValue { .. })));
    }

    #[tokio::test]
    async fn should_reject_undecomposable_input() {
        let cache = cache();
        let value = cache.resolve("mesh", &node(&["a", "b"]), reader("0", "0")).remove(0);
        let writer = RecordingWriter::new("");
        assert!(cache.write(value.address(), "lots", &writer).await.is_err());
        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);
    }
}
