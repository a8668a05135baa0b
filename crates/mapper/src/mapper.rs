//! Gesture event → action mapping.

use handwave_common::config::MapperConfig;
use handwave_common::error::HandwaveResult;
use handwave_model::gesture::{GestureEvent, GestureType};
use handwave_model::mapping::{GestureMapping, MappingConfig, MappingPatchConfig, MappingTable};
use tracing::{debug, trace};

use crate::listeners::{Listeners, Subscription};
use crate::policy::{Policy, PolicyContext, PolicySet, Verdict};

/// An action that passed every policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDispatch {
    pub action: String,
    pub event: GestureEvent,
    /// The mapping is continuous (the event belongs to an ongoing gesture).
    pub continuous: bool,
}

/// Maps gesture events to actions through a policy set.
pub struct ActionMapper {
    table: MappingTable,
    policies: PolicySet,
    listeners: Listeners<ActionDispatch>,
}

impl ActionMapper {
    /// Default mapping table and default policies.
    pub fn new(config: &MapperConfig) -> Self {
        Self::with_table(MappingTable::with_defaults(), config)
    }

    pub fn with_table(table: MappingTable, config: &MapperConfig) -> Self {
        Self {
            table,
            policies: PolicySet::with_defaults(config),
            listeners: Listeners::new(),
        }
    }

    /// Look up, gate and fan out one event.
    ///
    /// Returns the dispatch when an action fired. Unmapped gestures and
    /// rejected events return `None` and notify nobody.
    pub fn process(
        &mut self,
        event: &GestureEvent,
        context: &PolicyContext,
    ) -> Option<ActionDispatch> {
        let Some(mapping) = self.table.get(event.gesture_type) else {
            trace!(gesture = %event.gesture_type, "No mapping, ignoring");
            return None;
        };

        match self.policies.evaluate(event, mapping, context) {
            Verdict::Accepted => {}
            Verdict::Rejected { policy } => {
                debug!(
                    gesture = %event.gesture_type,
                    identity = %event.identity_id,
                    policy = %policy,
                    "Gesture rejected"
                );
                return None;
            }
        }

        let dispatch = ActionDispatch {
            action: mapping.action.clone(),
            event: event.clone(),
            continuous: mapping.continuous,
        };
        debug!(
            gesture = %event.gesture_type,
            action = %dispatch.action,
            identity = %event.identity_id,
            "Action dispatched"
        );
        self.listeners.emit(&dispatch);
        Some(dispatch)
    }

    /// Subscribe to dispatched actions.
    pub fn on_action<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&ActionDispatch) -> anyhow::Result<()> + Send + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    pub fn mapping(&self, gesture_type: GestureType) -> Option<&GestureMapping> {
        self.table.get(gesture_type)
    }

    pub fn set_mapping(&mut self, mapping: GestureMapping) -> Option<GestureMapping> {
        self.table.insert(mapping)
    }

    pub fn update_mapping(
        &mut self,
        gesture_type: GestureType,
        f: impl FnOnce(&mut GestureMapping),
    ) -> bool {
        self.table.update(gesture_type, f)
    }

    pub fn remove_mapping(&mut self, gesture_type: GestureType) -> Option<GestureMapping> {
        self.table.remove(gesture_type)
    }

    /// Swap in a whole document. The table is unchanged on error.
    pub fn replace_mappings(&mut self, config: &MappingConfig) -> HandwaveResult<()> {
        self.table.replace(config)
    }

    /// Merge overrides field by field. The table is unchanged on error.
    pub fn patch_mappings(&mut self, config: &MappingPatchConfig) -> HandwaveResult<()> {
        self.table.patch(config)
    }

    pub fn add_policy(&mut self, policy: Box<dyn Policy>) -> Option<Box<dyn Policy>> {
        self.policies.add(policy)
    }

    pub fn remove_policy(&mut self, name: &str) -> Option<Box<dyn Policy>> {
        self.policies.remove(name)
    }

    pub fn policy_names(&self) -> Vec<&str> {
        self.policies.names()
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn apply_config(&mut self, config: &MapperConfig) {
        self.policies.apply_config(config);
    }
}

impl std::fmt::Debug for ActionMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionMapper")
            .field("mappings", &self.table.len())
            .field("policies", &self.policies)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
