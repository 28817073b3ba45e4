//! change records and the per-run translation context
use crate::bundle::Bundle;
use crate::placement::Dialect;
use crate::value::Value;
use std::collections::HashMap;

/// One atomic deployment action.
///
/// The `method` names and argument positions are a wire contract with the
/// consuming deployment client; args pointing at the future result of another
/// record use the `"$<id>"` convention, and `requires` lists record ids that
/// must execute first - always ids emitted earlier in the sequence.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ChangeRecord {
    pub id: String,
    pub method: &'static str,
    pub args: Vec<Value>,
    pub requires: Vec<String>,
}

/// Hold the state for the translation stages.
///
/// One instance per run. The stages queue records with [ChangeSet::send],
/// the driver takes them out with [ChangeSet::drain], and the lookup tables
/// let later stages reference records emitted by earlier ones. Nothing here
/// outlives or is shared between runs.
#[derive(Debug)]
pub struct ChangeSet<'b> {
    pub(crate) bundle: &'b Bundle,
    pub(crate) dialect: Dialect,

    /// charm reference -> addCharm record id
    pub(crate) charms_added: HashMap<String, String>,
    /// service name -> deploy record id
    pub(crate) services_added: HashMap<String, String>,
    /// machine name -> addMachine record id
    pub(crate) machines_added: HashMap<String, String>,

    queue: Vec<ChangeRecord>,
    counter: u64,
}

impl<'b> ChangeSet<'b> {
    pub(crate) fn new(bundle: &'b Bundle) -> Self {
        Self {
            bundle,
            dialect: Dialect::of(bundle),
            charms_added: HashMap::new(),
            services_added: HashMap::new(),
            machines_added: HashMap::new(),
            queue: Vec::new(),
            counter: 0,
        }
    }

    /// Queue a change in this change set.
    pub(crate) fn send(&mut self, change: ChangeRecord) {
        self.queue.push(change);
    }

    /// Return all queued changes, in the order they were sent.
    pub(crate) fn drain(&mut self) -> Vec<ChangeRecord> {
        std::mem::take(&mut self.queue)
    }

    /// Return an incremental integer to be included in the record ids.
    ///
    /// The only source of id numbers: unique and strictly increasing across
    /// all stages of the run, whichever stage asks.
    pub(crate) fn next_id(&mut self) -> u64 {
        let id = self.counter;
        self.counter += 1;
        id
    }
}
