//! the staged translation pipeline
//!
//! Three stages run in a fixed order over one [ChangeSet]: `services`,
//! `machines`, `units`. Each stage reads the bundle and the lookup tables
//! filled in by earlier stages, queues its records, and names its successor.
//! The [Changes] iterator drives the state machine, handing the queued
//! records to the caller after every transition.
//!
//! The order matters: the units stage needs every deploy and addMachine
//! record to exist before it can compute dependency edges, which is why the
//! pipeline is strictly sequential and the units stage itself runs in two
//! passes.
use crate::bundle::Bundle;
use crate::changeset::{ChangeRecord, ChangeSet};
use crate::value::Value;
use indexmap::IndexMap;

/// Translation failure.
///
/// The pipeline performs no recovery; the first error aborts the run. A
/// dangling reference means the bundle broke the input contract - emitting a
/// record with a broken dependency edge is never an option.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("placement refers to unknown service {0:?}")]
    UnknownService(String),
    #[error("placement refers to unknown machine {0:?}")]
    UnknownMachine(String),
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Services,
    Machines,
    Units,
}

impl Stage {
    /// Run one stage to completion against the change set, returning the
    /// next stage or `None` once the pipeline is finished.
    fn run(self, changeset: &mut ChangeSet) -> Result<Option<Stage>, PlanError> {
        match self {
            Stage::Services => handle_services(changeset),
            Stage::Machines => handle_machines(changeset),
            Stage::Units => handle_units(changeset),
        }
    }
}

/// Return an iterator over the changes required to deploy the given bundle.
///
/// Records come out in execution order. The sequence is produced stage by
/// stage and is single-pass: abandoning it halfway is fine, replaying it is
/// not - start a fresh call instead. Collect into `Result<Vec<_>, _>` to
/// materialize the whole plan.
pub fn changes(bundle: &Bundle) -> Changes<'_> {
    Changes {
        changeset: ChangeSet::new(bundle),
        stage: Some(Stage::Services),
        buffer: Vec::new().into_iter(),
    }
}

/// Lazy, finite sequence of change records for one translation run.
///
/// Yields `Err` at most once: a failing stage discards its queued records,
/// reports the error, and the iterator is exhausted from then on.
#[derive(Debug)]
pub struct Changes<'b> {
    changeset: ChangeSet<'b>,
    stage: Option<Stage>,
    buffer: std::vec::IntoIter<ChangeRecord>,
}

impl Iterator for Changes<'_> {
    type Item = Result<ChangeRecord, PlanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }

            let stage = self.stage.take()?;
            match stage.run(&mut self.changeset) {
                Ok(next_stage) => {
                    self.stage = next_stage;
                    self.buffer = self.changeset.drain().into_iter();
                }
                Err(error) => {
                    // a failing stage never publishes its queued records
                    self.changeset.drain();
                    return Some(Err(error));
                }
            }
        }
    }
}

/// Queue one addCharm record per distinct charm and one deploy record per
/// service, in bundle order.
fn handle_services(changeset: &mut ChangeSet) -> Result<Option<Stage>, PlanError> {
    let bundle = changeset.bundle;
    for (service_name, service) in &bundle.services {
        let charm_id = match changeset.charms_added.get(&service.charm) {
            Some(existing) => {
                tracing::debug!(charm = %service.charm, service = %service_name, "charm already queued");
                existing.clone()
            }
            None => {
                let record_id = format!("addCharm-{}", changeset.next_id());
                changeset.send(ChangeRecord {
                    id: record_id.clone(),
                    method: "addCharm",
                    args: vec![service.charm.clone().into()],
                    requires: vec![],
                });
                changeset
                    .charms_added
                    .insert(service.charm.clone(), record_id.clone());
                record_id
            }
        };

        let record_id = format!("addService-{}", changeset.next_id());
        changeset.send(ChangeRecord {
            id: record_id.clone(),
            method: "deploy",
            args: vec![
                service.charm.clone().into(),
                service_name.clone().into(),
                Value::Object(service.options.clone()),
            ],
            requires: vec![charm_id],
        });
        changeset
            .services_added
            .insert(service_name.clone(), record_id);
    }
    Ok(Some(Stage::Machines))
}

/// Queue one addMachine record per machine, in bundle order.
fn handle_machines(changeset: &mut ChangeSet) -> Result<Option<Stage>, PlanError> {
    let bundle = changeset.bundle;
    for (machine_name, machine) in bundle.machines.iter().flatten() {
        let record_id = format!("addMachine-{}", changeset.next_id());
        changeset.send(ChangeRecord {
            id: record_id.clone(),
            method: "addMachine",
            args: vec![
                machine.series.clone().into(),
                Value::Object(machine.constraints.clone()),
            ],
            requires: vec![],
        });
        changeset
            .machines_added
            .insert(machine_name.clone(), record_id);
    }
    Ok(Some(Stage::Units))
}

/// Queue one addUnit record per unit of every service, wiring placement
/// directives into dependency edges.
fn handle_units(changeset: &mut ChangeSet) -> Result<Option<Stage>, PlanError> {
    let bundle = changeset.bundle;

    // First pass: allocate a record per unit, keyed "<service>/<index>", so
    // every unit is addressable before any dependency edge is known.
    let mut allocated: IndexMap<String, ChangeRecord> = IndexMap::new();
    for (service_name, service) in &bundle.services {
        let deploy_id = changeset
            .services_added
            .get(service_name)
            .ok_or_else(|| PlanError::UnknownService(service_name.clone()))?
            .clone();
        for index in 0..service.num_units as usize {
            let record_id = format!("addUnit-{}", changeset.next_id());
            allocated.insert(
                format!("{service_name}/{index}"),
                ChangeRecord {
                    id: record_id,
                    method: "addUnit",
                    args: vec![format!("${deploy_id}").into(), Value::Integer(1), Value::Null],
                    requires: vec![],
                },
            );
        }
    }

    // Second pass: resolve placement directives and emit in (service, index)
    // order.
    for (service_name, service) in &bundle.services {
        let num_units = service.num_units as usize;
        let mut directives = service.placement_directives();
        if changeset.dialect.machine_placement() && !directives.is_empty() {
            // a short directive list repeats its last entry; it is never truncated
            let last = directives.last().expect("directive list is non-empty").clone();
            while directives.len() < num_units {
                directives.push(last.clone());
            }
        }

        for index in 0..num_units {
            let unit_name = format!("{service_name}/{index}");
            let mut record = allocated
                .shift_remove(&unit_name)
                .expect("every unit was allocated in the first pass");

            if let Some(token) = directives.get(index) {
                // v3 tokens are parsed for compatibility but machine
                // placement only exists in the v4 dialect
                let placement = changeset.dialect.parse_placement(token);
                if changeset.dialect.machine_placement() && !placement.machine.is_empty() {
                    let machine_id = changeset
                        .machines_added
                        .get(&placement.machine)
                        .ok_or_else(|| PlanError::UnknownMachine(placement.machine.clone()))?
                        .clone();
                    tracing::trace!(unit = %unit_name, machine = %placement.machine, "unit placed on machine");
                    record.requires.push(machine_id.clone());
                    record.args[2] = format!("${machine_id}").into();
                }
            }

            changeset.send(record);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bundle;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn drained(changeset: &mut ChangeSet) -> serde_json::Value {
        serde_json::to_value(changeset.drain()).unwrap()
    }

    #[test]
    fn services_stage() {
        let bundle = bundle! {r#"
        services:
          django:
            charm: cs:trusty/django-42
          mysql-master:
            charm: cs:utopic/mysql-47
          mysql-slave:
            charm: cs:utopic/mysql-47
            options:
              key1: value1
              key2: value2
        "#};
        let mut changeset = ChangeSet::new(&bundle);

        let next_stage = handle_services(&mut changeset).unwrap();
        assert_eq!(next_stage, Some(Stage::Machines));

        assert_eq!(
            drained(&mut changeset),
            json!([
                {
                    "id": "addCharm-0",
                    "method": "addCharm",
                    "args": ["cs:trusty/django-42"],
                    "requires": []
                },
                {
                    "id": "addService-1",
                    "method": "deploy",
                    "args": ["cs:trusty/django-42", "django", {}],
                    "requires": ["addCharm-0"]
                },
                {
                    "id": "addCharm-2",
                    "method": "addCharm",
                    "args": ["cs:utopic/mysql-47"],
                    "requires": []
                },
                {
                    "id": "addService-3",
                    "method": "deploy",
                    "args": ["cs:utopic/mysql-47", "mysql-master", {}],
                    "requires": ["addCharm-2"]
                },
                {
                    "id": "addService-4",
                    "method": "deploy",
                    "args": ["cs:utopic/mysql-47", "mysql-slave", {
                        "key1": "value1",
                        "key2": "value2"
                    }],
                    "requires": ["addCharm-2"]
                },
            ])
        );
    }

    #[test]
    fn services_stage_with_no_services() {
        let bundle = bundle!("services: {}");
        let mut changeset = ChangeSet::new(&bundle);

        handle_services(&mut changeset).unwrap();
        assert_eq!(changeset.drain(), vec![]);
    }

    #[test]
    fn machines_stage() {
        let bundle = bundle! {r#"
        services: {}
        machines:
          "1":
            series: vivid
          "2": {}
          "42":
            constraints:
              cpu-cores: 4
        "#};
        let mut changeset = ChangeSet::new(&bundle);

        let next_stage = handle_machines(&mut changeset).unwrap();
        assert_eq!(next_stage, Some(Stage::Units));

        assert_eq!(
            drained(&mut changeset),
            json!([
                {
                    "id": "addMachine-0",
                    "method": "addMachine",
                    "args": ["vivid", {}],
                    "requires": []
                },
                {
                    "id": "addMachine-1",
                    "method": "addMachine",
                    "args": ["", {}],
                    "requires": []
                },
                {
                    "id": "addMachine-2",
                    "method": "addMachine",
                    "args": ["", {"cpu-cores": 4}],
                    "requires": []
                },
            ])
        );
    }

    #[test]
    fn machines_stage_with_no_machines() {
        let bundle = bundle!("services: {}");
        let mut changeset = ChangeSet::new(&bundle);

        handle_machines(&mut changeset).unwrap();
        assert_eq!(changeset.drain(), vec![]);
    }

    /// Run the stages before `units` and throw their records away.
    fn changeset_at_units_stage<'b>(bundle: &'b Bundle) -> ChangeSet<'b> {
        let mut changeset = ChangeSet::new(bundle);
        handle_services(&mut changeset).unwrap();
        handle_machines(&mut changeset).unwrap();
        changeset.drain();
        changeset
    }

    #[test]
    fn units_stage_emits_one_record_per_unit() {
        let bundle = bundle! {r#"
        services:
          django:
            charm: cs:trusty/django-42
            num_units: 2
        "#};
        let mut changeset = changeset_at_units_stage(&bundle);

        let next_stage = handle_units(&mut changeset).unwrap();
        assert_eq!(next_stage, None);

        assert_eq!(
            drained(&mut changeset),
            json!([
                {
                    "id": "addUnit-2",
                    "method": "addUnit",
                    "args": ["$addService-1", 1, null],
                    "requires": []
                },
                {
                    "id": "addUnit-3",
                    "method": "addUnit",
                    "args": ["$addService-1", 1, null],
                    "requires": []
                },
            ])
        );
    }

    #[test]
    fn units_stage_wires_v4_machine_placement() {
        let bundle = bundle! {r#"
        services:
          django:
            charm: cs:trusty/django-42
            num_units: 1
            to: "42"
        machines:
          "42": {}
        "#};
        let mut changeset = changeset_at_units_stage(&bundle);

        handle_units(&mut changeset).unwrap();
        assert_eq!(
            drained(&mut changeset),
            json!([
                {
                    "id": "addUnit-3",
                    "method": "addUnit",
                    "args": ["$addService-1", 1, "$addMachine-2"],
                    "requires": ["addMachine-2"]
                },
            ])
        );
    }

    #[test]
    fn units_stage_ignores_v3_machine_placement() {
        // no machines key: v3 dialect, the directive parses but nothing is wired
        let bundle = bundle! {r#"
        services:
          django:
            charm: cs:trusty/django-42
            num_units: 1
            to: "0"
        "#};
        let mut changeset = changeset_at_units_stage(&bundle);

        handle_units(&mut changeset).unwrap();
        assert_eq!(
            drained(&mut changeset),
            json!([
                {
                    "id": "addUnit-2",
                    "method": "addUnit",
                    "args": ["$addService-1", 1, null],
                    "requires": []
                },
            ])
        );
    }

    #[test]
    fn units_stage_fails_on_unknown_machine() {
        let bundle = bundle! {r#"
        services:
          django:
            charm: cs:trusty/django-42
            num_units: 1
            to: "42"
        machines: {}
        "#};
        let mut changeset = changeset_at_units_stage(&bundle);

        assert_eq!(
            handle_units(&mut changeset),
            Err(PlanError::UnknownMachine("42".to_string()))
        );
    }

    #[test]
    fn failed_run_yields_the_error_once_and_fuses() {
        let bundle = bundle! {r#"
        services:
          django:
            charm: cs:trusty/django-42
            num_units: 1
            to: "42"
        machines: {}
        "#};

        let mut run = changes(&bundle);
        // services stage: addCharm + deploy
        assert!(run.next().unwrap().is_ok());
        assert!(run.next().unwrap().is_ok());
        // units stage fails before publishing anything
        assert_eq!(
            run.next(),
            Some(Err(PlanError::UnknownMachine("42".to_string())))
        );
        assert_eq!(run.next(), None);
        assert_eq!(run.next(), None);
    }
}
