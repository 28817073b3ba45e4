//! # bundleplan - deployment bundle to changeset translation
//!
//! ## Introduction for developers
//!
//! Read this to understand how `bundleplan` works internally.
//!
//! ### Bundle terms
//!
//! Quick introduction to terms used to describe elements of bundle documents.
//!
//! In bundle terms...
//! - a `service` is a named thing to deploy
//! - ...backed by a `charm`: an installable blueprint identified by a string
//!   reference such as `cs:trusty/django-42`
//! - a `machine` is a named slot a unit can run on
//! - a `unit` is one running instance of a service (`num_units` per service)
//! - a `placement directive` is a token in a service's `to` field describing
//!   where a unit should run: a machine, a container on a machine, or
//!   co-located with another service's unit
//!
//! This is a valid bundle document:
//! ```yaml
//! services:
//!   django:
//!     charm: cs:trusty/django-42
//!     num_units: 2
//!     to: ["0", "lxc:1"]
//!   mysql:
//!     charm: cs:utopic/mysql-47
//! machines:
//!   "0": {}
//!   "1":
//!     series: vivid
//! ```
//!
//! ### Loading documents
//!
//! A bundle document is decoded into a [bundle::Bundle] via serde. Mappings
//! keep their document order ([indexmap::IndexMap]) because the order in
//! which services and machines appear determines the numbering of the emitted
//! records, and therefore output determinism.
//!
//! Structural well-formedness is not the translation core's business: the
//! typed decode rejects documents without a `services` mapping or a service
//! without a `charm`, and [validate::validate] runs the remaining pre-flight
//! checks (empty charm strings, placement directives pointing nowhere) before
//! the core is handed the bundle.
//!
//! ### Dialects
//!
//! There are two incompatible placement-token syntaxes. Version 3 separates
//! the unit index with `=` (`mysql=1`), version 4 with `/` (`mysql/1`), and
//! only version 4 supports placing units on machines. A document signals the
//! v4 dialect by carrying a top-level `machines` key (even an empty one).
//! The [placement::Dialect] is selected once per run and drives both token
//! parsing and whether machine placements are wired into dependencies.
//!
//! ### Translation
//!
//! see [plan::changes]
//!
//! Translation runs as a three-stage state machine over one
//! [changeset::ChangeSet]: `services` emits one `addCharm` per distinct charm
//! plus one deploy record per service, `machines` emits one `addMachine` per
//! machine, and `units` allocates `addUnit` records in a first pass, then
//! resolves placement directives and dependency edges in a second pass. Each
//! stage names its successor; after a stage returns, its queued records are
//! drained to the caller in emission order.
//!
//! Record ids (`addCharm-0`, `addService-1`, ...) take their number from a
//! single counter shared by all stages, so ids are unique and strictly
//! increasing across the whole run. A record's `requires` list only ever
//! names ids emitted earlier - the sequence is a topologically ordered DAG
//! a deployment client can execute front to back.
//!
//! ### Output
//!
//! Records reference the results of earlier records with the `"$<id>"`
//! convention in their `args` (for example a unit's deploy target,
//! `$addService-1`). Args are [value::Value]s which serialize via [serde],
//! preserving mapping order; the CLI prints the drained sequence as one JSON
//! or YAML array.
pub mod bundle;
pub mod changeset;
pub mod placement;
pub mod plan;
pub mod validate;
pub mod value;
