//! placement directive parsing
//!
//! A placement token names where a unit should run. The full shape is
//! `container:target<sep>unit` where every part is optional, `target` is a
//! machine number or a service name, and `<sep>` depends on the bundle
//! syntax version: `=` for v3 (`lxc:mysql=1`), `/` for v4 (`lxc:mysql/1`).
use crate::bundle::Bundle;

/// A parsed placement directive. Fields are empty when absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnitPlacement {
    pub container_type: String,
    pub machine: String,
    pub service: String,
    pub unit: String,
}

/// The two bundle syntax versions.
///
/// Selected once per translation run and consulted wherever behavior depends
/// on the version, instead of re-deriving it per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    V3,
    V4,
}

impl Dialect {
    /// Select the dialect for a bundle: a top-level `machines` key - even an
    /// empty one - signals version 4.
    pub fn of(bundle: &Bundle) -> Self {
        if bundle.machines.is_some() {
            Dialect::V4
        } else {
            Dialect::V3
        }
    }

    /// Whether units may be placed on entries of the `machines` mapping.
    /// Version 3 tokens still parse, but machine placement is not wired into
    /// the changeset.
    pub fn machine_placement(self) -> bool {
        matches!(self, Dialect::V4)
    }

    fn unit_separator(self) -> char {
        match self {
            Dialect::V3 => '=',
            Dialect::V4 => '/',
        }
    }

    /// Parse a placement token into a [UnitPlacement].
    ///
    /// An empty token yields the all-empty placement ("no placement"). A
    /// target that is anything but digits falls into the service branch -
    /// unrecognized shapes degrade instead of erroring. Each separator is
    /// split at most once, at its first occurrence; the remainder is kept
    /// whole. That is policy, not an accident.
    pub fn parse_placement(self, token: &str) -> UnitPlacement {
        let mut placement = UnitPlacement::default();
        let mut target = token;

        if let Some((container_type, rest)) = target.split_once(':') {
            placement.container_type = container_type.to_string();
            target = rest;
        }
        if let Some((rest, unit)) = target.split_once(self.unit_separator()) {
            placement.unit = unit.to_string();
            target = rest;
        }
        if !target.is_empty() && target.bytes().all(|byte| byte.is_ascii_digit()) {
            placement.machine = target.to_string();
        } else {
            placement.service = target.to_string();
        }

        placement
    }
}
