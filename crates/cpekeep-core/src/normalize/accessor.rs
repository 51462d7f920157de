// ── Value accessor ──
//
// Reads logical settings off a tree and turns logical writes into
// `(path, value, type)` instructions. Never talks to a device.

use cpekeep_acs::WireType;
use tracing::debug;

use super::detect::{Detection, Dialect};
use super::radio::{BandLayout, resolve_bands};
use super::resolve::{IndexVars, PathResolver};
use crate::error::CoreError;
use crate::model::{Band, DeviceTree, ParamValue, WriteInstruction};

/// Read/write view over one device tree.
#[derive(Debug, Clone)]
pub struct Accessor<'t> {
    tree: &'t DeviceTree,
    resolver: PathResolver,
    bands: BandLayout,
}

impl<'t> Accessor<'t> {
    pub fn new(tree: &'t DeviceTree) -> Self {
        let resolver = PathResolver::new(tree);
        let bands = resolve_bands(tree, resolver.dialect());
        Self {
            tree,
            resolver,
            bands,
        }
    }

    pub fn tree(&self) -> &'t DeviceTree {
        self.tree
    }

    pub fn detection(&self) -> Detection {
        self.resolver.detection()
    }

    pub fn dialect(&self) -> Dialect {
        self.resolver.dialect()
    }

    pub fn bands(&self) -> BandLayout {
        self.bands
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// First non-null, non-empty value among the candidate paths.
    pub fn get(&self, logical: &str, vars: &IndexVars) -> Option<&'t ParamValue> {
        let tree = self.tree;
        let found = self
            .resolver
            .resolve(logical, vars)
            .iter()
            .find_map(|path| tree.value(path).filter(|v| !v.is_empty()));
        if found.is_none() {
            debug!(logical, dialect = %self.dialect(), "no value for logical path");
        }
        found
    }

    /// First value among several logical names (primary, then alternates).
    pub fn get_first(&self, logicals: &[&str], vars: &IndexVars) -> Option<&'t ParamValue> {
        logicals.iter().find_map(|l| self.get(l, vars))
    }

    /// Wi-Fi read for a band; `None` when the band is absent.
    pub fn get_band(&self, logicals: &[&str], band: Band) -> Option<&'t ParamValue> {
        let index = self.bands.get(band)?;
        self.get_first(logicals, &index.vars())
    }

    pub fn has_parameter(&self, logical: &str, vars: &IndexVars) -> bool {
        self.get(logical, vars).is_some()
    }

    /// Build the write instruction for `logical`.
    pub fn set(
        &self,
        logical: &str,
        value: impl Into<ParamValue>,
        vars: &IndexVars,
    ) -> Result<WriteInstruction, CoreError> {
        let value = value.into();
        let path = self.resolver.resolve_write(logical, vars)?;
        Ok(WriteInstruction {
            path,
            wire_type: infer_wire_type(&value),
            value: value.as_text(),
        })
    }

    /// Wi-Fi write for a band; `Ok(None)` when the band is absent.
    pub fn set_band(
        &self,
        logical: &str,
        band: Band,
        value: impl Into<ParamValue>,
    ) -> Result<Option<WriteInstruction>, CoreError> {
        match self.bands.get(band) {
            Some(index) => self.set(logical, value, &index.vars()).map(Some),
            None => Ok(None),
        }
    }
}

/// Wire type from a value's shape: booleans, integers, everything else text.
pub fn infer_wire_type(value: &ParamValue) -> WireType {
    match value {
        ParamValue::Bool(_) => WireType::Boolean,
        ParamValue::Int(_) => WireType::UnsignedInt,
        ParamValue::Float(_) | ParamValue::Text(_) => WireType::String,
    }
}
