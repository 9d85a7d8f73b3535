//! Measurement-wide properties.
//!
//! Each location reports whether a property such as "all MPI communication
//! was recorded" still holds. Reports are merged by the property's
//! condition: an `All` property is invalidated only if every report
//! invalidates it, an `Any` property as soon as one report does.

use super::{Definition, HandleType};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{Handle, PropertyCondition, PropertyKind};

/// Handle to a [`PropertyDef`].
pub type PropertyHandle = Handle<PropertyDef>;

/// One report of a measurement property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) property: PropertyKind,
    pub(crate) condition: PropertyCondition,
    pub(crate) initial_value: bool,
    pub(crate) invalidated: bool,
}

impl PropertyDef {
    /// Which property.
    #[must_use]
    pub fn property(&self) -> PropertyKind {
        self.property
    }

    /// How reports are merged.
    #[must_use]
    pub fn condition(&self) -> PropertyCondition {
        self.condition
    }

    /// Value of the property while not invalidated.
    #[must_use]
    pub fn initial_value(&self) -> bool {
        self.initial_value
    }

    /// Check if the report invalidates the property.
    #[must_use]
    pub fn invalidated(&self) -> bool {
        self.invalidated
    }

    /// Current value of the property.
    #[must_use]
    pub fn value(&self) -> bool {
        self.initial_value != self.invalidated
    }
}

impl Definition for PropertyDef {
    const SUBSTRATE_AWARE: bool = false;

    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .pod(self.property)
            .pod(self.condition)
            .pod(self.initial_value)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.property == candidate.property
            && existing.condition == candidate.condition
            && existing.initial_value == candidate.initial_value
    }

    fn resolve_duplicate(existing: &mut Self, candidate: &Self) -> bool {
        if !Self::equal(existing, candidate) {
            return false;
        }
        existing.invalidated = match existing.condition {
            PropertyCondition::All => existing.invalidated && candidate.invalidated,
            PropertyCondition::Any => existing.invalidated || candidate.invalidated,
        };
        true
    }
}

impl DefinitionManager {
    /// Intern a property report, merging it into an existing one.
    pub fn define_property(
        &mut self,
        property: PropertyKind,
        condition: PropertyCondition,
        initial_value: bool,
        invalidated: bool,
    ) -> Result<Interned<PropertyDef>> {
        self.intern(PropertyDef {
            header: DefinitionHeader::new(),
            property,
            condition,
            initial_value,
            invalidated,
        })
    }
}

impl Definitions {
    /// Define a property that holds `initial_value` until invalidated.
    pub fn new_property(
        &self,
        property: PropertyKind,
        condition: PropertyCondition,
        initial_value: bool,
    ) -> Result<PropertyHandle> {
        self.define(|local| local.define_property(property, condition, initial_value, false))
    }

    /// Invalidate every local report of `property`.
    pub fn invalidate_property(&self, property: PropertyKind) {
        let mut local = self.lock();
        for handle in local.handles::<PropertyDef>() {
            let definition = local.get_mut(handle);
            if definition.property == property {
                definition.invalidated = true;
            }
        }
    }
}

/// Merge a local property report into the unified manager.
pub fn unify_property(
    source: &mut DefinitionManager,
    handle: PropertyHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let counterpart = unified
        .define_property(
            definition.property,
            definition.condition,
            definition.initial_value,
            definition.invalidated,
        )?
        .handle();
    tracing::trace!(
        kind = %HandleType::Property,
        property = ?definition.property,
        invalidated = unified.get(counterpart).invalidated,
        "Merged property report"
    );
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;

    fn merged(condition: PropertyCondition, reports: &[bool]) -> bool {
        let config = DefinitionsConfig::default();
        let mut unified = DefinitionManager::new_unified(&config).unwrap();
        let mut handle = PropertyHandle::INVALID;
        for &invalidated in reports {
            handle = unified
                .define_property(
                    PropertyKind::MpiCommunicationComplete,
                    condition,
                    true,
                    invalidated,
                )
                .unwrap()
                .handle();
        }
        assert_eq!(unified.count::<PropertyDef>(), 1);
        unified.get(handle).invalidated()
    }

    #[test]
    fn all_requires_every_report() {
        assert!(!merged(PropertyCondition::All, &[true, false]));
        assert!(merged(PropertyCondition::All, &[true, true]));
    }

    #[test]
    fn any_takes_a_single_report() {
        assert!(merged(PropertyCondition::Any, &[true, false]));
        assert!(merged(PropertyCondition::Any, &[false, true]));
        assert!(!merged(PropertyCondition::Any, &[false, false]));
    }

    #[test]
    fn invalidation_flips_the_value() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let complete = definitions
            .new_property(
                PropertyKind::ThreadForkJoinEventComplete,
                PropertyCondition::All,
                true,
            )
            .unwrap();
        let reused = definitions
            .new_property(PropertyKind::PthreadLocationReused, PropertyCondition::Any, false)
            .unwrap();
        definitions.invalidate_property(PropertyKind::PthreadLocationReused);

        let local = definitions.lock();
        assert!(local.get(complete).value());
        assert!(local.get(reused).invalidated());
        assert!(local.get(reused).value());
    }
}
