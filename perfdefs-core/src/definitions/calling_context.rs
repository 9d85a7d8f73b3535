//! Calling contexts and the interrupt generators that sample them.

use super::{Definition, HandleType, RegionHandle, SourceCodeLocationHandle, StringHandle};
use crate::arena::PageManager;
use crate::context::Definitions;
use crate::error::Result;
use crate::hash::KeyHasher;
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::{Handle, InterruptGeneratorMode, MetricBase};

/// Handle to a [`CallingContextDef`].
pub type CallingContextHandle = Handle<CallingContextDef>;

/// A frame of a sampled call stack.
///
/// The instruction pointer is kept for reference only. Identity is the
/// offset within the file plus the region, source location and parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallingContextDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) ip: u64,
    pub(crate) ip_offset: u64,
    pub(crate) file: StringHandle,
    pub(crate) region: RegionHandle,
    pub(crate) source_code_location: SourceCodeLocationHandle,
    pub(crate) parent: CallingContextHandle,
}

impl CallingContextDef {
    /// Instruction pointer.
    #[must_use]
    pub fn ip(&self) -> u64 {
        self.ip
    }

    /// Instruction pointer relative to the file it was loaded from.
    #[must_use]
    pub fn ip_offset(&self) -> u64 {
        self.ip_offset
    }

    /// Object file, `INVALID` if unknown.
    #[must_use]
    pub fn file(&self) -> StringHandle {
        self.file
    }

    /// The region.
    #[must_use]
    pub fn region(&self) -> RegionHandle {
        self.region
    }

    /// Source location, `INVALID` if unknown.
    #[must_use]
    pub fn source_code_location(&self) -> SourceCodeLocationHandle {
        self.source_code_location
    }

    /// Calling frame, `INVALID` for roots.
    #[must_use]
    pub fn parent(&self) -> CallingContextHandle {
        self.parent
    }
}

impl Definition for CallingContextDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .pod(self.ip_offset)
            .optional_handle(self.file)
            .handle(self.region)
            .optional_handle(self.source_code_location)
            .optional_handle(self.parent)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.ip_offset == candidate.ip_offset
            && existing.file == candidate.file
            && existing.region == candidate.region
            && existing.source_code_location == candidate.source_code_location
            && existing.parent == candidate.parent
    }
}

/// Handle to an [`InterruptGeneratorDef`].
pub type InterruptGeneratorHandle = Handle<InterruptGeneratorDef>;

/// A source of sampling interrupts: a timer or an overflowing counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptGeneratorDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) name: StringHandle,
    pub(crate) mode: InterruptGeneratorMode,
    pub(crate) base: MetricBase,
    pub(crate) exponent: i64,
    pub(crate) period: u64,
}

impl InterruptGeneratorDef {
    /// Generator name.
    #[must_use]
    pub fn name(&self) -> StringHandle {
        self.name
    }

    /// Time or count based.
    #[must_use]
    pub fn mode(&self) -> InterruptGeneratorMode {
        self.mode
    }

    /// Base of the period's unit.
    #[must_use]
    pub fn base(&self) -> MetricBase {
        self.base
    }

    /// Exponent of the period's unit.
    #[must_use]
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Interrupt period.
    #[must_use]
    pub fn period(&self) -> u64 {
        self.period
    }
}

impl Definition for InterruptGeneratorDef {
    fn key_hash(&self, arena: &PageManager) -> u32 {
        KeyHasher::new(arena)
            .handle(self.name)
            .pod(self.mode)
            .pod(self.base)
            .pod(self.exponent)
            .pod(self.period)
            .finish()
    }

    fn equal(existing: &Self, candidate: &Self) -> bool {
        existing.name == candidate.name
            && existing.mode == candidate.mode
            && existing.base == candidate.base
            && existing.exponent == candidate.exponent
            && existing.period == candidate.period
    }
}

impl DefinitionManager {
    /// Intern a calling context.
    pub fn define_calling_context(
        &mut self,
        ip: u64,
        ip_offset: u64,
        file: StringHandle,
        region: RegionHandle,
        source_code_location: SourceCodeLocationHandle,
        parent: CallingContextHandle,
    ) -> Result<Interned<CallingContextDef>> {
        self.intern(CallingContextDef {
            header: DefinitionHeader::new(),
            ip,
            ip_offset,
            file,
            region,
            source_code_location,
            parent,
        })
    }

    /// Intern an interrupt generator.
    pub fn define_interrupt_generator(
        &mut self,
        name: StringHandle,
        mode: InterruptGeneratorMode,
        base: MetricBase,
        exponent: i64,
        period: u64,
    ) -> Result<Interned<InterruptGeneratorDef>> {
        self.intern(InterruptGeneratorDef {
            header: DefinitionHeader::new(),
            name,
            mode,
            base,
            exponent,
            period,
        })
    }
}

impl Definitions {
    /// Define a calling context for a sampled frame.
    pub fn new_calling_context(
        &self,
        ip: u64,
        region: RegionHandle,
        source_code_location: SourceCodeLocationHandle,
        parent: CallingContextHandle,
    ) -> Result<CallingContextHandle> {
        self.define(|local| {
            local.define_calling_context(
                ip,
                0,
                StringHandle::INVALID,
                region,
                source_code_location,
                parent,
            )
        })
    }

    /// The region of a calling context.
    #[must_use]
    pub fn calling_context_region(&self, calling_context: CallingContextHandle) -> RegionHandle {
        self.lock().get(calling_context).region
    }

    /// The parent of a calling context.
    #[must_use]
    pub fn calling_context_parent(
        &self,
        calling_context: CallingContextHandle,
    ) -> CallingContextHandle {
        self.lock().get(calling_context).parent
    }

    /// Define an interrupt generator.
    ///
    /// A missing name becomes `"<unknown interrupt generator>"`.
    pub fn new_interrupt_generator(
        &self,
        name: Option<&str>,
        mode: InterruptGeneratorMode,
        base: MetricBase,
        exponent: i64,
        period: u64,
    ) -> Result<InterruptGeneratorHandle> {
        self.define(|local| {
            let name = local.define_string_or(name, "<unknown interrupt generator>")?;
            local.define_interrupt_generator(name, mode, base, exponent, period)
        })
    }
}

/// Re-create a local calling context in the unified manager.
pub fn unify_calling_context(
    source: &mut DefinitionManager,
    handle: CallingContextHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let kind = HandleType::CallingContext;
    let file = source.optional_unified(kind, "file", definition.file)?;
    let region = source.unified_handle(kind, "region", definition.region)?;
    let source_code_location =
        source.optional_unified(kind, "source code location", definition.source_code_location)?;
    let parent = source.optional_unified(kind, "parent", definition.parent)?;

    let counterpart = unified
        .define_calling_context(
            definition.ip,
            definition.ip_offset,
            file,
            region,
            source_code_location,
            parent,
        )?
        .handle();
    source.set_unified(handle, counterpart)
}

/// Re-create a local interrupt generator in the unified manager.
pub fn unify_interrupt_generator(
    source: &mut DefinitionManager,
    handle: InterruptGeneratorHandle,
    unified: &mut DefinitionManager,
) -> Result<()> {
    let definition = source.get(handle).clone();
    let name = source.unified_handle(HandleType::InterruptGenerator, "name", definition.name)?;
    let counterpart = unified
        .define_interrupt_generator(
            name,
            definition.mode,
            definition.base,
            definition.exponent,
            definition.period,
        )?
        .handle();
    source.set_unified(handle, counterpart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;
    use crate::definitions::{unify_region, unify_string};
    use crate::substrate::RecordingNotifier;
    use crate::types::{ParadigmType, RegionType};
    use std::sync::Arc;

    fn region(definitions: &Definitions, name: &str) -> RegionHandle {
        definitions
            .new_region(
                Some(name),
                None,
                Handle::INVALID,
                0,
                0,
                ParadigmType::Sampling,
                RegionType::Function,
            )
            .unwrap()
    }

    #[test]
    fn frames_are_notified_and_form_a_tree() {
        let recorder = Arc::new(RecordingNotifier::new());
        let definitions = Definitions::new(DefinitionsConfig::default())
            .unwrap()
            .with_substrate(recorder.clone());
        let main = region(&definitions, "main");
        let work = region(&definitions, "work");
        let root = definitions
            .new_calling_context(0x1000, main, Handle::INVALID, Handle::INVALID)
            .unwrap();
        let leaf = definitions
            .new_calling_context(0x2000, work, Handle::INVALID, root)
            .unwrap();

        assert_eq!(recorder.count_of(HandleType::CallingContext), 2);
        assert_eq!(definitions.calling_context_region(leaf), work);
        assert_eq!(definitions.calling_context_parent(leaf), root);
        assert!(!definitions.calling_context_parent(root).is_valid());
    }

    #[test]
    fn unify_ignores_the_instruction_pointer() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let main = region(&definitions, "main");
        let a = definitions
            .new_calling_context(0x1000, main, Handle::INVALID, Handle::INVALID)
            .unwrap();
        let b = definitions
            .new_calling_context(0x5000, main, Handle::INVALID, Handle::INVALID)
            .unwrap();

        let mut source = definitions.into_local();
        let mut unified = DefinitionManager::new_unified(&DefinitionsConfig::default()).unwrap();
        let err = unify_calling_context(&mut source, a, &mut unified).unwrap_err();
        assert!(err.is_ordering_violation());

        for string in source.handles::<crate::definitions::StringDef>() {
            unify_string(&mut source, string, &mut unified).unwrap();
        }
        unify_region(&mut source, main, &mut unified).unwrap();
        unify_calling_context(&mut source, a, &mut unified).unwrap();
        unify_calling_context(&mut source, b, &mut unified).unwrap();
        assert_eq!(source.unified(a), source.unified(b));
        assert_eq!(unified.get(source.unified(a)).ip(), 0x1000);
    }

    #[test]
    fn interrupt_generator_defaults() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        let timer = definitions
            .new_interrupt_generator(
                None,
                InterruptGeneratorMode::Time,
                MetricBase::Decimal,
                -9,
                1_000_000,
            )
            .unwrap();
        let local = definitions.lock();
        let generator = local.get(timer);
        assert_eq!(local.string(generator.name()), "<unknown interrupt generator>");
        assert_eq!(generator.period(), 1_000_000);
    }
}
