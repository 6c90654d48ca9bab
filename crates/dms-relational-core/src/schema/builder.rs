mod context;
pub use context::RelationalModelSetBuilderContext;

mod extension_keys;

pub mod passes;

mod resource;
pub use resource::{
    NameOverrideKind, NameOverrides, RelationalModelBuilderContext, ResourceStep,
};

mod traversal;

use super::{DerivedRelationalModelSet, SqlDialect, SqlDialectRules};
use crate::{err, effective::EffectiveSchemaSet, Result};

use std::fmt::Debug;

/// One set-level transformation over the shared builder context.
///
/// Passes run in a fixed order and may read everything earlier passes
/// produced. A pass must not rely on the insertion order of the context's
/// inventories.
pub trait RelationalModelSetPass: Debug {
    fn name(&self) -> &'static str;

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()>;
}

/// Runs an ordered list of set-level passes and produces the final model.
#[derive(Debug)]
pub struct DerivedRelationalModelSetBuilder {
    passes: Vec<Box<dyn RelationalModelSetPass>>,
}

impl DerivedRelationalModelSetBuilder {
    pub fn new(passes: Vec<Box<dyn RelationalModelSetPass>>) -> Self {
        DerivedRelationalModelSetBuilder { passes }
    }

    /// A builder running [`passes::default_passes`].
    pub fn default_passes() -> Self {
        Self::new(passes::default_passes())
    }

    pub fn passes(&self) -> impl Iterator<Item = &dyn RelationalModelSetPass> {
        self.passes.iter().map(|pass| &**pass)
    }

    /// Appends a pass after the existing ones.
    pub fn pass(&mut self, pass: impl RelationalModelSetPass + 'static) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn build(
        &self,
        effective: &EffectiveSchemaSet,
        dialect: SqlDialect,
        rules: &dyn SqlDialectRules,
    ) -> Result<DerivedRelationalModelSet> {
        let mut cx = RelationalModelSetBuilderContext::new(effective, dialect, rules)?;

        for pass in &self.passes {
            log::debug!("running set pass {}", pass.name());
            pass.execute(&mut cx)
                .map_err(|e| e.context(err!("set pass {} failed", pass.name())))?;
        }

        cx.build_result()
    }
}

impl Default for DerivedRelationalModelSetBuilder {
    fn default() -> Self {
        Self::default_passes()
    }
}
