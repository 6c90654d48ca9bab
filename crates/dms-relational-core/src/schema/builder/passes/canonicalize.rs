use crate::{
    schema::{ordering, RelationalModelSetBuilderContext, RelationalModelSetPass},
    Result,
};

/// Puts every table and inventory into canonical order.
#[derive(Debug)]
pub struct CanonicalizeOrdering;

impl RelationalModelSetPass for CanonicalizeOrdering {
    fn name(&self) -> &'static str {
        "CanonicalizeOrdering"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        for table in cx.tables_mut() {
            ordering::canonicalize_table(table);
        }

        ordering::sort_resources(&mut cx.concrete_resources);
        ordering::sort_abstract_identity_tables(&mut cx.abstract_identity_tables);
        ordering::sort_union_views(&mut cx.abstract_union_views);
        ordering::sort_indexes(&mut cx.indexes);
        ordering::sort_triggers(&mut cx.triggers);

        Ok(())
    }
}
