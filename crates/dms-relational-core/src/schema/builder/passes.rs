//! The default set-level passes, in execution order.

mod abstract_identity;
pub use abstract_identity::AbstractIdentityTableAndUnionView;

mod array_uniqueness;
pub use array_uniqueness::ArrayUniquenessConstraint;

mod base_traversal;
pub use base_traversal::BaseTraversalAndDescriptorBinding;

mod canonicalize;
pub use canonicalize::CanonicalizeOrdering;

mod constraint_hashing;
pub use constraint_hashing::ConstraintDialectHashing;

mod descriptor_mapping;
pub use descriptor_mapping::DescriptorResourceMapping;

mod extension_tables;
pub use extension_tables::ExtensionTableDerivation;

mod identifier_shortening;
pub use identifier_shortening::DialectIdentifierShortening;

mod index_inventory;
pub use index_inventory::IndexInventory;

mod key_unification;

mod reference_binding;
pub use reference_binding::ReferenceBinding;

mod reference_constraint;
pub use reference_constraint::ReferenceConstraint;

mod root_identity;
pub use root_identity::RootIdentityConstraint;

mod trigger_inventory;
pub use trigger_inventory::TriggerInventory;

use super::RelationalModelSetPass;

pub fn default_passes() -> Vec<Box<dyn RelationalModelSetPass>> {
    vec![
        Box::new(BaseTraversalAndDescriptorBinding),
        Box::new(DescriptorResourceMapping),
        Box::new(ExtensionTableDerivation),
        Box::new(ReferenceBinding),
        Box::new(AbstractIdentityTableAndUnionView),
        Box::new(RootIdentityConstraint),
        Box::new(ReferenceConstraint),
        Box::new(ArrayUniquenessConstraint),
        Box::new(ConstraintDialectHashing),
        Box::new(IndexInventory),
        Box::new(TriggerInventory),
        Box::new(DialectIdentifierShortening),
        Box::new(CanonicalizeOrdering),
    ]
}
