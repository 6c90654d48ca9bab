mod abstract_resource;
pub use abstract_resource::{
    AbstractIdentityTableInfo, AbstractUnionViewInfo, UnionViewArm, UnionViewOutputColumn,
    UnionViewProjection,
};

mod column;
pub use column::{ColumnKind, ColumnStorage, DbColumnModel, RelationalScalarType, ScalarKind};

mod constraint;
pub use constraint::{ReferentialAction, TableConstraint, TableConstraintKind};

mod index;
pub use index::{DbIndexInfo, IndexKind};

mod key_unification;
pub use key_unification::{
    AppliedEqualityConstraint, ColumnBinding, DescriptorForeignKeyDeduplication,
    IgnoredEqualityConstraint, KeyUnificationClass, KeyUnificationEqualityConstraintDiagnostics,
    RedundantEqualityConstraint,
};

mod resource;
pub use resource::{
    ConcreteResourceModel, DescriptorEdgeSource, DescriptorMetadata, DocumentReferenceBinding,
    ExtensionSite, ReferenceIdentityBinding, RelationalResourceModel, ResourceStorageKind,
};

mod table;
pub use table::{DbKeyColumn, DbTableModel, DbTableName};
pub(crate) use table::owning_table_index;

mod trigger;
pub use trigger::{DbTriggerInfo, TriggerKind};
