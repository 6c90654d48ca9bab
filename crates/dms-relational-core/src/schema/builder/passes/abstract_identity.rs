use crate::{
    schema::{
        builder::traversal::keyed_table,
        constraint_naming,
        db::{
            AbstractIdentityTableInfo, AbstractUnionViewInfo, ColumnKind, DbColumnModel,
            DbKeyColumn, DbTableModel, DbTableName, ReferentialAction, RelationalScalarType,
            ScalarKind, TableConstraint, UnionViewArm, UnionViewOutputColumn,
            UnionViewProjection,
        },
        input::AbstractResourceSchema,
        name::to_pascal_case,
        JsonPath, JsonPathSegment, QualifiedResourceName, RelationalModelSetBuilderContext,
        RelationalModelSetPass,
    },
    Error, Result,
};

use std::cmp;

const DISCRIMINATOR: &str = "Discriminator";
const DISCRIMINATOR_MAX_LENGTH: u32 = 256;

/// Derives the shared identity table and the union view of every abstract
/// resource from its concrete members.
#[derive(Debug)]
pub struct AbstractIdentityTableAndUnionView;

/// A concrete member of an abstract resource, with its root table.
struct Member {
    resource: QualifiedResourceName,
    root: DbTableModel,
    identity_json_paths: Vec<JsonPath>,
    superclass_identity_json_path: Option<JsonPath>,
}

/// Kind and type an identity column shares across members.
#[derive(Debug, Clone, PartialEq)]
struct Signature {
    kind: ColumnKind,
    ty: RelationalScalarType,
    target: Option<QualifiedResourceName>,
}

struct IdentityColumn {
    column: DbColumnModel,
    /// Source column in each member's root table, in member order
    member_columns: Vec<String>,
}

impl RelationalModelSetPass for AbstractIdentityTableAndUnionView {
    fn name(&self) -> &'static str {
        "AbstractIdentityTableAndUnionView"
    }

    fn execute(&self, cx: &mut RelationalModelSetBuilderContext<'_>) -> Result<()> {
        let abstract_resources: Vec<(String, AbstractResourceSchema)> = cx
            .schema
            .projects
            .iter()
            .flat_map(|project| {
                project
                    .abstract_resources
                    .iter()
                    .map(move |schema| (project.info.physical_schema.clone(), schema.clone()))
            })
            .collect();

        for (physical_schema, schema) in abstract_resources {
            let abstract_resource = &schema.resource;
            let members = members_of(cx, abstract_resource)?;

            if members.is_empty() {
                return Err(Error::invalid_schema(format!(
                    "Abstract resource '{abstract_resource}' has no concrete members"
                )));
            }

            let identity = schema
                .identity_json_paths
                .iter()
                .map(|path| identity_column(abstract_resource, path, &members))
                .collect::<Result<Vec<_>>>()?;

            let base = to_pascal_case(&abstract_resource.resource_name);
            let table_name = DbTableName::new(&physical_schema, format!("{base}Identity"));
            let table = identity_table(cx, table_name, &identity);

            let view = union_view(
                abstract_resource,
                DbTableName::new(&physical_schema, format!("{base}_View")),
                &identity,
                &members,
            )?;

            log::debug!(
                "abstract resource {abstract_resource}: {} members, {} identity columns",
                members.len(),
                identity.len()
            );

            cx.abstract_identity_tables.push(AbstractIdentityTableInfo {
                abstract_resource: abstract_resource.clone(),
                table,
            });
            cx.abstract_union_views.push(view);
        }

        Ok(())
    }
}

/// Concrete subclasses of `abstract_resource`, ordered by resource then
/// project name.
fn members_of(
    cx: &RelationalModelSetBuilderContext<'_>,
    abstract_resource: &QualifiedResourceName,
) -> Result<Vec<Member>> {
    let mut members = vec![];

    for (_, schema) in cx.schema.resources() {
        if schema.is_resource_extension || !schema.is_subclass {
            continue;
        }
        let Some(superclass) = &schema.superclass else {
            continue;
        };

        if cx.schema.abstract_resource(superclass).is_none() {
            return Err(Error::invalid_schema(format!(
                "Subclass resource '{}' declares superclass '{superclass}' that is not abstract. \
                 Subclass-of-subclass is not permitted.",
                schema.resource
            )));
        }

        if superclass != abstract_resource {
            continue;
        }

        let Some(root) = cx
            .concrete_resource(&schema.resource)
            .and_then(|model| model.relational_model.root_table())
        else {
            return Err(Error::invalid_schema(format!(
                "Concrete resource model not found for resource '{}'",
                schema.resource
            )));
        };

        members.push(Member {
            resource: schema.resource.clone(),
            root: root.clone(),
            identity_json_paths: schema.identity_json_paths.clone(),
            superclass_identity_json_path: schema.superclass_identity_json_path.clone(),
        });
    }

    members.sort_by(|a, b| {
        a.resource
            .resource_name
            .cmp(&b.resource.resource_name)
            .then_with(|| a.resource.project_name.cmp(&b.resource.project_name))
    });

    Ok(members)
}

fn identity_column(
    abstract_resource: &QualifiedResourceName,
    path: &JsonPath,
    members: &[Member],
) -> Result<IdentityColumn> {
    let mut signature: Option<Signature> = None;
    let mut member_columns = vec![];

    for member in members {
        let member_path = member_identity_path(abstract_resource, member, path)?;

        let Some(column) = member.root.column_by_source_path(member_path) else {
            return Err(Error::invalid_schema(format!(
                "Identity path '{member_path}' for member '{}' does not map to a column on table '{}'",
                member.resource, member.root.table
            )));
        };

        if column.nullable {
            return Err(Error::invalid_schema(format!(
                "Identity path '{member_path}' resolved to nullable column '{}' on resource '{}'",
                column.name, member.resource
            )));
        }

        let Some(ty) = column.ty else {
            return Err(Error::invalid_schema(format!(
                "Identity path '{member_path}' resolved to untyped column '{}' on resource '{}'",
                column.name, member.resource
            )));
        };

        let member_signature = Signature {
            kind: column.kind,
            ty,
            target: column.target_resource.clone(),
        };

        signature = Some(match signature {
            None => member_signature,
            Some(current) => {
                widen(&current, &member_signature).ok_or_else(|| {
                    Error::invalid_schema(format!(
                        "Abstract identity path '{path}' for resource '{abstract_resource}' has \
                         inconsistent column types: member '{}' differs from earlier members",
                        member.resource
                    ))
                })?
            }
        });

        member_columns.push(column.name.clone());
    }

    let Some(signature) = signature else {
        return Err(crate::err!("abstract identity path '{path}' has no members"));
    };

    let mut name = identity_part_name(path)?;
    if signature.kind == ColumnKind::DescriptorFk {
        name = format!("{name}_DescriptorId");
    }

    let mut column = DbColumnModel::new(name, signature.kind, signature.ty).source_path(path.clone());
    column.target_resource = signature.target;

    Ok(IdentityColumn {
        column,
        member_columns,
    })
}

/// The member's identity path for the abstract identity path `path`.
fn member_identity_path<'a>(
    abstract_resource: &QualifiedResourceName,
    member: &'a Member,
    path: &JsonPath,
) -> Result<&'a JsonPath> {
    if member.superclass_identity_json_path.is_some() {
        return match member.identity_json_paths.as_slice() {
            [single] => Ok(single),
            paths => Err(Error::invalid_schema(format!(
                "Member '{}' maps its identity onto the superclass but has {} identity paths \
                 (expected exactly 1)",
                member.resource,
                paths.len()
            ))),
        };
    }

    member
        .identity_json_paths
        .iter()
        .find(|candidate| *candidate == path)
        .ok_or_else(|| {
            Error::invalid_schema(format!(
                "Abstract identity path '{path}' for resource '{abstract_resource}' is not an \
                 identity path of member '{}'",
                member.resource
            ))
        })
}

/// A type able to hold the values of both signatures, if any.
fn widen(current: &Signature, member: &Signature) -> Option<Signature> {
    if current.kind != member.kind || current.target != member.target {
        return None;
    }

    let (a, b) = (current.ty, member.ty);
    let ty = match (a.kind, b.kind) {
        (ScalarKind::String, ScalarKind::String) => match (a.max_length, b.max_length) {
            (Some(x), Some(y)) => RelationalScalarType::string(cmp::max(x, y)),
            _ => RelationalScalarType::new(ScalarKind::String),
        },
        (ScalarKind::Decimal, ScalarKind::Decimal) => {
            let ((ap, as_), (bp, bs)) = (a.decimal?, b.decimal?);
            let integer_digits = cmp::max(ap.checked_sub(as_)?, bp.checked_sub(bs)?);
            let scale = cmp::max(as_, bs);
            RelationalScalarType::decimal(integer_digits + scale, scale)
        }
        (ScalarKind::Int32, ScalarKind::Int64) | (ScalarKind::Int64, ScalarKind::Int32) => {
            RelationalScalarType::int64()
        }
        (x, y) if x == y => a,
        _ => return None,
    };

    Some(Signature {
        ty,
        ..current.clone()
    })
}

/// Concatenated PascalCase of every property of an identity path.
fn identity_part_name(path: &JsonPath) -> Result<String> {
    let mut name = String::new();
    for segment in path.segments() {
        match segment {
            JsonPathSegment::Property(property) => name.push_str(&to_pascal_case(property)),
            JsonPathSegment::AnyArrayElement => {
                return Err(Error::invalid_schema(format!(
                    "Identity path '{path}' must not include array segments"
                )))
            }
        }
    }

    if name.is_empty() {
        return Err(Error::invalid_schema(format!(
            "Identity path '{path}' must include at least one property segment"
        )));
    }
    Ok(name)
}

fn identity_table(
    cx: &RelationalModelSetBuilderContext<'_>,
    name: DbTableName,
    identity: &[IdentityColumn],
) -> DbTableModel {
    let mut table = keyed_table(
        name,
        JsonPath::root(),
        vec![DbKeyColumn {
            name: "DocumentId".to_string(),
            kind: ColumnKind::ParentKeyPart,
        }],
    );

    let identity_names: Vec<String> = identity.iter().map(|i| i.column.name.clone()).collect();

    for part in identity {
        table.push_column(part.column.clone());
    }
    table.push_column(DbColumnModel::new(
        DISCRIMINATOR,
        ColumnKind::Scalar,
        RelationalScalarType::string(DISCRIMINATOR_MAX_LENGTH),
    ));

    if !identity_names.is_empty() {
        let natural_key = constraint_naming::natural_key(&table.table);
        table.push_constraint(TableConstraint::Unique {
            name: natural_key,
            columns: identity_names.clone(),
        });

        let mut reference_key = vec!["DocumentId".to_string()];
        reference_key.extend(identity_names);
        let name = constraint_naming::reference_key(&table.table);
        table.push_constraint(TableConstraint::Unique {
            name,
            columns: reference_key,
        });
    }

    let name = constraint_naming::document_fk(&table.table);
    table.push_constraint(TableConstraint::ForeignKey {
        name,
        columns: vec!["DocumentId".to_string()],
        target_table: DbTableName::new(cx.rules.core_schema_name(), "Document"),
        target_columns: vec!["DocumentId".to_string()],
        on_delete: ReferentialAction::Cascade,
        on_update: ReferentialAction::NoAction,
    });

    table
}

fn union_view(
    abstract_resource: &QualifiedResourceName,
    view: DbTableName,
    identity: &[IdentityColumn],
    members: &[Member],
) -> Result<AbstractUnionViewInfo> {
    let mut output_columns = vec![UnionViewOutputColumn {
        name: "DocumentId".to_string(),
        ty: RelationalScalarType::int64(),
        source_path: None,
    }];

    for part in identity {
        let Some(ty) = part.column.ty else {
            return Err(crate::err!("identity column '{}' has no type", part.column.name));
        };
        output_columns.push(UnionViewOutputColumn {
            name: part.column.name.clone(),
            ty,
            source_path: part.column.source_path.clone(),
        });
    }

    output_columns.push(UnionViewOutputColumn {
        name: DISCRIMINATOR.to_string(),
        ty: RelationalScalarType::string(DISCRIMINATOR_MAX_LENGTH),
        source_path: None,
    });

    let mut arms = vec![];

    for (index, member) in members.iter().enumerate() {
        let discriminator = member.resource.to_string();
        if discriminator.chars().count() > DISCRIMINATOR_MAX_LENGTH as usize {
            return Err(Error::invalid_schema(format!(
                "Discriminator value '{discriminator}' exceeds max length {DISCRIMINATOR_MAX_LENGTH} \
                 for resource '{}'",
                member.resource
            )));
        }

        let mut projections = vec![UnionViewProjection::Column("DocumentId".to_string())];
        projections.extend(
            identity
                .iter()
                .map(|part| UnionViewProjection::Column(part.member_columns[index].clone())),
        );
        projections.push(UnionViewProjection::Literal(discriminator));

        arms.push(UnionViewArm {
            concrete_resource: member.resource.clone(),
            from_table: member.root.table.clone(),
            projections,
        });
    }

    Ok(AbstractUnionViewInfo {
        abstract_resource: abstract_resource.clone(),
        view,
        output_columns,
        arms,
    })
}
