//! Collapses columns that equality constraints declare equal onto one stored
//! column per table.

use crate::{
    schema::{
        constraint_naming,
        db::{
            AppliedEqualityConstraint, ColumnBinding, ColumnKind, ColumnStorage, DbColumnModel,
            DbTableModel, IgnoredEqualityConstraint, KeyUnificationClass,
            KeyUnificationEqualityConstraintDiagnostics, RedundantEqualityConstraint,
            RelationalResourceModel, RelationalScalarType, TableConstraint,
        },
        hash::hash8,
        input::EqualityConstraintInput,
        name::column_base_name,
        JsonPath,
    },
    Error, Result,
};

use std::collections::{BTreeMap, BTreeSet};

const CANONICAL_NAME_SALT: &str = "key-unification-canonical-name:v1\n";
const PRESENCE_NAME_SALT: &str = "key-unification-presence-name:v1\n";

/// Where an equality endpoint binds.
#[derive(Debug, Clone)]
struct Endpoint {
    table: usize,
    column: String,
}

/// An endpoint pair that will be unified once classes are known.
struct Pending {
    a_path: JsonPath,
    b_path: JsonPath,
    table: usize,
    a_column: String,
    b_column: String,
}

/// Disjoint sets over column names of one table.
#[derive(Default)]
struct UnionFind {
    parent: BTreeMap<String, String>,
}

impl UnionFind {
    fn find(&mut self, column: &str) -> String {
        let parent = self
            .parent
            .entry(column.to_string())
            .or_insert_with(|| column.to_string())
            .clone();

        if parent == column {
            return parent;
        }

        let root = self.find(&parent);
        self.parent.insert(column.to_string(), root.clone());
        root
    }

    fn union(&mut self, a: &str, b: &str) {
        let a = self.find(a);
        let b = self.find(b);
        if a != b {
            let (low, high) = if a < b { (a, b) } else { (b, a) };
            self.parent.insert(high, low);
        }
    }

    fn classes(mut self) -> Vec<Vec<String>> {
        let columns: Vec<String> = self.parent.keys().cloned().collect();
        let mut classes: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for column in columns {
            let root = self.find(&column);
            classes.entry(root).or_default().push(column);
        }
        classes.into_values().filter(|class| class.len() > 1).collect()
    }
}

pub(super) fn apply(
    model: &mut RelationalResourceModel,
    constraints: &[EqualityConstraintInput],
) -> Result<()> {
    let mut diagnostics = KeyUnificationEqualityConstraintDiagnostics::default();
    let mut seen = BTreeSet::new();
    let mut pending = vec![];
    let mut sets: BTreeMap<usize, UnionFind> = BTreeMap::new();

    for constraint in constraints {
        let a_path = &constraint.source_json_path;
        let b_path = &constraint.target_json_path;

        let key = if a_path <= b_path {
            (a_path.clone(), b_path.clone())
        } else {
            (b_path.clone(), a_path.clone())
        };
        if !seen.insert(key) {
            continue;
        }

        let a = bind_endpoint(model, a_path)?;
        let b = bind_endpoint(model, b_path)?;

        if a.table != b.table {
            diagnostics.ignore(IgnoredEqualityConstraint {
                endpoint_a_path: a_path.clone(),
                endpoint_b_path: b_path.clone(),
                reason: "cross_table".to_string(),
                endpoint_a_binding: column_binding(model, &a),
                endpoint_b_binding: column_binding(model, &b),
            });
            continue;
        }

        if a.column == b.column {
            diagnostics.redundant.push(RedundantEqualityConstraint {
                endpoint_a_path: a_path.clone(),
                endpoint_b_path: b_path.clone(),
                binding: column_binding(model, &a),
            });
            continue;
        }

        sets.entry(a.table).or_default().union(&a.column, &b.column);
        pending.push(Pending {
            a_path: a_path.clone(),
            b_path: b_path.clone(),
            table: a.table,
            a_column: a.column,
            b_column: b.column,
        });
    }

    // Member column name to canonical column name, per table
    let mut canonical_of: BTreeMap<(usize, String), String> = BTreeMap::new();

    for (index, set) in sets {
        for class in set.classes() {
            let canonical = unify_class(model, index, class.clone())?;
            for member in class {
                canonical_of.insert((index, member), canonical.clone());
            }
        }
    }

    for entry in pending {
        let canonical_column = canonical_of
            .get(&(entry.table, entry.a_column.clone()))
            .cloned()
            .ok_or_else(|| crate::err!("column '{}' was not unified", entry.a_column))?;

        diagnostics.applied.push(AppliedEqualityConstraint {
            endpoint_a_path: entry.a_path,
            endpoint_b_path: entry.b_path,
            table: model.tables[entry.table].table.clone(),
            endpoint_a_column: entry.a_column,
            endpoint_b_column: entry.b_column,
            canonical_column,
        });
    }

    if !diagnostics.is_empty() {
        log::debug!(
            "resource {}: key unification applied={} redundant={} ignored={}",
            model.resource,
            diagnostics.applied.len(),
            diagnostics.redundant.len(),
            diagnostics.ignored.len()
        );
    }

    model.key_unification_equality_constraints = diagnostics;
    Ok(())
}

fn bind_endpoint(model: &RelationalResourceModel, path: &JsonPath) -> Result<Endpoint> {
    for (table, model_table) in model.tables.iter().enumerate() {
        if let Some(column) = model_table.column_by_source_path(path) {
            return Ok(Endpoint {
                table,
                column: column.name.clone(),
            });
        }
    }

    Err(Error::invalid_schema(format!(
        "Equality constraint endpoint '{path}' on resource '{}' does not bind to any column",
        model.resource
    )))
}

fn column_binding(model: &RelationalResourceModel, endpoint: &Endpoint) -> ColumnBinding {
    ColumnBinding {
        table: model.tables[endpoint.table].table.clone(),
        column: endpoint.column.clone(),
    }
}

/// Adds the canonical column for `members` and turns each member into an
/// alias of it. Returns the canonical column name.
fn unify_class(
    model: &mut RelationalResourceModel,
    index: usize,
    members: Vec<String>,
) -> Result<String> {
    let resource = model.resource.clone();

    // Reference object path of every identity-part column on this table
    let reference_parts: BTreeMap<String, (JsonPath, String)> = model
        .document_reference_bindings
        .iter()
        .filter(|binding| binding.table == model.tables[index].table)
        .flat_map(|binding| {
            binding.identity_bindings.iter().map(move |identity| {
                (
                    identity.column.clone(),
                    (
                        binding.reference_object_path.clone(),
                        binding.fk_column.clone(),
                    ),
                )
            })
        })
        .collect();

    let table = &mut model.tables[index];

    let mut columns: Vec<DbColumnModel> = members
        .iter()
        .map(|name| {
            table.column(name).cloned().ok_or_else(|| {
                crate::err!("unified column '{name}' is missing from '{}'", table.table)
            })
        })
        .collect::<Result<_>>()?;
    columns.sort_by(|a, b| a.source_path.cmp(&b.source_path));

    let first = &columns[0];
    for other in &columns[1..] {
        if other.kind != first.kind
            || other.ty != first.ty
            || other.target_resource != first.target_resource
        {
            return Err(Error::invalid_schema(format!(
                "Key unification on table '{}' of resource '{resource}' joins incompatible \
                 columns '{}' and '{}'",
                table.table, first.name, other.name
            )));
        }
    }

    let first_path = first.source_path.clone().unwrap_or_default();
    let base = match reference_parts.get(&first.name) {
        Some((reference_object_path, _)) => column_base_name(reference_object_path, &first_path),
        None => column_base_name(&table.scope, &first_path),
    };
    let suffix = if first.kind == ColumnKind::DescriptorFk {
        "_DescriptorId"
    } else {
        ""
    };

    let paths: Vec<&str> = columns
        .iter()
        .filter_map(|column| column.source_path.as_ref().map(JsonPath::canonical))
        .collect();
    let canonical_name = free_name(
        table,
        format!("{base}_Unified{suffix}"),
        format!(
            "{base}_U{}{suffix}",
            hash8(&format!("{CANONICAL_NAME_SALT}{}", paths.join("\n")))
        ),
    )?;

    let canonical = DbColumnModel {
        name: canonical_name.clone(),
        kind: first.kind,
        ty: first.ty,
        nullable: columns.iter().all(|column| column.nullable),
        source_path: None,
        target_resource: first.target_resource.clone(),
        storage: ColumnStorage::Stored,
    };
    table.push_column(canonical);

    let mut member_columns = vec![];

    for column in &columns {
        let presence = match reference_parts.get(&column.name) {
            Some((_, fk_column)) => Some(fk_column.clone()),
            None if column.nullable => {
                let path = column
                    .source_path
                    .as_ref()
                    .map(JsonPath::canonical)
                    .unwrap_or_default();
                let presence = free_name(
                    table,
                    format!("{}_Present", column.name),
                    format!(
                        "{}_U{}_Present",
                        column.name,
                        hash8(&format!("{PRESENCE_NAME_SALT}{path}"))
                    ),
                )?;

                table.push_column(
                    DbColumnModel::new(&presence, ColumnKind::Scalar, RelationalScalarType::boolean())
                        .nullable(true),
                );
                let name = constraint_naming::null_or_true(&table.table, &presence);
                table.push_constraint(TableConstraint::NullOrTrue {
                    name,
                    column: presence.clone(),
                });
                Some(presence)
            }
            None => None,
        };

        if let Some(member) = table.column_mut(&column.name) {
            member.storage = ColumnStorage::UnifiedAlias {
                canonical_column: canonical_name.clone(),
                presence_column: presence,
            };
        }
        member_columns.push(column.name.clone());
    }

    table.key_unification_classes.push(KeyUnificationClass {
        canonical_column: canonical_name.clone(),
        member_columns,
    });

    Ok(canonical_name)
}

/// `preferred` unless the table already has it, then `fallback`.
fn free_name(table: &DbTableModel, preferred: String, fallback: String) -> Result<String> {
    if !table.has_column(&preferred) {
        return Ok(preferred);
    }
    if !table.has_column(&fallback) {
        return Ok(fallback);
    }
    Err(Error::invalid_schema(format!(
        "Cannot name unified column on table '{}': both '{preferred}' and '{fallback}' are taken",
        table.table
    )))
}
