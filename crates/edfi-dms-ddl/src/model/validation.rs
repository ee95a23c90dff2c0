//! Model set well-formedness checks.
//!
//! These run before emission so that a caller contract violation surfaces as
//! a descriptive error instead of silently producing invalid SQL.

use super::{
    DbTableModel, DbTriggerInfo, DerivedRelationalModelSet, TableConstraint, TriggerKind,
};
use crate::dialect::SqlDialectKind;
use crate::error::{DdlError, Result};
use std::collections::HashSet;

/// Validate a derived relational model set.
pub fn validate_model_set(set: &DerivedRelationalModelSet) -> Result<()> {
    set.effective_schema.validate()?;

    let mut seen = HashSet::new();
    for table in set.all_tables() {
        if !seen.insert(&table.table) {
            return Err(DdlError::invalid_model(format!(
                "Table '{}' is defined more than once",
                table.table
            )));
        }
        validate_table(table)?;
    }

    for table in set.all_tables() {
        for constraint in table.foreign_keys() {
            if let TableConstraint::ForeignKey {
                name,
                target_table,
                target_columns,
                ..
            } = constraint
            {
                // Targets outside the set (the dms core tables) are not checked.
                if let Some(target) = set.find_table(target_table) {
                    for column in target_columns {
                        if target.column(column).is_none() {
                            return Err(DdlError::invalid_model(format!(
                                "Foreign key '{}' on '{}' references missing column '{}' on '{}'",
                                name, table.table, column, target_table
                            )));
                        }
                    }
                }
            }
        }
    }

    for view in &set.abstract_union_views_in_name_order {
        if view.union_arms_in_order.is_empty() {
            return Err(DdlError::invalid_model(format!(
                "Abstract union view '{}' has no union arms",
                view.view_name
            )));
        }
        for arm in &view.union_arms_in_order {
            if arm.projection_expressions.len() != view.output_columns.len() {
                return Err(DdlError::invalid_model(format!(
                    "Union arm from table '{}' has {} projection expressions but view '{}' expects {} output columns",
                    arm.from_table,
                    arm.projection_expressions.len(),
                    view.view_name,
                    view.output_columns.len()
                )));
            }
        }
    }

    for index in &set.indexes_in_create_order {
        if index.key_columns.is_empty() {
            return Err(DdlError::invalid_model(format!(
                "Index '{}' on '{}' has no key columns",
                index.name, index.table
            )));
        }
        if let Some(table) = set.find_table(&index.table) {
            for column in &index.key_columns {
                if table.column(column).is_none() {
                    return Err(DdlError::invalid_model(format!(
                        "Index '{}' references missing column '{}' on '{}'",
                        index.name, column, index.table
                    )));
                }
            }
        }
    }

    for trigger in &set.triggers_in_create_order {
        validate_trigger(trigger, set.dialect)?;
    }

    Ok(())
}

/// Validate a single table's key and constraints against its columns.
pub fn validate_table(table: &DbTableModel) -> Result<()> {
    if table.columns.is_empty() {
        return Err(DdlError::invalid_model(format!(
            "Table '{}' has no columns",
            table.table
        )));
    }

    let mut names = HashSet::new();
    for column in &table.columns {
        if !names.insert(&column.column_name) {
            return Err(DdlError::invalid_model(format!(
                "Column '{}' is defined more than once on '{}'",
                column.column_name, table.table
            )));
        }
    }

    for key_column in &table.key.columns {
        if table.column(&key_column.column_name).is_none() {
            return Err(DdlError::invalid_model(format!(
                "Primary key of '{}' references missing column '{}'",
                table.table, key_column.column_name
            )));
        }
    }

    for constraint in &table.constraints {
        for column in constraint.local_columns() {
            if table.column(column).is_none() {
                return Err(DdlError::invalid_model(format!(
                    "Constraint '{}' on '{}' references missing column '{}'",
                    constraint.name(),
                    table.table,
                    column
                )));
            }
        }

        match constraint {
            TableConstraint::ForeignKey {
                name,
                columns,
                target_columns,
                ..
            } => {
                if columns.is_empty() || columns.len() != target_columns.len() {
                    return Err(DdlError::invalid_model(format!(
                        "Foreign key '{}' on '{}' maps {} columns to {} target columns",
                        name,
                        table.table,
                        columns.len(),
                        target_columns.len()
                    )));
                }
            }
            TableConstraint::Unique { name, columns } if columns.is_empty() => {
                return Err(DdlError::invalid_model(format!(
                    "Unique constraint '{}' on '{}' has no columns",
                    name, table.table
                )));
            }
            TableConstraint::AllOrNoneNullability {
                name,
                dependent_columns,
                ..
            } if dependent_columns.is_empty() => {
                return Err(DdlError::invalid_model(format!(
                    "All-or-none constraint '{}' on '{}' has no dependent columns",
                    name, table.table
                )));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Validate trigger preconditions that do not depend on emission state.
pub fn validate_trigger(trigger: &DbTriggerInfo, dialect: SqlDialectKind) -> Result<()> {
    match &trigger.kind {
        TriggerKind::DocumentStamping | TriggerKind::IdentityPropagationFallback { .. }
            if trigger.key_columns.len() != 1 =>
        {
            Err(DdlError::invalid_model(format!(
                "{} trigger '{}' requires exactly one key column, but has {}",
                trigger.kind.label(),
                trigger.name,
                trigger.key_columns.len()
            )))
        }
        TriggerKind::ReferentialIdentityMaintenance {
            resource_name,
            identity_elements,
            superclass_alias,
            ..
        } => {
            if identity_elements.is_empty() {
                return Err(DdlError::invalid_model(format!(
                    "ReferentialIdentityMaintenance trigger '{}' requires at least one identity element for resource '{}'",
                    trigger.name, resource_name
                )));
            }
            if let Some(alias) = superclass_alias {
                if alias.identity_elements.is_empty() {
                    return Err(DdlError::invalid_model(format!(
                        "ReferentialIdentityMaintenance trigger '{}' requires at least one identity element for resource '{}'",
                        trigger.name, alias.resource_name
                    )));
                }
            }
            Ok(())
        }
        TriggerKind::IdentityPropagationFallback { .. } if dialect != SqlDialectKind::Mssql => {
            Err(DdlError::invalid_model(format!(
                "IdentityPropagationFallback trigger '{}' is only supported for mssql, but dialect is {}",
                trigger.name, dialect
            )))
        }
        TriggerKind::AbstractIdentityMaintenance {
            target_column_mappings,
            ..
        } if target_column_mappings.is_empty() => Err(DdlError::invalid_model(format!(
            "{} trigger '{}' has no column mappings",
            trigger.kind.label(),
            trigger.name
        ))),
        TriggerKind::IdentityPropagationFallback { referrer_updates } => {
            if referrer_updates.is_empty() {
                return Err(DdlError::invalid_model(format!(
                    "IdentityPropagationFallback trigger '{}' has no referrer targets",
                    trigger.name
                )));
            }
            for target in referrer_updates {
                if target.column_mappings.is_empty() {
                    return Err(DdlError::invalid_model(format!(
                        "IdentityPropagationFallback trigger '{}' has no column mappings for referrer '{}'",
                        trigger.name, target.referrer_table
                    )));
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
