use super::{
    db::{RelationalScalarType, ScalarKind},
    input::DecimalInfo,
    JsonPath,
};
use crate::{Error, Result};

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Maps a JSON schema leaf to its relational type.
pub(crate) fn resolve(
    schema: &Map<String, Value>,
    path: &JsonPath,
    decimal_infos: &BTreeMap<JsonPath, DecimalInfo>,
) -> Result<RelationalScalarType> {
    let ty = match schema.get("type") {
        Some(Value::String(ty)) => ty.as_str(),
        _ => {
            return Err(Error::invalid_schema(format!(
                "Schema type is required at {path}"
            )))
        }
    };

    match ty {
        "string" => match schema.get("format").and_then(Value::as_str) {
            Some("date") => Ok(RelationalScalarType::new(ScalarKind::Date)),
            Some("date-time") => Ok(RelationalScalarType::new(ScalarKind::DateTime)),
            Some("time") => Ok(RelationalScalarType::new(ScalarKind::Time)),
            _ => match schema.get("maxLength").and_then(Value::as_u64) {
                Some(max) if max > 0 => {
                    let max = u32::try_from(max).map_err(|_| {
                        Error::invalid_schema(format!("String schema maxLength is too large at {path}"))
                    })?;
                    Ok(RelationalScalarType::string(max))
                }
                _ => Err(Error::invalid_schema(format!(
                    "String schema maxLength is required at {path}"
                ))),
            },
        },
        "integer" => match schema.get("format").and_then(Value::as_str) {
            Some("int64") => Ok(RelationalScalarType::int64()),
            _ => Ok(RelationalScalarType::int32()),
        },
        "number" => {
            let Some(info) = decimal_infos.get(path) else {
                return Err(Error::invalid_schema(format!(
                    "Decimal property validation info is required for number at {path}"
                )));
            };

            match (info.total_digits, info.decimal_places) {
                (Some(precision), Some(scale)) if precision > 0 && scale <= precision => {
                    Ok(RelationalScalarType::decimal(precision, scale))
                }
                (Some(precision), Some(scale)) if precision > 0 => Err(Error::invalid_schema(format!(
                    "Decimal decimalPlaces {scale} exceeds totalDigits {precision} at {path}"
                ))),
                _ => Err(Error::invalid_schema(format!(
                    "Decimal property validation info must declare totalDigits and decimalPlaces at {path}"
                ))),
            }
        }
        "boolean" => Ok(RelationalScalarType::boolean()),
        other => Err(Error::invalid_schema(format!(
            "Unsupported schema type '{other}' at {path}"
        ))),
    }
}
