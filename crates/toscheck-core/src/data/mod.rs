//! Data types and the valuation of expressions against them.
//!
//! A property, attribute or input definition names a data type; a value
//! assigned to it (a `default`, or an assignment in a template) is either an
//! intrinsic function call, checked by the function's own evaluator, or a
//! plain value checked for shape against the core type it resolves to and
//! then against every constraint along the type's hierarchy.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_yaml::{Sequence, Value};
use std::sync::OnceLock;
use tracing::debug;

pub mod constraints;
pub mod functions;
pub mod scalar;

pub use functions::Function;
pub use scalar::ScalarKind;

use crate::catalog::Catalog;
use crate::checker::common;
use crate::checker::CheckContext;
use crate::construct::{Construct, Facet};
use crate::value::{describe, entries, get_seq, get_str};

const VERSION_PATTERN: &str = r"^\d+\.\d+(\.\d+(\.[A-Za-z0-9_]+(-\d+)?)?)?$";

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dt%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Bound accepted as the upper end of a range.
pub const UNBOUNDED: &str = "UNBOUNDED";

/// The built-in data types every catalog knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreType {
    String,
    Integer,
    Float,
    Boolean,
    Null,
    Timestamp,
    Version,
    Range,
    List,
    Map,
    ScalarUnitSize,
    ScalarUnitTime,
    ScalarUnitFrequency,
}

impl CoreType {
    pub const ALL: [CoreType; 13] = [
        CoreType::String,
        CoreType::Integer,
        CoreType::Float,
        CoreType::Boolean,
        CoreType::Null,
        CoreType::Timestamp,
        CoreType::Version,
        CoreType::Range,
        CoreType::List,
        CoreType::Map,
        CoreType::ScalarUnitSize,
        CoreType::ScalarUnitTime,
        CoreType::ScalarUnitFrequency,
    ];

    /// The type name used in documents.
    pub fn name(self) -> &'static str {
        match self {
            CoreType::String => "string",
            CoreType::Integer => "integer",
            CoreType::Float => "float",
            CoreType::Boolean => "boolean",
            CoreType::Null => "null",
            CoreType::Timestamp => "timestamp",
            CoreType::Version => "version",
            CoreType::Range => "range",
            CoreType::List => "list",
            CoreType::Map => "map",
            CoreType::ScalarUnitSize => "scalar-unit.size",
            CoreType::ScalarUnitTime => "scalar-unit.time",
            CoreType::ScalarUnitFrequency => "scalar-unit.frequency",
        }
    }

    pub fn by_name(name: &str) -> Option<CoreType> {
        CoreType::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Returns true for `list` and `map`, whose entries follow an `entry_schema`.
    pub fn is_collection(self) -> bool {
        matches!(self, CoreType::List | CoreType::Map)
    }

    pub fn scalar_kind(self) -> Option<ScalarKind> {
        match self {
            CoreType::ScalarUnitSize => Some(ScalarKind::Size),
            CoreType::ScalarUnitTime => Some(ScalarKind::Time),
            CoreType::ScalarUnitFrequency => Some(ScalarKind::Frequency),
            _ => None,
        }
    }

    /// Checks the shape of a plain value. Collection entries are not looked at.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            CoreType::String => value.is_string(),
            CoreType::Integer => value.is_i64() || value.is_u64(),
            CoreType::Float => value.is_number(),
            CoreType::Boolean => value.is_bool(),
            CoreType::Null => value.is_null(),
            CoreType::Timestamp => value.as_str().is_some_and(is_timestamp),
            CoreType::Version => version_text(value).is_some_and(|v| is_version(&v)),
            CoreType::Range => is_range(value),
            CoreType::List => value.is_sequence(),
            CoreType::Map => value.is_mapping(),
            CoreType::ScalarUnitSize | CoreType::ScalarUnitTime | CoreType::ScalarUnitFrequency => self
                .scalar_kind()
                .is_some_and(|kind| scalar::parse(kind, value).is_some()),
        }
    }
}

fn version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(VERSION_PATTERN).ok()).as_ref()
}

/// Versions are often written unquoted, so `1.0` arrives as a float.
pub(crate) fn version_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_f64() => Some(n.to_string()),
        _ => None,
    }
}

fn is_version(text: &str) -> bool {
    version_pattern().is_some_and(|re| re.is_match(text))
}

fn is_timestamp(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %z").is_ok()
        || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || TIMESTAMP_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(text, format).is_ok())
}

fn is_range(value: &Value) -> bool {
    let Some([lower, upper]) = value.as_sequence().map(Vec::as_slice) else {
        return false;
    };
    let Some(lower) = lower.as_i64() else {
        return false;
    };
    match upper {
        Value::String(s) => s == UNBOUNDED,
        _ => upper.as_i64().is_some_and(|upper| lower <= upper),
    }
}

/// Returns the `required` flag of a property definition (true when absent).
pub fn is_required(definition: &Value) -> bool {
    definition.get("required").and_then(Value::as_bool).unwrap_or(true)
}

/// Checks that a definition names a known data type, and that `list`/`map`
/// definitions name a known entry type.
pub fn check_data_type(definition: &Value, ctx: &mut CheckContext, catalog: &Catalog) -> bool {
    if !common::check_type(Construct::Data, definition, ctx, catalog) {
        return false;
    }

    let Some(type_name) = get_str(definition, "type") else {
        return false;
    };
    if type_name != CoreType::List.name() && type_name != CoreType::Map.name() {
        return true;
    }

    // a missing entry_schema leaves the entries unconstrained
    let Some(entry_schema) = definition.get("entry_schema") else {
        return true;
    };
    match get_str(entry_schema, "type") {
        Some(entry_type) if catalog.has_type(Construct::Data, entry_type) => true,
        _ => {
            ctx.add_error(format!("Unknown entry_schema type: {}", describe(entry_schema)));
            false
        }
    }
}

/// How a data type name resolves for valuation purposes.
enum Shape<'c> {
    /// Derives from a core type; carries the constraints and entry schema
    /// declared along the way.
    Core {
        core: CoreType,
        constraints: Vec<&'c Sequence>,
        entry_schema: Option<&'c Value>,
    },
    /// A user data type made of properties.
    Complex,
    Unknown,
}

fn resolve<'c>(type_name: &'c str, catalog: &'c Catalog) -> Shape<'c> {
    if let Some(core) = CoreType::by_name(type_name) {
        return Shape::Core {
            core,
            constraints: Vec::new(),
            entry_schema: None,
        };
    }
    if !catalog.has_type(Construct::Data, type_name) {
        return Shape::Unknown;
    }

    let mut constraints = Vec::new();
    let mut entry_schema = None;
    for (name, def) in catalog.hierarchy(Construct::Data, type_name) {
        if let Some(core) = CoreType::by_name(name) {
            return Shape::Core {
                core,
                constraints,
                entry_schema,
            };
        }
        if let Some(seq) = get_seq(def, "constraints") {
            constraints.push(seq);
        }
        if entry_schema.is_none() {
            entry_schema = def.get("entry_schema");
        }
    }
    Shape::Complex
}

/// Checks an expression assigned to something defined by `definition`.
///
/// Returns false if any problem was recorded.
pub fn check_data_valuation(
    expr: &Value,
    definition: &Value,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) -> bool {
    if let Some((function, args)) = Function::recognize(expr) {
        return function.evaluate(args, definition, ctx, catalog);
    }
    if expr.is_null() {
        return true;
    }

    let Some(type_name) = get_str(definition, "type") else {
        debug!(path = %ctx.path(), "No type to evaluate {} against", describe(expr));
        return true;
    };

    match resolve(type_name, catalog) {
        Shape::Core {
            core,
            constraints,
            entry_schema,
        } => {
            if !evaluate_core(core, type_name, expr, definition, entry_schema, ctx, catalog) {
                return false;
            }
            let mut ok = true;
            if let Some(local) = get_seq(definition, "constraints") {
                ok &= constraints::evaluate(expr, local, core, ctx);
            }
            for inherited in constraints {
                ok &= constraints::evaluate(expr, inherited, core, ctx);
            }
            ok
        }
        Shape::Complex => evaluate_complex(type_name, expr, ctx, catalog),
        Shape::Unknown => {
            debug!(type_name, "No evaluator available");
            true
        }
    }
}

fn evaluate_core(
    core: CoreType,
    type_name: &str,
    expr: &Value,
    definition: &Value,
    inherited_schema: Option<&Value>,
    ctx: &mut CheckContext,
    catalog: &Catalog,
) -> bool {
    if !core.accepts(expr) {
        ctx.add_error(format!("Value {} is not a valid {}", describe(expr), type_name));
        return false;
    }
    if !core.is_collection() {
        return true;
    }

    let Some(schema) = definition.get("entry_schema").or(inherited_schema) else {
        return true;
    };
    let mut ok = true;
    match expr {
        Value::Sequence(items) => {
            for item in items {
                ok &= check_data_valuation(item, schema, ctx, catalog);
            }
        }
        Value::Mapping(map) => {
            for (_, item) in map {
                ok &= check_data_valuation(item, schema, ctx, catalog);
            }
        }
        _ => {}
    }
    ok
}

fn evaluate_complex(type_name: &str, expr: &Value, ctx: &mut CheckContext, catalog: &Catalog) -> bool {
    let Some(map) = expr.as_mapping() else {
        ctx.add_error(format!(
            "Value {} is not a valid {}: expected a map of property values",
            describe(expr),
            type_name
        ));
        return false;
    };

    let mut ok = true;
    for (name, value) in entries(map) {
        match catalog.get_facet_definition(Construct::Data, type_name, Facet::Properties, name) {
            Some(property) => ok &= check_data_valuation(value, &property, ctx, catalog),
            None => {
                ctx.add_error(format!("Unknown property '{}' for data type {}", name, type_name));
                ok = false;
            }
        }
    }

    let missing: Vec<&str> = catalog
        .facets(Construct::Data, Facet::Properties, type_name)
        .filter(|(name, def)| is_required(def) && def.get("default").is_none() && !map.contains_key(*name))
        .map(|(name, _)| name)
        .collect();
    if !missing.is_empty() {
        ctx.add_error(format!(
            "Data type {} missing required values for: [{}]",
            type_name,
            missing.join(", ")
        ));
        ok = false;
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_core_type_names() {
        for core in CoreType::ALL {
            assert_eq!(CoreType::by_name(core.name()), Some(core));
        }
        assert_eq!(CoreType::by_name("tosca.datatypes.Root"), None);
    }

    #[test]
    fn test_accepts() {
        assert!(CoreType::Integer.accepts(&yaml("42")));
        assert!(!CoreType::Integer.accepts(&yaml("4.2")));
        assert!(CoreType::Float.accepts(&yaml("4")));
        assert!(CoreType::String.accepts(&yaml("'80'")));
        assert!(!CoreType::String.accepts(&yaml("80")));
        assert!(CoreType::Boolean.accepts(&yaml("true")));
        assert!(CoreType::Version.accepts(&yaml("1.0")));
        assert!(CoreType::Version.accepts(&yaml("'2.1.3.beta-4'")));
        assert!(!CoreType::Version.accepts(&yaml("2")));
        assert!(CoreType::Timestamp.accepts(&yaml("'2024-03-01T10:00:00Z'")));
        assert!(CoreType::Timestamp.accepts(&yaml("'2024-03-01'")));
        assert!(!CoreType::Timestamp.accepts(&yaml("yesterday")));
        assert!(CoreType::Range.accepts(&yaml("[1, 4]")));
        assert!(CoreType::Range.accepts(&yaml("[0, UNBOUNDED]")));
        assert!(!CoreType::Range.accepts(&yaml("[4, 1]")));
        assert!(CoreType::ScalarUnitSize.accepts(&yaml("4 GB")));
        assert!(!CoreType::ScalarUnitSize.accepts(&yaml("4 GHz")));
    }
}
