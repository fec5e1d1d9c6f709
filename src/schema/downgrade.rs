//! Rewrites JSON Schema 2020-12 (OpenAPI 3.1) into the OpenAPI 3.0 dialect.
//!
//! The rewrite operates on the serialized form so it can run before the
//! schema is parsed into the 3.0 document model. Only keywords that appear
//! in schema position are touched; literal values (`enum`, `default`,
//! `example`) pass through unchanged.

use serde_json::{Map, Value};

/// Keywords with no OpenAPI 3.0 counterpart.
const DROPPED: &[&str] = &[
    "$schema",
    "$id",
    "$comment",
    "contentEncoding",
    "contentMediaType",
    "prefixItems",
];

/// Keywords whose value is a single subschema.
const SINGLE: &[&str] = &["items", "not", "additionalProperties"];

/// Keywords whose value is a list of subschemas.
const LISTS: &[&str] = &["oneOf", "anyOf", "allOf"];

/// Rewrites `schema` in place.
pub fn to_openapi_30(schema: &mut Value) {
    let Value::Object(map) = schema else {
        return;
    };
    for key in DROPPED {
        map.remove(*key);
    }
    nullable_type(map);
    nullable_composition(map);
    single_example(map);
    const_to_enum(map);
    exclusive_bound(map, "exclusiveMinimum", "minimum");
    exclusive_bound(map, "exclusiveMaximum", "maximum");

    if let Some(Value::Object(properties)) = map.get_mut("properties") {
        for property in properties.values_mut() {
            to_openapi_30(property);
        }
    }
    for key in SINGLE {
        if let Some(child) = map.get_mut(*key) {
            to_openapi_30(child);
        }
    }
    for key in LISTS {
        if let Some(Value::Array(children)) = map.get_mut(*key) {
            for child in children {
                to_openapi_30(child);
            }
        }
    }
}

/// `type: [T, "null"]` becomes `type: T, nullable: true`.
fn nullable_type(map: &mut Map<String, Value>) {
    let Some(Value::Array(types)) = map.get("type") else {
        return;
    };
    let nullable = types.iter().any(|t| t == "null");
    let mut rest: Vec<Value> = types.iter().filter(|t| *t != "null").cloned().collect();
    match rest.len() {
        0 => {
            map.remove("type");
        }
        1 => {
            if let Some(single) = rest.pop() {
                map.insert("type".to_string(), single);
            }
        }
        _ => {
            map.remove("type");
            let branches = rest
                .into_iter()
                .map(|t| {
                    let mut branch = Map::new();
                    branch.insert("type".to_string(), t);
                    Value::Object(branch)
                })
                .collect();
            map.insert("anyOf".to_string(), Value::Array(branches));
        }
    }
    if nullable {
        map.insert("nullable".to_string(), Value::Bool(true));
    }
}

/// A `{"type": "null"}` branch in `oneOf`/`anyOf` becomes `nullable: true`.
fn nullable_composition(map: &mut Map<String, Value>) {
    for key in ["oneOf", "anyOf"] {
        let Some(Value::Array(branches)) = map.get_mut(key) else {
            continue;
        };
        let before = branches.len();
        branches.retain(|branch| !is_null_schema(branch));
        if branches.len() == before {
            continue;
        }
        map.insert("nullable".to_string(), Value::Bool(true));

        let Some(Value::Array(branches)) = map.get_mut(key) else {
            continue;
        };
        if branches.len() != 1 {
            continue;
        }
        let Some(only) = branches.pop() else {
            continue;
        };
        map.remove(key);
        match only {
            // A 3.0 reference cannot carry siblings, so wrap it.
            Value::Object(inner) if inner.contains_key("$ref") => {
                map.insert("allOf".to_string(), Value::Array(vec![Value::Object(inner)]));
            }
            Value::Object(inner) => {
                for (k, v) in inner {
                    map.entry(k).or_insert(v);
                }
            }
            other => {
                map.insert(key.to_string(), Value::Array(vec![other]));
            }
        }
    }
}

fn is_null_schema(schema: &Value) -> bool {
    schema.get("type").is_some_and(|t| t == "null")
}

/// `examples: [a, ...]` becomes `example: a`.
fn single_example(map: &mut Map<String, Value>) {
    if let Some(Value::Array(examples)) = map.remove("examples") {
        if let Some(first) = examples.into_iter().next() {
            map.entry("example").or_insert(first);
        }
    }
}

/// `const: v` becomes `enum: [v]`.
fn const_to_enum(map: &mut Map<String, Value>) {
    if let Some(value) = map.remove("const") {
        map.insert("enum".to_string(), Value::Array(vec![value]));
    }
}

/// Numeric `exclusiveMinimum: n` becomes `minimum: n, exclusiveMinimum: true`.
fn exclusive_bound(map: &mut Map<String, Value>, exclusive: &str, inclusive: &str) {
    if let Some(bound) = map.get(exclusive).filter(|v| v.is_number()).cloned() {
        map.insert(inclusive.to_string(), bound);
        map.insert(exclusive.to_string(), Value::Bool(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn downgrade(mut value: Value) -> Value {
        to_openapi_30(&mut value);
        value
    }

    #[test]
    fn type_arrays_become_nullable() {
        assert_eq!(
            downgrade(json!({"type": ["string", "null"], "format": "date-time"})),
            json!({"type": "string", "format": "date-time", "nullable": true})
        );
        assert_eq!(
            downgrade(json!({"type": ["integer"]})),
            json!({"type": "integer"})
        );
    }

    #[test]
    fn null_branch_around_reference_wraps_in_all_of() {
        assert_eq!(
            downgrade(json!({"oneOf": [{"type": "null"}, {"$ref": "#/components/schemas/Pet"}]})),
            json!({"allOf": [{"$ref": "#/components/schemas/Pet"}], "nullable": true})
        );
    }

    #[test]
    fn null_branch_around_inline_schema_merges() {
        assert_eq!(
            downgrade(json!({"anyOf": [{"type": "integer"}, {"type": "null"}], "description": "age"})),
            json!({"type": "integer", "nullable": true, "description": "age"})
        );
    }

    #[test]
    fn multiple_branches_keep_composition() {
        let value = downgrade(json!({"oneOf": [{"type": "integer"}, {"type": "string"}, {"type": "null"}]}));
        assert_eq!(value["oneOf"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["nullable"], json!(true));
    }

    #[test]
    fn keywords_rewritten_recursively() {
        let value = downgrade(json!({
            "type": "object",
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "properties": {
                "type": {"type": ["string", "null"], "examples": ["dog", "cat"]},
                "kind": {"const": "pet"},
                "weight": {"type": "number", "exclusiveMinimum": 0},
                "tags": {"type": "array", "items": {"type": ["string", "null"]}},
                "blob": {"type": "string", "contentMediaType": "image/png"}
            }
        }));
        assert!(value.get("$schema").is_none());
        assert_eq!(value["properties"]["type"]["nullable"], json!(true));
        assert_eq!(value["properties"]["type"]["example"], json!("dog"));
        assert_eq!(value["properties"]["kind"]["enum"], json!(["pet"]));
        assert_eq!(value["properties"]["weight"]["minimum"], json!(0));
        assert_eq!(value["properties"]["weight"]["exclusiveMinimum"], json!(true));
        assert_eq!(value["properties"]["tags"]["items"]["type"], json!("string"));
        assert!(value["properties"]["blob"].get("contentMediaType").is_none());
    }

    #[test]
    fn literal_values_untouched() {
        let value = downgrade(json!({"type": "string", "enum": ["null", "x"], "default": {"const": 1}}));
        assert_eq!(value["enum"], json!(["null", "x"]));
        assert_eq!(value["default"], json!({"const": 1}));
    }
}
