//! Canonical JSON encoding

use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// Serialize a key to canonical JSON: compact, with object keys sorted at every depth
pub fn canonical_json<K: Serialize + ?Sized>(key: &K) -> Result<String> {
    let value = serde_json::to_value(key)?;
    let mut out = String::new();
    write_value(&value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(name)?);
                out.push(':');
                write_value(item, out)?;
            }
            out.push('}');
        }
        // Scalars have a single JSON rendering
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects_are_sorted() {
        let value = json!({
            "z": {"b": 2, "a": 1},
            "a": [{"y": true, "x": null}],
        });

        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"a":[{"x":null,"y":true}],"z":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn test_array_order_is_preserved() {
        assert_eq!(canonical_json(&vec![3, 1, 2]).unwrap(), "[3,1,2]");
    }

    #[test]
    fn test_strings_are_escaped() {
        assert_eq!(canonical_json(&"a\"b").unwrap(), r#""a\"b""#);
    }

    #[test]
    fn test_unit_and_option() {
        assert_eq!(canonical_json(&()).unwrap(), "null");
        assert_eq!(canonical_json(&Some(1.5)).unwrap(), "1.5");
    }
}
