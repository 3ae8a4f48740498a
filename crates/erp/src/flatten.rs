use serde_json::{Map, Value};

/// Flattens nested objects into dotted keys (`{"customer":{"name":"A"}}` becomes
/// `{"customer.name":"A"}`). Arrays are kept as arrays with each element flattened.
/// Empty nested objects are kept as-is under their key.
pub fn flatten(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            flatten_into(&mut out, None, map);
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(flatten).collect()),
        other => other.clone(),
    }
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(out, Some(&path), nested),
            Value::Array(_) => {
                out.insert(path, flatten(value));
            }
            _ => {
                out.insert(path, value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::flatten;

    #[test]
    fn nested_objects_become_dotted_keys() {
        let flat = flatten(&json!({
            "number": "SI-001",
            "customer": { "name": "Budi", "category": { "name": "Retail" } },
            "currency": { "name": "IDR" }
        }));

        assert_eq!(
            flat,
            json!({
                "number": "SI-001",
                "customer.name": "Budi",
                "customer.category.name": "Retail",
                "currency.name": "IDR"
            })
        );
    }

    #[test]
    fn array_elements_are_flattened_independently() {
        let flat = flatten(&json!({
            "results": [
                { "line_items": [ { "product": { "code": "P-1" }, "quantity": 2 } ] }
            ]
        }));

        assert_eq!(flat["results"][0]["line_items"][0]["product.code"], "P-1");
        assert_eq!(flat["results"][0]["line_items"][0]["quantity"], 2);
    }

    #[test]
    fn nulls_and_empty_objects_are_preserved() {
        let flat = flatten(&json!({ "customer": null, "meta": {} }));
        assert_eq!(flat, json!({ "customer": null, "meta": {} }));
    }
}
