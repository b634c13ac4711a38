use serde_json::{Map, Value};

/// Deep-merge `overlay` on top of `base`.
/// If both sides have an object for the same key, recurse.
/// Otherwise, `overlay`'s value wins. Key order follows `base`, with keys
/// new in `overlay` appended.
pub fn deep_merge(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    for (key, overlay_val) in overlay {
        let Value::Object(overlay_obj) = overlay_val else {
            base.insert(key, overlay_val);
            continue;
        };
        if let Some(Value::Object(base_obj)) = base.get_mut(&key) {
            let taken = std::mem::take(base_obj);
            *base_obj = deep_merge(taken, overlay_obj);
            continue;
        }
        base.insert(key, Value::Object(overlay_obj));
    }
    base
}

/// Replace `existing` with `incoming`, except that every key in `preserve`
/// keeps its value from `existing`.
pub fn replace_preserving(
    existing: Option<&Map<String, Value>>,
    mut incoming: Map<String, Value>,
    preserve: &[String],
) -> Map<String, Value> {
    let Some(existing) = existing else {
        return incoming;
    };
    for key in preserve {
        if let Some(kept) = existing.get(key) {
            incoming.insert(key.clone(), kept.clone());
        }
    }
    incoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn disjoint_keys_merge() {
        let merged = deep_merge(obj(json!({"locale": "en"})), obj(json!({"theme": "dark"})));
        assert_eq!(Value::Object(merged), json!({"locale": "en", "theme": "dark"}));
    }

    #[test]
    fn same_scalar_key_overlay_wins() {
        let merged = deep_merge(obj(json!({"ftp": 240})), obj(json!({"ftp": 250})));
        assert_eq!(merged["ftp"], 250);
    }

    #[test]
    fn nested_objects_recurse() {
        let base = obj(json!({"athlete": {"birthday": "1989-08-14", "weight": 70}}));
        let overlay = obj(json!({"athlete": {"weight": 68}}));
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["athlete"]["birthday"], "1989-08-14");
        assert_eq!(merged["athlete"]["weight"], 68);
    }

    #[test]
    fn overlay_scalar_replaces_object() {
        let merged = deep_merge(obj(json!({"zwift": {"level": 3}})), obj(json!({"zwift": null})));
        assert_eq!(merged["zwift"], Value::Null);
    }

    #[test]
    fn arrays_are_replaced_not_concatenated() {
        let merged = deep_merge(obj(json!({"order": ["a", "b"]})), obj(json!({"order": ["c"]})));
        assert_eq!(merged["order"], json!(["c"]));
    }

    #[test]
    fn empty_overlay_returns_base() {
        let base = obj(json!({"a": 1}));
        assert_eq!(deep_merge(base.clone(), Map::new()), base);
    }

    #[test]
    fn replace_drops_keys_missing_from_incoming() {
        let existing = obj(json!({"locale": "en", "theme": "dark"}));
        let out = replace_preserving(Some(&existing), obj(json!({"locale": "fr"})), &[]);
        assert_eq!(Value::Object(out), json!({"locale": "fr"}));
    }

    #[test]
    fn replace_keeps_preserved_keys_from_existing() {
        let existing = obj(json!({"locale": "en", "dashboard": {"layout": [1, 2]}}));
        let incoming = obj(json!({"locale": "fr", "dashboard": {"layout": []}}));
        let out = replace_preserving(Some(&existing), incoming, &["dashboard".to_string()]);
        assert_eq!(out["locale"], "fr");
        assert_eq!(out["dashboard"], json!({"layout": [1, 2]}));
    }

    #[test]
    fn replace_without_existing_is_incoming() {
        let incoming = obj(json!({"a": 1}));
        assert_eq!(
            replace_preserving(None, incoming.clone(), &["a".to_string()]),
            incoming
        );
    }
}
