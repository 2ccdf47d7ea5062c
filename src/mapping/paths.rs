use serde_json::{Map, Value};

/// Reads the value at a dot-separated path. Numeric segments index arrays.
pub fn get_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Writes `new` at a dot-separated path, creating intermediate objects (or
/// arrays, when the next segment is numeric) as needed. Existing scalars in
/// the way are replaced.
pub fn set_path(value: &mut Value, path: &str, new: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    set_segments(value, &segments, new);
}

fn set_segments(value: &mut Value, segments: &[&str], new: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *value = new;
        return;
    };

    if let (Value::Array(items), Ok(index)) = (&mut *value, head.parse::<usize>()) {
        while items.len() <= index {
            items.push(Value::Null);
        }
        set_segments(&mut items[index], rest, new);
        return;
    }

    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    if let Value::Object(map) = value {
        let slot = map.entry(head.to_string()).or_insert_with(|| {
            match rest.first().map(|s| s.parse::<usize>().is_ok()) {
                Some(true) => Value::Array(Vec::new()),
                _ => Value::Null,
            }
        });
        set_segments(slot, rest, new);
    }
}
