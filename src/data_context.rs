use serde_json::Value;

/// Run-time data that dynamic block attributes are resolved against.
#[derive(Debug, Clone, Default)]
pub struct DataContext {
    root: Value,
}

impl DataContext {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Looks up a dotted path (`a.b.0.c`). Numeric segments index into arrays.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        path.split('.').try_fold(&self.root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Missing keys, `null`, `false`, `0`, `""` and empty collections are falsy.
    pub fn is_truthy(&self, path: &str) -> bool {
        match self.lookup(path) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
        }
    }
}

impl From<Value> for DataContext {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_walks_objects_and_arrays() {
        let data = DataContext::new(json!({
            "title": "Report",
            "layers": [{"name": "roads"}, {"name": "rivers"}],
        }));
        assert_eq!(data.lookup("title"), Some(&json!("Report")));
        assert_eq!(data.lookup("layers.1.name"), Some(&json!("rivers")));
        assert_eq!(data.lookup("layers.7.name"), None);
        assert_eq!(data.lookup("title.length"), None);
        assert_eq!(data.lookup(""), None);
    }

    #[test]
    fn truthiness_follows_json_emptiness() {
        let data = DataContext::new(json!({
            "yes": true,
            "zero": 0,
            "blank": "",
            "list": [1],
            "nothing": null,
        }));
        assert!(data.is_truthy("yes"));
        assert!(data.is_truthy("list"));
        assert!(!data.is_truthy("zero"));
        assert!(!data.is_truthy("blank"));
        assert!(!data.is_truthy("nothing"));
        assert!(!data.is_truthy("missing"));
    }
}
