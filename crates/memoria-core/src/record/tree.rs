//! Path operations on a JSON tree.
//!
//! The store's data model is one JSON tree where objects are nodes and a
//! `null` or empty object is the same as nothing at all.

use serde_json::{Map, Value};

use super::FieldPatch;

/// The value at `segments`, if present.
pub fn value_at<'a, I, S>(root: &'a Value, segments: I) -> Option<&'a Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut node = root;
    for segment in segments {
        node = node.as_object()?.get(segment.as_ref())?;
    }
    Some(node)
}

/// Replace the value at `segments`, creating intermediate objects.
///
/// Writing `null` or an empty object removes the node.
pub fn set_at<I, S>(root: &mut Value, segments: I, value: Value)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let segments: Vec<S> = segments.into_iter().collect();
    if is_vacant(&value) {
        remove_at(root, segments);
        return;
    }

    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.as_ref().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.as_ref().to_string(), value);
}

/// Merge `patch` into the object at `segments`, creating it if absent.
///
/// A merge that leaves the object empty removes it.
pub fn merge_at<I, S>(root: &mut Value, segments: I, patch: &FieldPatch)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let segments: Vec<S> = segments.into_iter().collect();

    let mut node = &mut *root;
    for segment in &segments {
        node = ensure_object(node)
            .entry(segment.as_ref().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    patch.apply_to(ensure_object(node));

    prune(root, &segments);
}

/// Remove the value at `segments`. Returns true if something was removed.
///
/// Parents left empty by the removal are removed too.
pub fn remove_at<I, S>(root: &mut Value, segments: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let segments: Vec<S> = segments.into_iter().collect();
    let Some((last, parents)) = segments.split_last() else {
        let existed = !root.is_null();
        *root = Value::Null;
        return existed;
    };

    let mut node = &mut *root;
    for segment in parents {
        match node.as_object_mut().and_then(|m| m.get_mut(segment.as_ref())) {
            Some(child) => node = child,
            None => return false,
        }
    }

    let removed = node
        .as_object_mut()
        .is_some_and(|m| m.remove(last.as_ref()).is_some());

    prune(root, parents);
    removed
}

/// Drop vacant nodes along `segments`, deepest first. The root is kept.
fn prune<S: AsRef<str>>(node: &mut Value, segments: &[S]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let Some(map) = node.as_object_mut() else {
        return;
    };
    if let Some(child) = map.get_mut(first.as_ref()) {
        prune(child, rest);
        if is_vacant(child) {
            map.remove(first.as_ref());
        }
    }
}

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_intermediate_nodes() {
        let mut root = Value::Null;
        set_at(&mut root, ["users", "u1", "ideas", "a"], json!({"text": "x"}));
        assert_eq!(
            root,
            json!({"users": {"u1": {"ideas": {"a": {"text": "x"}}}}})
        );
        assert_eq!(
            value_at(&root, ["users", "u1", "ideas", "a", "text"]),
            Some(&json!("x"))
        );
    }

    #[test]
    fn set_null_removes() {
        let mut root = json!({"a": {"b": 1, "c": 2}});
        set_at(&mut root, ["a", "b"], Value::Null);
        assert_eq!(root, json!({"a": {"c": 2}}));
    }

    #[test]
    fn set_at_root_replaces_everything() {
        let mut root = json!({"a": 1});
        set_at(&mut root, Vec::<&str>::new(), json!({"b": 2}));
        assert_eq!(root, json!({"b": 2}));
    }

    #[test]
    fn merge_leaves_other_fields() {
        let mut root = json!({"n": {"text": "x", "status": "pending"}});
        merge_at(&mut root, ["n"], &FieldPatch::new().set("status", "done"));
        assert_eq!(root, json!({"n": {"text": "x", "status": "done"}}));
    }

    #[test]
    fn merge_into_missing_creates() {
        let mut root = json!({});
        merge_at(&mut root, ["n"], &FieldPatch::new().set("status", "done"));
        assert_eq!(root, json!({"n": {"status": "done"}}));
    }

    #[test]
    fn removing_the_last_child_prunes_parents() {
        let mut root = json!({"users": {"u1": {"ideas": {"a": {"text": "x"}}}, "u2": {"n": 1}}});
        assert!(remove_at(&mut root, ["users", "u1", "ideas", "a"]));
        assert_eq!(root, json!({"users": {"u2": {"n": 1}}}));
        assert_eq!(value_at(&root, ["users", "u1", "ideas"]), None);
    }

    #[test]
    fn merge_that_empties_a_record_removes_it() {
        let mut root = json!({"ideas": {"a": {"text": "x"}, "b": {"text": "y"}}});
        merge_at(&mut root, ["ideas", "a"], &FieldPatch::new().remove("text"));
        assert_eq!(root, json!({"ideas": {"b": {"text": "y"}}}));
    }

    #[test]
    fn removing_nothing_into_missing_creates_nothing() {
        let mut root = json!({});
        merge_at(&mut root, ["ideas", "a"], &FieldPatch::new().remove("text"));
        assert_eq!(root, json!({}));
    }

    #[test]
    fn set_empty_object_removes() {
        let mut root = json!({"a": {"b": {"c": 1}}});
        set_at(&mut root, ["a", "b"], json!({}));
        assert_eq!(root, json!({}));
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut root = json!({"a": 1});
        assert!(!remove_at(&mut root, ["b", "c"]));
        assert!(remove_at(&mut root, ["a"]));
        assert_eq!(root, json!({}));
    }
}
