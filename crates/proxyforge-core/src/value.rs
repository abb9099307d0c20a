//! Deep merge, key subtraction, and canonical ordering for JSON trees.
//!
//! Merge semantics are scoped to the shapes this domain produces:
//!
//! - Objects: deep-merge by key
//! - Arrays and scalars: opaque leaves, replaced wholesale (last wins when
//!   overwriting is enabled)
//!
//! The merge walks the tree with an explicit frame stack rather than call
//! recursion: fragment nesting depth is supplied by remote configs and must
//! not be limited by the call stack.

use serde_json::{Map, Value};

use crate::excluded::ExcludedDomains;

/// A detached object being merged, remembering where to reattach in its
/// parent once all of its own collisions are resolved.
struct MergeFrame {
    map: Map<String, Value>,
    parent: Option<(usize, String)>,
}

/// Deep-merges `source` into `target` and returns the combined tree.
///
/// For every key in `source`: absent keys are inserted; object/object
/// collisions merge structurally; any other collision keeps `target`'s value
/// unless `overwrite` is set. Merging `Null` in either position yields the
/// other operand unchanged. Total; never fails on well-typed input.
pub fn merge_into(target: Value, source: Value, overwrite: bool) -> Value {
    let (dst, src) = match (target, source) {
        (target, Value::Null) => return target,
        (Value::Null, source) => return source,
        (Value::Object(dst), Value::Object(src)) => (dst, src),
        (target, source) => return if overwrite { source } else { target },
    };

    let mut frames = vec![MergeFrame {
        map: dst,
        parent: None,
    }];
    let mut work = vec![(0usize, src)];

    while let Some((idx, src_map)) = work.pop() {
        for (key, src_value) in src_map {
            match (frames[idx].map.remove(&key), src_value) {
                // Object/object collision: detach the target child and queue
                // the pair instead of recursing.
                (Some(Value::Object(dst_child)), Value::Object(src_child)) => {
                    let child = frames.len();
                    frames.push(MergeFrame {
                        map: dst_child,
                        parent: Some((idx, key)),
                    });
                    work.push((child, src_child));
                }
                (Some(existing), src_value) => {
                    let kept = if overwrite { src_value } else { existing };
                    frames[idx].map.insert(key, kept);
                }
                (None, src_value) => {
                    frames[idx].map.insert(key, src_value);
                }
            }
        }
    }

    // Children always sit above their parent on the stack, so popping
    // reattaches deepest subtrees first.
    let mut root = Map::new();
    while let Some(frame) = frames.pop() {
        match frame.parent {
            Some((parent, key)) => {
                frames[parent].map.insert(key, Value::Object(frame.map));
            }
            None => root = frame.map,
        }
    }
    Value::Object(root)
}

/// Merges fragments in precedence order (first is base, last wins at scalar
/// leaves; object leaves merge structurally regardless of position).
pub fn merge_all(fragments: Vec<Value>) -> Value {
    fragments
        .into_iter()
        .fold(Value::Null, |acc, fragment| merge_into(acc, fragment, true))
}

/// Removes every key named in `excluded` from every object node, at every
/// depth, in place.
///
/// Recursion only descends into object values that survive the removal.
/// Arrays are opaque: their elements are not walked even if they contain
/// objects.
pub fn subtract_keys(tree: &mut Value, excluded: &ExcludedDomains) {
    let mut work: Vec<&mut Value> = vec![tree];
    while let Some(node) = work.pop() {
        if let Value::Object(map) = node {
            map.retain(|key, _| !excluded.contains(key));
            work.extend(map.values_mut().filter(|child| child.is_object()));
        }
    }
}

/// Canonically reorders a tree for stable serialization.
///
/// Object keys are sorted by descending length, then ascending
/// lexicographically, so more specific domain rules precede catch-all
/// patterns in the output. Array element order is preserved; elements are
/// sorted recursively. Scalars pass through unchanged.
pub fn sort_tree(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| {
                b.chars()
                    .count()
                    .cmp(&a.chars().count())
                    .then_with(|| a.cmp(b))
            });
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_tree(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_tree).collect()),
        scalar => scalar,
    }
}
