//! Pure structural operations over sibling lists of layers.
//!
//! Every operation takes a `&[Layer]` (the document's root siblings or some
//! subtree's children) and returns a rebuilt `Vec<Layer>`. Nothing mutates in
//! place and nothing fails: operating on an id that does not exist returns
//! the input unchanged. All operations are O(total nodes), which is fine for
//! interactively edited documents of a few hundred layers.

use std::collections::BTreeSet;

use crate::{id::generate_layer_id, layer::Layer};

/// Depth-first pre-order search; first match wins.
pub fn find_by_id<'a>(layers: &'a [Layer], id: &str) -> Option<&'a Layer> {
    for layer in layers {
        if layer.id() == id {
            return Some(layer);
        }
        if let Some(children) = layer.children() {
            if let Some(found) = find_by_id(children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// The direct parent whose children list contains `child_id`.
pub fn find_parent<'a>(layers: &'a [Layer], child_id: &str) -> Option<&'a Layer> {
    for layer in layers {
        if let Some(children) = layer.children() {
            if children.iter().any(|c| c.id() == child_id) {
                return Some(layer);
            }
            if let Some(found) = find_parent(children, child_id) {
                return Some(found);
            }
        }
    }
    None
}

/// Rebuild the tree applying `mutator` to the layer with `id`.
///
/// Recursion continues into children after a match, so a mutator that edits
/// descendants as well must opt into that explicitly.
pub fn update_in_tree(layers: &[Layer], id: &str, mutator: &dyn Fn(&mut Layer)) -> Vec<Layer> {
    layers
        .iter()
        .map(|layer| {
            let mut out = layer.clone();
            if out.id() == id {
                mutator(&mut out);
            }
            if let Some(children) = out.children() {
                let rebuilt = update_in_tree(children, id, mutator);
                out.base_mut().children = Some(rebuilt);
            }
            out
        })
        .collect()
}

/// Delete the first structural occurrence of `id` from whichever sibling
/// list contains it, recursing into the children of surviving siblings.
pub fn remove_from_tree(layers: &[Layer], id: &str) -> Vec<Layer> {
    layers
        .iter()
        .filter(|layer| layer.id() != id)
        .map(|layer| {
            let mut out = layer.clone();
            if let Some(children) = out.children() {
                let rebuilt = remove_from_tree(children, id);
                out.base_mut().children = Some(rebuilt);
            }
            out
        })
        .collect()
}

/// Insert `layer` under `parent_id` (or at the root when absent) at the
/// clamped index. An unknown parent id leaves the tree unchanged.
pub fn insert_in_tree(
    layers: &[Layer],
    layer: Layer,
    parent_id: Option<&str>,
    index: Option<usize>,
) -> Vec<Layer> {
    let Some(parent_id) = parent_id else {
        let mut out = layers.to_vec();
        let idx = index.unwrap_or(out.len()).min(out.len());
        out.insert(idx, layer);
        return out;
    };

    insert_under_parent(layers, layer, parent_id, index)
}

fn insert_under_parent(
    layers: &[Layer],
    layer: Layer,
    parent_id: &str,
    index: Option<usize>,
) -> Vec<Layer> {
    layers
        .iter()
        .map(|sibling| {
            let mut out = sibling.clone();
            if out.id() == parent_id {
                let mut children = out.base().children.clone().unwrap_or_default();
                let idx = index.unwrap_or(children.len()).min(children.len());
                children.insert(idx, layer.clone());
                out.base_mut().children = Some(children);
            } else if let Some(children) = out.children() {
                let rebuilt = insert_under_parent(children, layer.clone(), parent_id, index);
                out.base_mut().children = Some(rebuilt);
            }
            out
        })
        .collect()
}

/// Selection-aware insert policy: container-capable selections adopt the new
/// layer as their last child, anything else gets it as the next sibling. No
/// selection (or a stale one) appends at the root.
pub fn insert_into_selected(
    layers: &[Layer],
    selected_id: Option<&str>,
    layer: Layer,
) -> Vec<Layer> {
    let Some(selected) = selected_id.and_then(|id| find_by_id(layers, id)) else {
        let mut out = layers.to_vec();
        out.push(layer);
        return out;
    };

    if selected.is_container() {
        let id = selected.id().to_string();
        insert_in_tree(layers, layer, Some(&id), None)
    } else {
        insert_after_sibling(layers, layer, selected.id())
    }
}

fn insert_after_sibling(layers: &[Layer], layer: Layer, anchor_id: &str) -> Vec<Layer> {
    let mut out = Vec::with_capacity(layers.len() + 1);
    let mut inserted = false;
    for sibling in layers {
        let mut next = sibling.clone();
        if !inserted {
            if let Some(children) = next.children() {
                let rebuilt = insert_after_sibling(children, layer.clone(), anchor_id);
                if rebuilt.len() != children.len() {
                    inserted = true;
                }
                next.base_mut().children = Some(rebuilt);
            }
        }
        let is_anchor = next.id() == anchor_id;
        out.push(next);
        if is_anchor && !inserted {
            out.push(layer.clone());
            inserted = true;
        }
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MovePosition {
    Before,
    After,
    Into,
}

/// Detach `source_id` and reinsert it relative to `anchor_id`.
///
/// With no anchor, `Before` prepends to the root list and `After`/`Into`
/// append to it. Moving a layer relative to its own descendant would orphan
/// the subtree, so that case is a no-op.
pub fn move_layer(
    layers: &[Layer],
    source_id: &str,
    anchor_id: Option<&str>,
    position: MovePosition,
) -> Vec<Layer> {
    let Some(source) = find_by_id(layers, source_id) else {
        return layers.to_vec();
    };
    let source = source.clone();

    if let Some(anchor) = anchor_id {
        // Anchor inside the moved subtree: removing the source would take
        // the anchor with it.
        if find_by_id(std::slice::from_ref(&source), anchor).is_some() {
            return layers.to_vec();
        }
    }

    let without = remove_from_tree(layers, source_id);

    let Some(anchor) = anchor_id else {
        let mut out = without;
        match position {
            MovePosition::Before => out.insert(0, source),
            MovePosition::After | MovePosition::Into => out.push(source),
        }
        return out;
    };

    if find_by_id(&without, anchor).is_none() {
        return layers.to_vec();
    }

    match position {
        MovePosition::Before => insert_before_sibling(&without, source, anchor),
        MovePosition::After => insert_after_sibling(&without, source, anchor),
        MovePosition::Into => insert_in_tree(&without, source, Some(anchor), None),
    }
}

fn insert_before_sibling(layers: &[Layer], layer: Layer, anchor_id: &str) -> Vec<Layer> {
    let mut out = Vec::with_capacity(layers.len() + 1);
    let mut inserted = false;
    for sibling in layers {
        if !inserted && sibling.id() == anchor_id {
            out.push(layer.clone());
            inserted = true;
        }
        let mut next = sibling.clone();
        if !inserted {
            if let Some(children) = next.children() {
                let rebuilt = insert_before_sibling(children, layer.clone(), anchor_id);
                if rebuilt.len() != children.len() {
                    inserted = true;
                }
                next.base_mut().children = Some(rebuilt);
            }
        }
        out.push(next);
    }
    out
}

/// Deep copy with fresh ids for the layer and every descendant. All other
/// fields are copied verbatim.
pub fn clone_layer_deep(layer: &Layer) -> Layer {
    let mut out = layer.clone();
    out.base_mut().id = generate_layer_id();
    if let Some(children) = out.children() {
        let cloned = children.iter().map(clone_layer_deep).collect();
        out.base_mut().children = Some(cloned);
    }
    out
}

/// Pre-order flattening of the whole tree.
pub fn flatten_layers<'a>(layers: &'a [Layer]) -> Vec<&'a Layer> {
    let mut out = Vec::new();
    fn walk<'a>(layers: &'a [Layer], out: &mut Vec<&'a Layer>) {
        for layer in layers {
            out.push(layer);
            if let Some(children) = layer.children() {
                walk(children, out);
            }
        }
    }
    walk(layers, &mut out);
    out
}

/// Every id present anywhere in the tree.
pub fn all_ids(layers: &[Layer]) -> BTreeSet<String> {
    flatten_layers(layers)
        .iter()
        .map(|l| l.id().to_string())
        .collect()
}

/// `base` if unused tree-wide, else the lowest `"{base} {n}"` with n >= 1
/// not already taken.
pub fn get_next_layer_name(base: &str, existing: &[Layer]) -> String {
    let taken: BTreeSet<&str> = flatten_layers(existing).iter().map(|l| l.name()).collect();
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{base} {n}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        n += 1;
    }
}
