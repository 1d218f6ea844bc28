//! Transitive type hierarchy, computed per call from the engine's direct edges.

use std::collections::{HashSet, VecDeque};
use stratum_api::{ElementHandle, EngineProject, TypeHierarchy};

/// Every supertype, nearest first. The implicit root type is always present,
/// last, unless `ty` is the root itself.
pub fn all_supertypes(project: &dyn EngineProject, ty: &ElementHandle) -> Vec<ElementHandle> {
    let root = project.implicit_root_type();
    let mut supertypes = walk(ty, |t| project.direct_supertypes(t));
    if ty.id != root.id {
        if let Some(pos) = supertypes.iter().position(|s| s.id == root.id) {
            supertypes.remove(pos);
        }
        supertypes.push(root);
    }
    supertypes
}

/// Every project subtype, nearest first.
pub fn all_subtypes(project: &dyn EngineProject, ty: &ElementHandle) -> Vec<ElementHandle> {
    walk(ty, |t| project.direct_subtypes(t))
}

pub fn type_hierarchy(project: &dyn EngineProject, ty: &ElementHandle) -> TypeHierarchy {
    TypeHierarchy {
        focus: ty.clone(),
        supertypes: all_supertypes(project, ty),
        subtypes: all_subtypes(project, ty),
    }
}

/// Breadth-first closure over `next`, each id once, `start` excluded.
fn walk(
    start: &ElementHandle,
    next: impl Fn(&ElementHandle) -> Vec<ElementHandle>,
) -> Vec<ElementHandle> {
    let mut seen = HashSet::from([start.id.clone()]);
    let mut queue = VecDeque::from([start.clone()]);
    let mut out = Vec::new();
    while let Some(current) = queue.pop_front() {
        for found in next(&current) {
            if seen.insert(found.id.clone()) {
                out.push(found.clone());
                queue.push_back(found);
            }
        }
    }
    out
}
