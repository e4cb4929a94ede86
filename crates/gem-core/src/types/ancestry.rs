//! Ancestry walk over the type arena

use super::descriptor::TypeId;
use super::registry::TypeRegistry;
use rustc_hash::FxHashSet;

impl TypeRegistry {
    /// Check if `ancestor` is `ty` or reachable from it
    ///
    /// Declared parents are searched first. A type without parents follows
    /// its native chain link; a chain that ends without a match succeeds
    /// only when `ancestor` is the universal base `root`.
    pub fn is_same_or_ancestor(&self, ty: TypeId, ancestor: TypeId, root: TypeId) -> bool {
        let mut stack = vec![ty];
        let mut visited = FxHashSet::default();

        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            let desc = match self.get(current) {
                Some(desc) => desc,
                None => continue,
            };

            if !desc.parents().is_empty() {
                // Reverse so the first parent is searched first
                stack.extend(desc.parents().iter().rev().copied());
            } else if let Some(native) = desc.native_parent() {
                stack.push(native);
            } else if ancestor == root {
                return true;
            }
        }

        false
    }
}
