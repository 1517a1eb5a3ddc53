//! Alpha-renaming for inlined bodies
//!
//! Renaming is syntactic: every spelling in the rename set is suffixed,
//! whatever scope it resolves to.

use crate::ast::{Ast, ExprContext, NodeKind, NodeRef};
use crate::config::RenameMode;
use std::collections::{BTreeSet, HashSet};

/// Names of `definition` that the inlined copy will rename
pub(crate) fn rename_set(ast: &Ast, definition: NodeRef, mode: RenameMode) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let NodeKind::FunctionDef { params, body, .. } = &ast[definition].kind else {
        return names;
    };

    for node in params.iter().chain(body).flat_map(|root| ast.preorder(*root)) {
        match &ast[node].kind {
            NodeKind::Param { name, .. }
            | NodeKind::FunctionDef { name, .. }
            | NodeKind::ClassDef { name, .. } => {
                names.insert(name.clone());
            }
            NodeKind::Name { id, ctx } => {
                if mode == RenameMode::All || *ctx != ExprContext::Load {
                    names.insert(id.clone());
                }
            }
            _ => {}
        }
    }
    names
}

/// First suffix, `base` then `base1`, `base2`, ..., under which no renamed
/// name collides with an identifier already in the tree
pub(crate) fn pick_suffix(base: &str, names: &BTreeSet<String>, taken: &HashSet<String>) -> String {
    let mut counter = 0usize;
    loop {
        let suffix = if counter == 0 {
            base.to_string()
        } else {
            format!("{}{}", base, counter)
        };
        if names.iter().all(|name| !taken.contains(&format!("{}{}", name, suffix))) {
            return suffix;
        }
        counter += 1;
    }
}

/// Append `suffix` to every name, parameter and definition in the subtree
/// whose spelling is in `names`
pub(crate) fn apply_suffix(ast: &mut Ast, root: NodeRef, names: &BTreeSet<String>, suffix: &str) {
    for node in ast.preorder(root) {
        match ast.kind_mut(node) {
            NodeKind::Name { id: name, .. }
            | NodeKind::Param { name, .. }
            | NodeKind::FunctionDef { name, .. }
            | NodeKind::ClassDef { name, .. } => {
                if names.contains(name.as_str()) {
                    name.push_str(suffix);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::python::parse;

    const SOURCE: &str = "def f(a):\n    t = a + g\n    def h(k):\n        return k\n    return h(t)\n";

    #[test]
    fn test_rename_set_modes() {
        let ast = parse(SOURCE).unwrap();
        let def = ast.body()[0];

        let all: Vec<_> = rename_set(&ast, def, RenameMode::All).into_iter().collect();
        assert_eq!(all, vec!["a", "g", "h", "k", "t"]);

        let locals: Vec<_> = rename_set(&ast, def, RenameMode::Locals).into_iter().collect();
        assert_eq!(locals, vec!["a", "h", "k", "t"]);
    }

    #[test]
    fn test_pick_suffix_avoids_collisions() {
        let names = BTreeSet::from(["x".to_string()]);
        let taken = HashSet::from(["x".to_string(), "x_new".to_string(), "x_new1".to_string()]);
        assert_eq!(pick_suffix("_new", &names, &taken), "_new2");
        assert_eq!(pick_suffix("_new", &names, &HashSet::new()), "_new");
    }

    #[test]
    fn test_apply_suffix() {
        let mut ast = parse(SOURCE).unwrap();
        let def = ast.body()[0];
        let names = rename_set(&ast, def, RenameMode::Locals);

        apply_suffix(&mut ast, def, &names, "_1");

        let ids = ast.identifiers();
        for renamed in ["a_1", "t_1", "h_1", "k_1"] {
            assert!(ids.contains(renamed), "missing {}", renamed);
        }
        assert!(ids.contains("g"));
        // The definition's own name is not in the set
        assert!(ids.contains("f"));
    }
}
