//! Two-level category tree rules.
//!
//! Categories form a tree at most two levels deep: a root may have children,
//! a child may not. Placement is checked before any write, using the ancestor
//! chain of the proposed parent loaded by the caller.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::CategoryId;
use crate::validation::ValidationErrors;

/// Maximum number of levels in the category tree (root → child).
pub const MAX_CATEGORY_DEPTH: usize = 2;

/// The facts needed to decide whether a category may sit under a parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPlacement {
    /// The category being saved; `None` when it is new.
    pub category: Option<CategoryId>,
    /// The proposed parent followed by its ancestors, nearest first.
    /// Empty for a root category.
    pub parent_chain: Vec<CategoryId>,
    /// Whether the category being saved already has children.
    pub has_children: bool,
}

impl CategoryPlacement {
    /// Level the category would occupy (1 for a root).
    #[must_use]
    pub fn level(&self) -> usize {
        self.parent_chain.len() + 1
    }

    /// Check the placement.
    ///
    /// # Errors
    ///
    /// Returns a `parent` field error when the category would be its own
    /// ancestor, when it would sit deeper than [`MAX_CATEGORY_DEPTH`], or when
    /// moving it would push its children past that depth.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        if let Some(id) = self.category
            && self.parent_chain.contains(&id)
        {
            return Err(ValidationErrors::single(
                "parent",
                "a category cannot be its own ancestor",
            ));
        }

        if self.level() > MAX_CATEGORY_DEPTH {
            return Err(ValidationErrors::single(
                "parent",
                format!("categories can be nested at most {MAX_CATEGORY_DEPTH} levels deep"),
            ));
        }

        if self.has_children && self.level() + 1 > MAX_CATEGORY_DEPTH {
            return Err(ValidationErrors::single(
                "parent",
                "a category with subcategories cannot be moved under another category",
            ));
        }

        Ok(())
    }
}

/// Anything with a category identity that can be arranged into a tree.
pub trait TreeItem {
    fn tree_id(&self) -> CategoryId;
    fn tree_parent(&self) -> Option<CategoryId>;
}

/// A node of the hierarchical category listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<TreeNode<T>>,
}

/// Arrange a flat list into a forest, preserving input order among siblings.
///
/// Items whose parent is missing from the input are treated as roots.
#[must_use]
pub fn build_tree<T: TreeItem>(items: Vec<T>) -> Vec<TreeNode<T>> {
    let present: std::collections::HashSet<CategoryId> =
        items.iter().map(TreeItem::tree_id).collect();

    let mut children_of: HashMap<CategoryId, Vec<T>> = HashMap::new();
    let mut roots = Vec::new();
    for item in items {
        match item.tree_parent() {
            Some(parent) if present.contains(&parent) => {
                children_of.entry(parent).or_default().push(item);
            }
            _ => roots.push(item),
        }
    }

    roots
        .into_iter()
        .map(|item| attach(item, &mut children_of))
        .collect()
}

fn attach<T: TreeItem>(item: T, children_of: &mut HashMap<CategoryId, Vec<T>>) -> TreeNode<T> {
    let children = children_of
        .remove(&item.tree_id())
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach(child, children_of))
        .collect();
    TreeNode { item, children }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: i32) -> CategoryId {
        CategoryId::new(n)
    }

    #[test]
    fn test_root_accepted() {
        let placement = CategoryPlacement::default();
        assert_eq!(placement.level(), 1);
        assert!(placement.check().is_ok());
    }

    #[test]
    fn test_child_accepted() {
        let placement = CategoryPlacement {
            category: None,
            parent_chain: vec![id(1)],
            has_children: false,
        };
        assert!(placement.check().is_ok());
    }

    #[test]
    fn test_grandchild_rejected() {
        let placement = CategoryPlacement {
            category: None,
            parent_chain: vec![id(2), id(1)],
            has_children: false,
        };
        let errors = placement.check().unwrap_err();
        assert!(errors.contains("parent"));
    }

    #[test]
    fn test_self_parent_rejected() {
        let placement = CategoryPlacement {
            category: Some(id(3)),
            parent_chain: vec![id(3)],
            has_children: false,
        };
        assert!(placement.check().is_err());
    }

    #[test]
    fn test_moving_root_with_children_under_parent_rejected() {
        let placement = CategoryPlacement {
            category: Some(id(5)),
            parent_chain: vec![id(1)],
            has_children: true,
        };
        assert!(placement.check().is_err());

        let stays_root = CategoryPlacement {
            category: Some(id(5)),
            parent_chain: vec![],
            has_children: true,
        };
        assert!(stays_root.check().is_ok());
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Cat {
        id: CategoryId,
        parent: Option<CategoryId>,
        name: &'static str,
    }

    impl TreeItem for Cat {
        fn tree_id(&self) -> CategoryId {
            self.id
        }
        fn tree_parent(&self) -> Option<CategoryId> {
            self.parent
        }
    }

    #[test]
    fn test_build_tree_nests_children_in_order() {
        let flat = vec![
            Cat { id: id(1), parent: None, name: "Apparel" },
            Cat { id: id(2), parent: Some(id(1)), name: "Shirts" },
            Cat { id: id(3), parent: None, name: "Home" },
            Cat { id: id(4), parent: Some(id(1)), name: "Hats" },
        ];
        let tree = build_tree(flat);
        assert_eq!(tree.len(), 2);
        let apparel = &tree[0];
        assert_eq!(apparel.item.name, "Apparel");
        let names: Vec<_> = apparel.children.iter().map(|c| c.item.name).collect();
        assert_eq!(names, vec!["Shirts", "Hats"]);
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn test_orphans_become_roots() {
        let flat = vec![Cat { id: id(9), parent: Some(id(99)), name: "Orphan" }];
        let tree = build_tree(flat);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_tree_node_serializes_flat() {
        let tree = build_tree(vec![Cat { id: id(1), parent: None, name: "A" }]);
        let json = serde_json::to_value(&tree[0]).unwrap();
        assert_eq!(json["name"], "A");
        assert_eq!(json["children"], serde_json::json!([]));
    }
}
