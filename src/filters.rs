// permx/src/filters.rs
use crate::menu::{MenuAction, MenuNode};
use crate::utils::rbac::PermissionCheck;

/// Action implied by a child key's naming convention. Case-sensitive substring match,
/// first rule wins.
pub fn infer_action(key: &str) -> MenuAction {
    const RULES: &[(&[&str], MenuAction)] = &[
        (&["add-", "Add"], MenuAction::Add),
        (&["edit-", "Edit"], MenuAction::Edit),
        (&["delete-", "Delete"], MenuAction::Delete),
        (&["view-", "View", "Profile"], MenuAction::View),
        (&["all-", "All"], MenuAction::List),
    ];

    RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| key.contains(needle)))
        .map_or(MenuAction::Menu, |(_, action)| *action)
}

fn child_action(child: &MenuNode, key: &str) -> MenuAction {
    child.required_action.unwrap_or_else(|| infer_action(key))
}

/// Prune `tree` to what `checker` allows.
///
/// Headings always survive. A keyed node needs `can_access(key)`; a keyed node with
/// children additionally needs at least one surviving child. Children are checked
/// under their declared or inferred action. The input is never modified.
pub fn filter_menu<P>(tree: &[MenuNode], checker: &P) -> Vec<MenuNode>
where
    P: PermissionCheck + ?Sized,
{
    tree.iter()
        .filter_map(|node| filter_node(node, checker))
        .collect()
}

fn filter_node<P>(node: &MenuNode, checker: &P) -> Option<MenuNode>
where
    P: PermissionCheck + ?Sized,
{
    if node.is_heading() {
        return Some(node.clone());
    }

    let has_main_permission = match node.key.as_deref() {
        Some(key) => checker.can_access(key),
        None => true,
    };
    if !has_main_permission {
        return None;
    }

    let children = match node.children.as_deref() {
        Some(children) => children,
        None => return Some(node.clone()),
    };

    let visible = filter_children(children, checker);
    if visible.is_empty() && node.key.is_some() {
        return None;
    }

    Some(MenuNode {
        children: Some(visible),
        ..node.clone_without_children()
    })
}

fn filter_children<P>(children: &[MenuNode], checker: &P) -> Vec<MenuNode>
where
    P: PermissionCheck + ?Sized,
{
    children
        .iter()
        .filter_map(|child| {
            let allowed = match child.key.as_deref() {
                Some(key) => checker.has_permission(key, child_action(child, key)),
                None => true,
            };
            if !allowed {
                return None;
            }
            match child.children.as_deref() {
                Some(grandchildren) => Some(MenuNode {
                    children: Some(filter_children(grandchildren, checker)),
                    ..child.clone_without_children()
                }),
                None => Some(child.clone()),
            }
        })
        .collect()
}

impl MenuNode {
    fn clone_without_children(&self) -> MenuNode {
        MenuNode {
            title: self.title.clone(),
            key: self.key.clone(),
            path: self.path.clone(),
            heading: self.heading.clone(),
            disabled: self.disabled,
            icon: self.icon.clone(),
            required_action: self.required_action,
            children: None,
        }
    }
}
