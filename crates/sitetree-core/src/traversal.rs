// ABOUTME: Pure functions that locate, splice, and patch nodes of a page tree by absolute path
// ABOUTME: Nodes are addressed by index trails so lookups never hold parent back-references

use sitetree_logging::warn;
use sitetree_types::{PageNode, PageStatus, RelatedTask, User};
use std::collections::HashMap;

use crate::error::{Result, TreeError};
use crate::path;

/// Child indices leading from the root to a node
pub type IndexTrail = Vec<usize>;

/// Locate the node whose absolute path equals `absolute_path`.
///
/// The path is matched segment by segment against the children's names,
/// building the prefix incrementally. When sibling names are duplicated the
/// first match in pre-order wins. `""` and `"/"` resolve to the root.
pub fn find_node<'a>(root: &'a PageNode, absolute_path: &str) -> Result<&'a PageNode> {
    let trail = first_match(root, absolute_path)
        .ok_or_else(|| TreeError::not_found(format!("page '{}'", shown(absolute_path))))?;
    Ok(node_at(root, &trail))
}

/// Mutable variant of [`find_node`]
pub fn find_node_mut<'a>(root: &'a mut PageNode, absolute_path: &str) -> Result<&'a mut PageNode> {
    let trail = first_match(root, absolute_path)
        .ok_or_else(|| TreeError::not_found(format!("page '{}'", shown(absolute_path))))?;
    Ok(node_at_mut(root, &trail))
}

/// Whether any node has this absolute path
pub fn contains(root: &PageNode, absolute_path: &str) -> bool {
    first_match(root, absolute_path).is_some()
}

/// Index trail of the first node (pre-order) whose path equals `absolute_path`
pub fn first_match(root: &PageNode, absolute_path: &str) -> Option<IndexTrail> {
    let segments: Vec<&str> = path::segments(absolute_path).collect();
    let mut trail = IndexTrail::new();
    descend_first(root, "", &segments, &mut trail).then_some(trail)
}

/// Index trails of every node whose path equals `absolute_path`, in pre-order.
///
/// More than one entry means sibling names are duplicated somewhere on the path.
pub fn all_matches(root: &PageNode, absolute_path: &str) -> Vec<IndexTrail> {
    let segments: Vec<&str> = path::segments(absolute_path).collect();
    let mut found = Vec::new();
    let mut trail = IndexTrail::new();
    descend_all(root, &segments, &mut trail, &mut found);
    found
}

fn descend_first(node: &PageNode, prefix: &str, remaining: &[&str], trail: &mut IndexTrail) -> bool {
    let Some((segment, rest)) = remaining.split_first() else {
        return true;
    };
    let wanted = path::join(prefix, segment);
    for (index, child) in node.children.iter().enumerate() {
        if path::join(prefix, &child.name) != wanted {
            continue;
        }
        trail.push(index);
        if descend_first(child, &wanted, rest, trail) {
            return true;
        }
        trail.pop();
    }
    false
}

fn descend_all(node: &PageNode, remaining: &[&str], trail: &mut IndexTrail, found: &mut Vec<IndexTrail>) {
    let Some((segment, rest)) = remaining.split_first() else {
        found.push(trail.clone());
        return;
    };
    for (index, child) in node.children.iter().enumerate() {
        if child.name == *segment {
            trail.push(index);
            descend_all(child, rest, trail, found);
            trail.pop();
        }
    }
}

fn node_at<'a>(root: &'a PageNode, trail: &[usize]) -> &'a PageNode {
    trail.iter().fold(root, |node, &index| &node.children[index])
}

fn node_at_mut<'a>(root: &'a mut PageNode, trail: &[usize]) -> &'a mut PageNode {
    let mut node = root;
    for &index in trail {
        node = &mut node.children[index];
    }
    node
}

fn shown(absolute_path: &str) -> &str {
    if path::segments(absolute_path).next().is_none() {
        "/"
    } else {
        absolute_path
    }
}

/// Append `new_node` to the children of the node at `parent_path`.
///
/// Returns the absolute path of the inserted node. A missing parent is
/// `NotFound` (never an insert at the root). If several nodes share
/// `parent_path` the first one in pre-order receives the child and a
/// data-integrity warning is logged. A sibling with the same name is
/// refused rather than duplicated.
pub fn insert_node(root: &mut PageNode, parent_path: &str, new_node: PageNode) -> Result<String> {
    let parent_path = path::normalize_path(parent_path);

    if !path::is_valid_segment(&new_node.name) {
        return Err(TreeError::invalid(format!(
            "'{}' is not a valid page name",
            new_node.name
        )));
    }

    let candidates = all_matches(root, &parent_path);
    let Some(target) = candidates.first() else {
        return Err(TreeError::not_found(format!(
            "parent page '{}'",
            shown(&parent_path)
        )));
    };

    if candidates.len() > 1 {
        warn!(
            parent_path = %shown(&parent_path),
            candidates = candidates.len(),
            "Ambiguous insert target, using first match"
        );
    }

    let new_path = path::join(&parent_path, &new_node.name);
    let parent = node_at_mut(root, target);
    if parent.child(&new_node.name).is_some() {
        warn!(path = %new_path, "Refusing to insert duplicate sibling");
        return Err(TreeError::data_integrity(format!(
            "a page named '{}' already exists under '{}'",
            new_node.name,
            shown(&parent_path)
        )));
    }

    parent.children.push(new_node);
    Ok(new_path)
}

/// Detach the node at `absolute_path` and return it. The root cannot be removed.
pub fn remove_node(root: &mut PageNode, absolute_path: &str) -> Result<PageNode> {
    let mut trail = first_match(root, absolute_path)
        .ok_or_else(|| TreeError::not_found(format!("page '{}'", shown(absolute_path))))?;
    let Some(index) = trail.pop() else {
        return Err(TreeError::invalid("the project root cannot be removed"));
    };
    let parent = node_at_mut(root, &trail);
    Ok(parent.children.remove(index))
}

/// Visit every node in pre-order with its absolute path and depth
pub fn walk<'a, F>(root: &'a PageNode, visit: &mut F)
where
    F: FnMut(&str, &'a PageNode, usize),
{
    fn step<'a, F>(node: &'a PageNode, absolute_path: &str, depth: usize, visit: &mut F)
    where
        F: FnMut(&str, &'a PageNode, usize),
    {
        visit(absolute_path, node, depth);
        for child in &node.children {
            step(child, &path::join(absolute_path, &child.name), depth + 1, visit);
        }
    }

    step(root, "", 0, visit);
}

/// All absolute paths in pre-order, the root (`""`) first
pub fn node_paths(root: &PageNode) -> Vec<String> {
    let mut paths = Vec::with_capacity(root.subtree_len());
    walk(root, &mut |absolute_path, _, _| paths.push(absolute_path.to_string()));
    paths
}

/// Children in render order: by display name, case-insensitive
pub fn sorted_children(node: &PageNode) -> Vec<&PageNode> {
    let mut children: Vec<&PageNode> = node.children.iter().collect();
    children.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    children
}

/// Absolute paths that occur more than once, in order of first occurrence
pub fn duplicate_paths(root: &PageNode) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();
    walk(root, &mut |absolute_path, _, _| {
        let count = counts.entry(absolute_path.to_string()).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(absolute_path.to_string());
        }
    });
    order
}

/// Replace the owner of a page, returning the previous one
pub fn set_owner(root: &mut PageNode, absolute_path: &str, owner: Option<User>) -> Result<Option<User>> {
    let node = find_node_mut(root, absolute_path)?;
    Ok(std::mem::replace(&mut node.owner, owner))
}

/// Replace the reviewers of a page, returning the previous list.
///
/// Reviewers are deduplicated by identity, keeping the first occurrence.
pub fn set_reviewers(root: &mut PageNode, absolute_path: &str, reviewers: Vec<User>) -> Result<Vec<User>> {
    let node = find_node_mut(root, absolute_path)?;
    Ok(std::mem::replace(&mut node.reviewers, dedup_users(reviewers)))
}

/// Record a tracking ticket on a page; tasks are only ever appended
pub fn append_related_task(root: &mut PageNode, absolute_path: &str, task: RelatedTask) -> Result<()> {
    let node = find_node_mut(root, absolute_path)?;
    node.related_tasks.push(task);
    Ok(())
}

/// Change the publication status of a page, returning the previous one
pub fn set_status(root: &mut PageNode, absolute_path: &str, status: PageStatus) -> Result<PageStatus> {
    let node = find_node_mut(root, absolute_path)?;
    Ok(std::mem::replace(&mut node.status, status))
}

/// Drop later users whose identity repeats an earlier one
pub fn dedup_users(users: Vec<User>) -> Vec<User> {
    let mut unique: Vec<User> = Vec::with_capacity(users.len());
    for user in users {
        if !unique.iter().any(|existing| existing.same_identity(&user)) {
            unique.push(user);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_mock::{expect, subscriber};

    fn sample_tree() -> PageNode {
        PageNode::root()
            .with_child(
                PageNode::new("blog")
                    .with_id(2)
                    .with_title("Blog")
                    .with_child(PageNode::new("post-1").with_id(3).with_title("Post One"))
                    .with_child(PageNode::new("Archive").with_id(4)),
            )
            .with_child(PageNode::new("about").with_id(5).with_title("About us"))
            .with_child(PageNode::new("careers").with_id(6))
    }

    #[test]
    fn test_find_node_round_trips_every_path() {
        let root = sample_tree();
        let mut checked = 0;
        walk(&root, &mut |absolute_path, node, _| {
            let found = find_node(&root, absolute_path).unwrap();
            assert!(std::ptr::eq(found, node), "mismatch at {absolute_path}");
            checked += 1;
        });
        assert_eq!(checked, root.subtree_len());
    }

    #[test]
    fn test_find_node_root_and_missing() {
        let root = sample_tree();
        assert!(find_node(&root, "").unwrap().is_root());
        assert!(find_node(&root, "/").unwrap().is_root());

        // deeper than the tree
        let error = find_node(&root, "/blog/post-1/comments/42").unwrap_err();
        assert!(matches!(error, TreeError::NotFound { .. }));

        // segment match must be exact
        assert!(find_node(&root, "/blo").is_err());
        assert!(find_node(&root, "/archive").is_err());
    }

    #[test]
    fn test_find_node_backtracks_over_duplicate_siblings() {
        let root = PageNode::root()
            .with_child(PageNode::new("docs").with_id(1))
            .with_child(
                PageNode::new("docs")
                    .with_id(2)
                    .with_child(PageNode::new("install").with_id(3)),
            );

        assert_eq!(find_node(&root, "/docs").unwrap().id, Some(1));
        assert_eq!(find_node(&root, "/docs/install").unwrap().id, Some(3));
        assert_eq!(all_matches(&root, "/docs").len(), 2);
        assert_eq!(duplicate_paths(&root), vec!["/docs".to_string()]);
    }

    #[test]
    fn test_insert_then_find() {
        let mut root = sample_tree();
        let new_path = insert_node(&mut root, "/blog", PageNode::new("post-2")).unwrap();
        assert_eq!(new_path, "/blog/post-2");
        assert_eq!(find_node(&root, &new_path).unwrap().name, "post-2");

        // under the root, via both spellings
        insert_node(&mut root, "", PageNode::new("pricing")).unwrap();
        insert_node(&mut root, "/", PageNode::new("contact")).unwrap();
        assert!(contains(&root, "/pricing"));
        assert!(contains(&root, "/contact"));
    }

    #[test]
    fn test_insert_under_leaf_and_missing_parent() {
        let mut root = sample_tree();
        insert_node(&mut root, "/careers", PageNode::new("engineering")).unwrap();
        assert!(contains(&root, "/careers/engineering"));

        let before = root.clone();
        let error = insert_node(&mut root, "/nope", PageNode::new("x")).unwrap_err();
        assert!(matches!(error, TreeError::NotFound { .. }));
        assert_eq!(root, before, "a failed insert must not touch the tree");
    }

    #[test]
    fn test_insert_refuses_duplicate_sibling() {
        let mut root = sample_tree();
        let error = insert_node(&mut root, "/blog", PageNode::new("post-1")).unwrap_err();
        assert!(matches!(error, TreeError::DataIntegrity { .. }));
        assert!(duplicate_paths(&root).is_empty());
    }

    #[test]
    fn test_insert_rejects_invalid_names() {
        let mut root = sample_tree();
        assert!(matches!(
            insert_node(&mut root, "/blog", PageNode::new("a/b")),
            Err(TreeError::Invalid { .. })
        ));
        assert!(matches!(
            insert_node(&mut root, "/blog", PageNode::new(" ")),
            Err(TreeError::Invalid { .. })
        ));
    }

    #[test]
    fn test_ambiguous_insert_uses_first_match_and_warns() {
        let mut root = PageNode::root()
            .with_child(PageNode::new("docs").with_id(1))
            .with_child(PageNode::new("docs").with_id(2));

        let (subscriber, handle) = subscriber::mock()
            .event(
                expect::event()
                    .at_level(tracing::Level::WARN)
                    .with_fields(expect::msg("Ambiguous insert target, using first match")),
            )
            .only()
            .run_with_handle();

        tracing::subscriber::with_default(subscriber, || {
            insert_node(&mut root, "/docs", PageNode::new("install")).unwrap();
        });
        handle.assert_finished();

        assert_eq!(root.children[0].children.len(), 1);
        assert!(root.children[1].children.is_empty());
    }

    #[test]
    fn test_remove_node() {
        let mut root = sample_tree();
        let removed = remove_node(&mut root, "/blog/post-1").unwrap();
        assert_eq!(removed.id, Some(3));
        assert!(!contains(&root, "/blog/post-1"));
        assert!(matches!(
            remove_node(&mut root, ""),
            Err(TreeError::Invalid { .. })
        ));
    }

    #[test]
    fn test_walk_is_pre_order_in_stored_order() {
        let root = sample_tree();
        assert_eq!(
            node_paths(&root),
            vec![
                "",
                "/blog",
                "/blog/post-1",
                "/blog/Archive",
                "/about",
                "/careers"
            ]
        );
    }

    #[test]
    fn test_sorted_children_is_case_insensitive() {
        let root = sample_tree();
        let blog = find_node(&root, "/blog").unwrap();
        let names: Vec<&str> = sorted_children(blog)
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["Archive", "post-1"]);

        let top: Vec<&str> = sorted_children(&root)
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(top, vec!["about", "blog", "careers"]);
    }

    #[test]
    fn test_set_reviewers_dedups_by_identity() {
        let mut root = sample_tree();
        let ada = User::new("Ada", "ada@example.com").with_id(1);
        let ada_again = User::new("Ada Lovelace", "ada@example.com").with_id(1);
        let grace = User::new("Grace", "grace@example.com");

        let previous = set_reviewers(&mut root, "/about", vec![ada, grace, ada_again]).unwrap();
        assert!(previous.is_empty());

        let about = find_node(&root, "/about").unwrap();
        assert_eq!(about.reviewers.len(), 2);
        assert_eq!(about.reviewers[0].name, "Ada");
    }

    #[test]
    fn test_patch_helpers_report_missing_pages() {
        let mut root = sample_tree();
        assert!(set_owner(&mut root, "/missing", None).is_err());
        assert!(set_status(&mut root, "/missing", PageStatus::ToDelete).is_err());

        let previous = set_status(&mut root, "/about", PageStatus::ToDelete).unwrap();
        assert_eq!(previous, PageStatus::New);
    }
}
