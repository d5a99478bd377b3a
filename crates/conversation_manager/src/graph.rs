//! Pure walks over a loaded message graph
//!
//! These functions operate on a `HashMap<Uuid, Message>` snapshot and
//! never touch storage, so every tree property can be tested without
//! I/O.

use std::collections::{HashMap, HashSet};

use chat_core::{Message, Role};
use uuid::Uuid;

/// Walk parent links from `start` (inclusive) up to the root.
///
/// Returns ids ordered leaf-first. A broken parent link ends the walk at
/// the last resolvable node; revisiting a node ends it as well.
pub fn path_to_root(messages: &HashMap<Uuid, Message>, start: Uuid) -> Vec<Uuid> {
    let mut path = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = Some(start);

    while let Some(id) = cursor {
        if !seen.insert(id) {
            break;
        }
        let Some(msg) = messages.get(&id) else { break };
        path.push(id);
        cursor = msg.parent;
    }

    path
}

/// Root-first active branch ending at `tip`.
pub fn branch_to(messages: &HashMap<Uuid, Message>, tip: Uuid) -> Vec<Message> {
    let mut ids = path_to_root(messages, tip);
    ids.reverse();
    ids.iter().filter_map(|id| messages.get(id).cloned()).collect()
}

/// Follow `active_child` selectors from `start` down to the leaf of the
/// sub-branch that was last active beneath it.
pub fn walk_active_forward(messages: &HashMap<Uuid, Message>, start: Uuid) -> Uuid {
    let mut seen = HashSet::new();
    let mut cursor = start;

    while seen.insert(cursor) {
        match messages.get(&cursor).and_then(|m| m.active_child) {
            Some(child) if messages.contains_key(&child) => cursor = child,
            _ => break,
        }
    }

    cursor
}

/// Children of `parent` sharing `role`, ordered by creation time.
pub fn sibling_set<'a>(
    messages: &'a HashMap<Uuid, Message>,
    parent: Option<Uuid>,
    role: Role,
) -> Vec<&'a Message> {
    let mut siblings: Vec<&Message> = messages
        .values()
        .filter(|m| m.parent == parent && m.role == role)
        .collect();
    siblings.sort_by_key(|m| (m.created_at, m.id));
    siblings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::Principal;
    use chat_core::Conversation;

    fn linear_chain(len: usize) -> (HashMap<Uuid, Message>, Vec<Uuid>) {
        let conv = Conversation::new(Principal::Account("u".into()), None);
        let mut messages = HashMap::new();
        let mut ids = Vec::new();
        let mut parent = None;

        for i in 0..len {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            let mut msg = Message::new(conv.id, role, format!("m{}", i), parent);
            if let Some(pid) = parent {
                let p: &mut Message = messages.get_mut(&pid).unwrap();
                p.active_child = Some(msg.id);
            }
            msg.created_at = msg.created_at + chrono::Duration::milliseconds(i as i64);
            parent = Some(msg.id);
            ids.push(msg.id);
            messages.insert(msg.id, msg);
        }

        (messages, ids)
    }

    #[test]
    fn path_to_root_walks_parents_leaf_first() {
        let (messages, ids) = linear_chain(4);
        let path = path_to_root(&messages, ids[3]);
        assert_eq!(path, vec![ids[3], ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn branch_to_is_root_first() {
        let (messages, ids) = linear_chain(3);
        let branch = branch_to(&messages, ids[2]);
        let branch_ids: Vec<Uuid> = branch.iter().map(|m| m.id).collect();
        assert_eq!(branch_ids, ids);
    }

    #[test]
    fn walk_active_forward_reaches_leaf() {
        let (messages, ids) = linear_chain(5);
        assert_eq!(walk_active_forward(&messages, ids[0]), ids[4]);
        assert_eq!(walk_active_forward(&messages, ids[3]), ids[4]);
    }

    #[test]
    fn walk_active_forward_stops_at_node_without_selector() {
        let (mut messages, ids) = linear_chain(4);
        messages.get_mut(&ids[1]).unwrap().active_child = None;
        assert_eq!(walk_active_forward(&messages, ids[0]), ids[1]);
    }

    #[test]
    fn sibling_set_filters_by_parent_and_role() {
        let (mut messages, ids) = linear_chain(2);
        let conv_id = messages[&ids[0]].conversation_id;

        // Second assistant version under the same user parent.
        let sibling = Message::new(conv_id, Role::Assistant, "alt", Some(ids[0]));
        messages.insert(sibling.id, sibling);

        let set = sibling_set(&messages, Some(ids[0]), Role::Assistant);
        assert_eq!(set.len(), 2);
        let users = sibling_set(&messages, Some(ids[0]), Role::User);
        assert!(users.is_empty());
    }

    #[test]
    fn path_to_root_survives_a_cycle() {
        let (mut messages, ids) = linear_chain(3);
        messages.get_mut(&ids[0]).unwrap().parent = Some(ids[2]);
        let path = path_to_root(&messages, ids[2]);
        assert_eq!(path.len(), 3);
    }
}
