//! Merge of optimistic local messages with persisted history.
//!
//! The fetched snapshot is the base of truth. Local messages that still
//! carry a temporary id and have no counterpart in the snapshot are kept
//! after it, so a just-finished turn does not vanish while the backend is
//! still indexing it.

use chat_types::message::Message;

/// Merge `fetched` into `current`.
///
/// Returns `None` while any current message is streaming: the snapshot is
/// necessarily older than the in-flight turn. Applying the result again
/// with the same snapshot yields the same list.
pub fn reconcile(current: &[Message], fetched: Vec<Message>) -> Option<Vec<Message>> {
    if current.iter().any(|m| m.is_streaming) {
        return None;
    }

    let mut merged = fetched;
    // Snapshot entries we already hold under the same id are nobody's twin,
    // but keep the detail an earlier merge gave them
    let mut claimed = vec![false; merged.len()];
    for (index, persisted) in merged.iter_mut().enumerate() {
        if let Some(local) = current.iter().find(|c| c.id == persisted.id) {
            claimed[index] = true;
            adopt_local_detail(persisted, local);
        }
    }
    let mut kept = Vec::new();

    for local in current.iter().filter(|m| m.id.is_temporary()) {
        if merged.iter().any(|m| m.id == local.id) {
            continue;
        }
        match find_twin(&merged, &claimed, local) {
            Some(index) => {
                claimed[index] = true;
                adopt_local_detail(&mut merged[index], local);
            }
            None => kept.push(local.clone()),
        }
    }

    if !kept.is_empty() {
        log::debug!("Keeping {} unpersisted message(s) after history", kept.len());
    }
    merged.extend(kept);
    Some(merged)
}

/// A persisted message the local one became: same role and content,
/// not already matched to another local message.
fn find_twin(fetched: &[Message], claimed: &[bool], local: &Message) -> Option<usize> {
    fetched
        .iter()
        .enumerate()
        .find(|(i, m)| !claimed[*i] && m.role == local.role && m.content == local.content)
        .map(|(i, _)| i)
}

/// History may omit client-side detail (trace, tools, sources). Keep ours
/// where the persisted copy has none.
fn adopt_local_detail(persisted: &mut Message, local: &Message) {
    if persisted.steps.is_empty() {
        persisted.steps = local.steps.clone();
    }
    if persisted.tools.is_empty() {
        persisted.tools = local.tools.clone();
    }
    if persisted.sources.is_empty() {
        persisted.sources = local.sources.clone();
    }
    if persisted.attachments.is_empty() {
        persisted.attachments = local.attachments.clone();
    }
    if persisted.feedback.is_none() {
        persisted.feedback = local.feedback;
    }
}
