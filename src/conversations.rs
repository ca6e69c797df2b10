//! Conversation aggregation: one representative message per distinct
//! partner, derived from the store on every inbox request.

use std::collections::HashSet;

use uuid::Uuid;

use crate::message::StoredMessage;

/// Reduces a newest-first message sequence to the latest message per
/// conversation partner.
///
/// Input must be ordered descending by `(created_at, seq)` (the shape
/// `store::all_involving` returns). One linear pass: the first message seen
/// for a partner is that partner's most recent one, and output order is
/// encounter order, i.e. partners sorted by recency of their latest message.
/// For a self-message the partner is the user themself.
pub fn latest_per_partner(user: Uuid, newest_first: &[StoredMessage]) -> Vec<StoredMessage> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut latest = Vec::new();

    for message in newest_first {
        let partner = if message.sender == user {
            message.receiver
        } else {
            message.sender
        };

        if seen.insert(partner) {
            latest.push(message.clone());
        }
    }

    latest
}
