//! Optimistic-echo reconciliation.
//!
//! Local operations are rendered before the server confirms them. The server
//! later broadcasts every operation back to every participant, the sender
//! included, so the sender has to recognize its own echoes and drop them or
//! the stroke would be drawn twice.
//!
//! Each outgoing operation is stamped with a client op id (`cid`). Echoes are
//! matched by that id first. Servers that strip unknown payload fields send the
//! echo back without it; those are matched by canonical signature instead,
//! removing one pending instance per echo.

use crate::operation::{Operation, Signature, TaggedOperation};

/// Pending echoes beyond which stamping logs a backlog.
///
/// Entries only leave on their echo or on a snapshot, so a server that stops
/// echoing lets the list grow until the next resync.
pub const PENDING_WARN_THRESHOLD: usize = 64;

/// Outcome of reconciling a broadcast operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A genuine change; apply it.
    Apply,
    /// The echo of an operation already rendered locally.
    DiscardEcho,
}

#[derive(Debug, Clone)]
struct PendingEntry {
    cid: String,
    signature: Signature,
}

/// Pending-echo bookkeeping for one surface and one participant.
#[derive(Debug, Clone)]
pub struct Reconciler {
    participant_id: Option<String>,
    session_prefix: String,
    next_seq: u64,
    pending: Vec<PendingEntry>,
}

impl Reconciler {
    pub fn new(participant_id: Option<String>) -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self {
            participant_id,
            session_prefix: uuid[..8].to_string(),
            next_seq: 0,
            pending: Vec::new(),
        }
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    /// Set the local participant id, e.g. once the server assigns one.
    pub fn set_participant(&mut self, participant_id: impl Into<String>) {
        self.participant_id = Some(participant_id.into());
    }

    /// Record a local operation as pending and return it stamped with a fresh cid.
    pub fn stamp(&mut self, op: Operation) -> TaggedOperation {
        self.next_seq += 1;
        let cid = format!("{}-{}", self.session_prefix, self.next_seq);
        self.pending.push(PendingEntry {
            cid: cid.clone(),
            signature: op.signature(),
        });
        if self.is_backlogged() {
            log::debug!(
                "{} operations awaiting their echo (threshold {})",
                self.pending.len(),
                PENDING_WARN_THRESHOLD
            );
        }
        TaggedOperation::new(op, Some(cid))
    }

    /// Decide what to do with an operation broadcast by `origin`.
    pub fn on_broadcast(&mut self, op: &TaggedOperation, origin: Option<&str>) -> Disposition {
        let own = matches!((origin, self.participant_id.as_deref()), (Some(by), Some(me)) if by == me);
        if !own {
            return Disposition::Apply;
        }

        let index = match &op.cid {
            Some(cid) => self.pending.iter().position(|entry| &entry.cid == cid),
            None => {
                let signature = op.op.signature();
                self.pending.iter().position(|entry| entry.signature == signature)
            }
        };

        match index {
            Some(i) => {
                self.pending.remove(i);
                Disposition::DiscardEcho
            }
            None => {
                log::debug!("Own {} echo matched nothing pending, applying", op.op.kind().as_str());
                Disposition::Apply
            }
        }
    }

    /// Forget every pending entry.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether more echoes are outstanding than [`PENDING_WARN_THRESHOLD`].
    pub fn is_backlogged(&self) -> bool {
        self.pending.len() > PENDING_WARN_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::LinePayload;
    use crate::stroke::StrokeStyle;
    use kurbo::Point;

    fn line() -> Operation {
        Operation::Line(LinePayload::new(
            vec![Point::new(10.0, 10.0), Point::new(20.0, 20.0)],
            StrokeStyle::default(),
        ))
    }

    #[test]
    fn test_cids_unique_and_increasing() {
        let mut rec = Reconciler::new(Some("me".into()));
        let a = rec.stamp(line()).cid.unwrap();
        let b = rec.stamp(line()).cid.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with("-1"));
        assert!(b.ends_with("-2"));
    }

    #[test]
    fn test_own_echo_discarded_once() {
        let mut rec = Reconciler::new(Some("me".into()));
        let sent = rec.stamp(line());
        assert_eq!(rec.on_broadcast(&sent, Some("me")), Disposition::DiscardEcho);
        assert_eq!(rec.pending_len(), 0);
        // A second identical echo is no longer pending.
        assert_eq!(rec.on_broadcast(&sent, Some("me")), Disposition::Apply);
    }

    #[test]
    fn test_identical_strokes_matched_by_cid() {
        let mut rec = Reconciler::new(Some("me".into()));
        let first = rec.stamp(line());
        let second = rec.stamp(line());
        assert_eq!(rec.on_broadcast(&second, Some("me")), Disposition::DiscardEcho);
        assert_eq!(rec.on_broadcast(&first, Some("me")), Disposition::DiscardEcho);
        assert_eq!(rec.pending_len(), 0);
    }

    #[test]
    fn test_signature_fallback_without_cid() {
        let mut rec = Reconciler::new(Some("me".into()));
        rec.stamp(line());
        rec.stamp(line());
        let stripped = TaggedOperation::untagged(line());
        assert_eq!(rec.on_broadcast(&stripped, Some("me")), Disposition::DiscardEcho);
        assert_eq!(rec.pending_len(), 1);
        assert_eq!(rec.on_broadcast(&stripped, Some("me")), Disposition::DiscardEcho);
        assert_eq!(rec.on_broadcast(&stripped, Some("me")), Disposition::Apply);
    }

    #[test]
    fn test_other_participant_always_applied() {
        let mut rec = Reconciler::new(Some("me".into()));
        let sent = rec.stamp(line());
        assert_eq!(rec.on_broadcast(&sent, Some("them")), Disposition::Apply);
        assert_eq!(rec.on_broadcast(&sent, None), Disposition::Apply);
        assert_eq!(rec.pending_len(), 1);
    }

    #[test]
    fn test_unechoed_ops_backlog_until_cleared() {
        let mut rec = Reconciler::new(Some("me".into()));
        for _ in 0..PENDING_WARN_THRESHOLD {
            rec.stamp(line());
        }
        assert!(!rec.is_backlogged());
        rec.stamp(line());
        assert!(rec.is_backlogged());
        assert_eq!(rec.pending_len(), PENDING_WARN_THRESHOLD + 1);

        rec.clear_pending();
        assert!(!rec.is_backlogged());
        assert_eq!(rec.pending_len(), 0);
    }

    #[test]
    fn test_clear_pending() {
        let mut rec = Reconciler::new(None);
        rec.stamp(line());
        rec.clear_pending();
        assert_eq!(rec.pending_len(), 0);
        rec.set_participant("me");
        assert_eq!(rec.participant_id(), Some("me"));
    }
}
