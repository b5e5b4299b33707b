// src/core/session.rs — Per-user conversational and draft state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{CueSet, Draft, DraftRequest, PostRecord};

/// One audit entry in a session's refinement history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HistoryEntry {
    /// A refinement turn: the cue set applied and the draft it replaced.
    Refined {
        cues: CueSet,
        previous: Draft,
        at: DateTime<Utc>,
    },
    /// A draft replaced wholesale (regenerate, or an ambiguous message
    /// treated as a fresh create). Kept so prior work is never silently lost.
    Superseded { draft: Draft, at: DateTime<Utc> },
}

/// Per-user session. Owned exclusively by the `SessionStore`; mutated only
/// by the orchestrator. Never destroyed — it may be evicted from memory and
/// reloaded from its durable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    /// Linked to LinkedIn (consulted by the transport for greeting only).
    pub connected: bool,
    pub greeted_at: Option<DateTime<Utc>>,
    pub current_draft: Option<Draft>,
    pub history: Vec<HistoryEntry>,
    pub last_cues: Option<CueSet>,
    pub prefs: DraftRequest,
    /// A persistence write that failed and is awaiting retry at the start
    /// of this user's next turn. The reply that produced it already went out.
    pub pending_write: Option<PostRecord>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            connected: false,
            greeted_at: None,
            current_draft: None,
            history: Vec::new(),
            last_cues: None,
            prefs: DraftRequest::default(),
            pending_write: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Install a refined draft: the replaced draft and its cue set go to
    /// history, the cues become the last-applied set and fold into the
    /// standing preferences.
    pub fn apply_refinement(&mut self, cues: CueSet, new_draft: Draft) {
        if let Some(previous) = self.current_draft.take() {
            self.history.push(HistoryEntry::Refined {
                cues: cues.clone(),
                previous,
                at: Utc::now(),
            });
        }
        self.prefs.apply_cues(&cues);
        self.last_cues = Some(cues);
        self.current_draft = Some(new_draft);
        self.touch();
    }

    /// Install a draft that supersedes the current one without refining it
    /// (ambiguous-create path). The old draft is retained in history.
    pub fn supersede(&mut self, new_draft: Draft) {
        if let Some(old) = self.current_draft.take() {
            self.history.push(HistoryEntry::Superseded {
                draft: old,
                at: Utc::now(),
            });
        }
        self.last_cues = None;
        self.current_draft = Some(new_draft);
        self.touch();
    }

    /// Start a fresh draft lineage (the regenerate path): refinement
    /// entries for the old lineage are dropped, but superseded drafts stay
    /// for audit, including the one being replaced now.
    pub fn begin_new_lineage(&mut self, new_draft: Draft) {
        self.history
            .retain(|e| matches!(e, HistoryEntry::Superseded { .. }));
        if let Some(old) = self.current_draft.take() {
            self.history.push(HistoryEntry::Superseded {
                draft: old,
                at: Utc::now(),
            });
        }
        self.last_cues = None;
        self.current_draft = Some(new_draft);
        self.touch();
    }

    /// Count of refinement entries in the current lineage.
    pub fn refinement_count(&self) -> usize {
        self.history
            .iter()
            .filter(|e| matches!(e, HistoryEntry::Refined { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{LengthCue, SourceType, ToneCue};

    fn draft(text: &str, origin: &str) -> Draft {
        Draft::new(text, SourceType::Text, origin)
    }

    #[test]
    fn test_new_session_is_empty() {
        let s = Session::new(42);
        assert_eq!(s.user_id, 42);
        assert!(s.current_draft.is_none());
        assert!(s.history.is_empty());
        assert!(!s.connected);
    }

    #[test]
    fn test_apply_refinement_archives_previous() {
        let mut s = Session::new(1);
        s.current_draft = Some(draft("v1", "launch post"));

        let cues = CueSet {
            length: Some(LengthCue::Shorter),
            tone: Some(ToneCue::Casual),
            ..Default::default()
        };
        s.apply_refinement(cues.clone(), draft("v2", "launch post"));

        assert_eq!(s.current_draft.as_ref().unwrap().text, "v2");
        assert_eq!(s.refinement_count(), 1);
        assert_eq!(s.last_cues, Some(cues));
        assert_eq!(s.prefs.length, "short");
        match &s.history[0] {
            HistoryEntry::Refined { previous, .. } => assert_eq!(previous.text, "v1"),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn test_supersede_retains_old_draft() {
        let mut s = Session::new(1);
        s.current_draft = Some(draft("old", "old topic"));

        s.supersede(draft("new", "new topic"));

        assert_eq!(s.current_draft.as_ref().unwrap().text, "new");
        assert_eq!(s.history.len(), 1);
        assert!(matches!(s.history[0], HistoryEntry::Superseded { .. }));
    }

    #[test]
    fn test_new_lineage_drops_refinements_keeps_superseded() {
        let mut s = Session::new(1);
        s.current_draft = Some(draft("v1", "topic"));
        s.apply_refinement(
            CueSet {
                length: Some(LengthCue::Shorter),
                ..Default::default()
            },
            draft("v2", "topic"),
        );
        assert_eq!(s.refinement_count(), 1);

        s.begin_new_lineage(draft("v3", "topic"));

        // Refinement entries gone, the replaced v2 kept as superseded
        assert_eq!(s.refinement_count(), 0);
        assert_eq!(s.history.len(), 1);
        match &s.history[0] {
            HistoryEntry::Superseded { draft: d, .. } => assert_eq!(d.text, "v2"),
            other => panic!("unexpected entry: {other:?}"),
        }
        assert!(s.last_cues.is_none());
    }

    #[test]
    fn test_session_snapshot_roundtrip() {
        let mut s = Session::new(7);
        s.current_draft = Some(draft("hello", "topic"));
        s.connected = true;

        let json = serde_json::to_string(&s).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.user_id, 7);
        assert!(restored.connected);
        assert_eq!(restored.current_draft.unwrap().text, "hello");
    }
}
