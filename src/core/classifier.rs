// src/core/classifier.rs — Message intent classification and cue extraction
//
// The keyword heuristic lives entirely behind the (Intent, CueSet) contract
// so it can be replaced without touching workers or the orchestrator. All
// vocabulary comes from ClassifierConfig; nothing is hard-coded here beyond
// segment splitting and filler words.

use crate::infra::config::ClassifierConfig;

use super::session::Session;
use super::types::{CueSet, InboundEvent, Intent, LengthCue, SourceType, ToneCue};

/// Words that can pad a bare refinement verb without adding instruction
/// content ("rewrite it please" is still a bare "rewrite").
const FILLER_WORDS: &[&str] = &["it", "this", "that", "the", "post", "draft", "please"];

pub struct IntentClassifier {
    rules: ClassifierConfig,
}

impl IntentClassifier {
    pub fn new(rules: ClassifierConfig) -> Self {
        Self { rules }
    }

    /// Classify one inbound message against the session's current state.
    ///
    /// Rule order is precedence:
    ///   photo → regenerate → no-draft → refine-cues → refine-shaped-but-empty
    ///   → optimize → tips → ambiguous.
    pub fn classify(&self, event: &InboundEvent, session: &Session) -> Intent {
        // Photo + caption is always a fresh create, photo-derived.
        if let Some(caption) = event.photo_caption.as_deref() {
            let caption = caption.trim();
            if !caption.is_empty() {
                return Intent::Create {
                    topic: caption.to_string(),
                    source: SourceType::Photo,
                    regenerate: false,
                };
            }
        }

        let body = event.body().trim();
        let lower = body.to_lowercase();

        // Regenerate reuses the current draft's originating prompt. Without
        // a draft there is nothing to reuse and the no-draft rule applies.
        if let Some(draft) = session.current_draft.as_ref() {
            if contains_any(&lower, &self.rules.regenerate_keywords) {
                return Intent::Create {
                    topic: draft.origin_prompt.clone(),
                    source: draft.source,
                    regenerate: true,
                };
            }
        }

        // No base to refine: every message is a create.
        if session.current_draft.is_none() {
            return Intent::Create {
                topic: body.to_string(),
                source: SourceType::Text,
                regenerate: false,
            };
        }

        let cues = self.extract_cues(body);
        if !cues.is_empty() {
            return Intent::Refine { cues };
        }

        // Refinement-shaped but nothing extractable: never an empty Refine.
        if contains_any(&lower, &self.rules.refine_markers) {
            return Intent::Ambiguous {
                topic: body.to_string(),
            };
        }

        if contains_any(&lower, &self.rules.optimize_keywords) {
            return Intent::Optimize {
                instruction: body.to_string(),
            };
        }

        if contains_any(&lower, &self.rules.tips_keywords) {
            return Intent::Tips {
                question: body.to_string(),
            };
        }

        Intent::Ambiguous {
            topic: body.to_string(),
        }
    }

    /// Extract every cue category present in one message. Chained cues
    /// ("shorter, more casual") are segmented and all land in the same set.
    pub fn extract_cues(&self, text: &str) -> CueSet {
        let mut cues = CueSet::default();

        for segment in split_segments(text) {
            let seg_lower = segment.to_lowercase();
            let mut matched = false;

            if contains_any(&seg_lower, &self.rules.shorter_keywords) {
                cues.length = Some(LengthCue::Shorter);
                matched = true;
            } else if contains_any(&seg_lower, &self.rules.longer_keywords) {
                cues.length = Some(LengthCue::Longer);
                matched = true;
            }

            if contains_any(&seg_lower, &self.rules.casual_keywords) {
                cues.tone = Some(ToneCue::Casual);
                matched = true;
            } else if contains_any(&seg_lower, &self.rules.professional_keywords) {
                cues.tone = Some(ToneCue::Professional);
                matched = true;
            } else if contains_any(&seg_lower, &self.rules.enthusiastic_keywords) {
                cues.tone = Some(ToneCue::Enthusiastic);
                matched = true;
            } else if contains_any(&seg_lower, &self.rules.thoughtful_keywords) {
                cues.tone = Some(ToneCue::Thoughtful);
                matched = true;
            }

            if let Some(p) = self.extract_perspective(&seg_lower) {
                cues.perspective = Some(p);
                matched = true;
            }

            // A refinement verb with real instruction content beyond the
            // verb itself becomes a free-form cue. A bare verb ("rewrite",
            // "redo it") extracts nothing and falls to Ambiguous handling.
            if !matched {
                if let Some(marker) = self
                    .rules
                    .refine_markers
                    .iter()
                    .find(|m| seg_lower.contains(m.as_str()))
                {
                    if !is_bare_marker(&seg_lower, marker) {
                        cues.freeform.push(segment.trim().to_string());
                    }
                }
            }
        }

        cues
    }

    /// Pull the subject out of a perspective phrase: "from a student
    /// perspective" → "student", "as a recruiter" → "recruiter".
    fn extract_perspective(&self, seg_lower: &str) -> Option<String> {
        for marker in &self.rules.perspective_markers {
            let Some(idx) = seg_lower.find(marker.as_str()) else {
                continue;
            };
            // Word boundary: "has a" must not match the "as a" marker.
            if idx > 0 && !seg_lower.as_bytes()[idx - 1].is_ascii_whitespace() {
                continue;
            }
            let rest = seg_lower[idx + marker.len()..].trim();
            if rest.is_empty() {
                continue;
            }
            let subject = rest
                .trim_end_matches(|c: char| c.is_ascii_punctuation())
                .trim_end_matches("perspective")
                .trim_end_matches("viewpoint")
                .trim_end_matches("point of view")
                .trim();
            // "as a recruiter" has no trailing noun; "from a student
            // perspective" does. Either way the remainder is the subject,
            // but a perspective cue needs the phrase to be about voice, so
            // require the trailing noun for the "from ..." forms.
            let had_noun = rest.ends_with("perspective")
                || rest.ends_with("viewpoint")
                || rest.ends_with("point of view");
            if subject.is_empty() {
                continue;
            }
            if marker.starts_with("from") && !had_noun {
                continue;
            }
            if marker.starts_with("as") && !had_noun {
                // "as a recruiter" — accept short subjects only, so longer
                // sentences that merely contain "as a" don't misfire.
                if subject.split_whitespace().count() > 2 {
                    continue;
                }
            }
            return Some(subject.to_string());
        }
        None
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

/// Split a message into cue segments on commas, semicolons, and " and ".
fn split_segments(text: &str) -> Vec<&str> {
    text.split([',', ';'])
        .flat_map(|s| s.split(" and "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// True when the segment is just the refinement verb plus filler.
fn is_bare_marker(seg_lower: &str, marker: &str) -> bool {
    let Some(idx) = seg_lower.find(marker) else {
        return false;
    };
    let remainder = format!("{}{}", &seg_lower[..idx], &seg_lower[idx + marker.len()..]);
    remainder
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|w| !w.is_empty())
        .all(|w| FILLER_WORDS.contains(&w))
}
