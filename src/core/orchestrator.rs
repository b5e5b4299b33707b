// src/core/orchestrator.rs — Turn state machine
//
// One turn walks Received → Classified → StateLoaded → Dispatched →
// GenerationComplete → Persisted → Replied; generation failure short-circuits
// to Failed and leaves the session's current draft untouched. The
// orchestrator is the sole writer of draft state — workers only generate.

use std::future::Future;
use std::sync::Arc;

use uuid::Uuid;

use crate::infra::config::ClassifierConfig;
use crate::infra::errors::PostwrightError;
use crate::provider::{ModelProvider, ModelRef};
use crate::store::StoreHandle;
use crate::workers::create::CreateWorker;
use crate::workers::optimize::OptimizeWorker;
use crate::workers::refine::RefineWorker;
use crate::workers::tips::TipsWorker;
use crate::workers::GenerationHandle;

use super::classifier::IntentClassifier;
use super::session::Session;
use super::state::SessionStore;
use super::types::{
    CueSet, Draft, DraftStatus, EngineConfig, GeneratedPost, InboundEvent, Intent, PostRecord,
    PromptTrace, SourceType, TurnOutcome, TurnPhase, TurnReply,
};

const FAILURE_REPLY: &str = "Sorry, I couldn't generate content right now. \
Your current draft is untouched — please try again in a moment.";

const EMPTY_MESSAGE_REPLY: &str =
    "Please describe what you'd like me to write for your LinkedIn post.";

pub struct Orchestrator {
    classifier: IntentClassifier,
    sessions: SessionStore,
    create: CreateWorker,
    optimize: OptimizeWorker,
    refine: RefineWorker,
    tips: TipsWorker,
    store: Option<StoreHandle>,
    config: EngineConfig,
}

/// What a successful dispatch produced, before persistence and reply.
struct DispatchResult {
    post: GeneratedPost,
    traces: Vec<PromptTrace>,
    /// None for Tips turns — nothing to install or persist.
    new_draft: Option<Draft>,
    regenerated: bool,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: &ModelRef,
        config: EngineConfig,
        rules: ClassifierConfig,
        store: Option<StoreHandle>,
    ) -> Self {
        let gen = GenerationHandle::new(
            provider,
            model.model.clone(),
            config.temperature,
            config.max_output_tokens,
        );

        Self {
            classifier: IntentClassifier::new(rules),
            sessions: SessionStore::new(store.clone()),
            create: CreateWorker::new(gen.clone()),
            optimize: OptimizeWorker::new(gen.clone()),
            refine: RefineWorker::new(gen.clone()),
            tips: TipsWorker::new(gen),
            store,
            config,
        }
    }

    /// The session store, shared with the transport layer for greeting state.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Process one inbound message to completion. Turns for the same user
    /// serialize on the session lock; turns for different users run freely.
    pub async fn handle(&self, event: InboundEvent) -> TurnOutcome {
        let mut phases = vec![TurnPhase::Received];

        if event.body().trim().is_empty() {
            phases.push(TurnPhase::Replied);
            return TurnOutcome {
                reply: TurnReply {
                    text: EMPTY_MESSAGE_REPLY.into(),
                    is_draft: false,
                },
                intent: "none",
                phases,
                traces: vec![],
                persisted: false,
            };
        }

        // Holding the guard for the whole turn is what serializes a user's
        // queue; a message arriving mid-generation waits here.
        let mut session = self.sessions.acquire(event.user_id).await;

        // A write that failed last turn is retried before new work, so the
        // stored drafts catch up without regenerating anything.
        self.retry_pending_write(&mut session);

        let intent = self.classifier.classify(&event, &session);
        phases.push(TurnPhase::Classified);
        phases.push(TurnPhase::StateLoaded);

        tracing::info!(
            user_id = event.user_id,
            intent = intent.kind(),
            "Turn dispatched"
        );
        phases.push(TurnPhase::Dispatched);

        let intent_kind = intent.kind();
        let dispatched = self.dispatch(&intent, &mut session).await;

        let result = match dispatched {
            Ok(result) => result,
            Err(e) if e.is_generation_failure() => {
                tracing::warn!(user_id = event.user_id, "Generation failed: {e}");
                phases.push(TurnPhase::Failed);
                session.touch();
                return TurnOutcome {
                    reply: TurnReply {
                        text: FAILURE_REPLY.into(),
                        is_draft: false,
                    },
                    intent: intent_kind,
                    phases,
                    traces: vec![],
                    persisted: false,
                };
            }
            Err(e) => {
                tracing::error!(user_id = event.user_id, "Turn failed: {e}");
                phases.push(TurnPhase::Failed);
                return TurnOutcome {
                    reply: TurnReply {
                        text: FAILURE_REPLY.into(),
                        is_draft: false,
                    },
                    intent: intent_kind,
                    phases,
                    traces: vec![],
                    persisted: false,
                };
            }
        };
        phases.push(TurnPhase::GenerationComplete);

        // Install the new draft and persist it. Tips turns skip both.
        let mut persisted = false;
        let is_draft = result.new_draft.is_some();
        if let Some(draft) = result.new_draft.clone() {
            self.install_draft(&intent, &mut session, draft);

            let record = build_post_record(&session, &result.post);
            match self.persist_post(&record) {
                Ok(()) => {
                    persisted = true;
                    phases.push(TurnPhase::Persisted);
                }
                Err(e) => {
                    // Reply is unaffected; only the write is retried later.
                    tracing::warn!(
                        user_id = event.user_id,
                        "Draft persistence failed, flagged for retry: {e}"
                    );
                    session.pending_write = Some(record);
                }
            }
        } else {
            session.touch();
        }

        self.sessions.persist(&session);

        let reply_text = if is_draft {
            format_draft_reply(&result.post, result.regenerated)
        } else {
            result.post.content.clone()
        };
        phases.push(TurnPhase::Replied);

        TurnOutcome {
            reply: TurnReply {
                text: reply_text,
                is_draft,
            },
            intent: intent_kind,
            phases,
            traces: result.traces,
            persisted,
        }
    }

    /// Exhaustive dispatch: one handler per intent variant, so a new intent
    /// is a compile-time-visible change everywhere it matters.
    async fn dispatch(
        &self,
        intent: &Intent,
        session: &mut Session,
    ) -> Result<DispatchResult, PostwrightError> {
        match intent {
            Intent::Create {
                topic,
                source,
                regenerate,
            } => self.run_create(session, topic, *source, *regenerate).await,

            Intent::Refine { cues } => match session.current_draft.clone() {
                Some(base) => self.run_refine(session, &base, cues).await,
                // Cannot refine nothing: reclassified as Create.
                None => {
                    self.run_create(session, &cues.describe(), SourceType::Text, false)
                        .await
                }
            },

            Intent::Optimize { instruction } => match session.current_draft.clone() {
                Some(base) => self.run_optimize(session, &base, instruction).await,
                None => {
                    self.run_create(session, instruction, SourceType::Text, false)
                        .await
                }
            },

            Intent::Tips { question } => self.run_tips(session, question).await,

            // Conservative fallback: a fresh create scoped to the new text.
            // install_draft retains the prior draft in history.
            Intent::Ambiguous { topic } => {
                self.run_create(session, topic, SourceType::Text, false).await
            }
        }
    }

    async fn run_create(
        &self,
        session: &Session,
        topic: &str,
        source: SourceType,
        regenerate: bool,
    ) -> Result<DispatchResult, PostwrightError> {
        let prefs = &session.prefs;
        let (mut post, trace) = self
            .bounded(self.create.run(topic, source, prefs))
            .await?;
        let mut traces = vec![trace];

        // Second pass; its failure keeps the base output instead of
        // failing the turn.
        if self.config.optimize_pass {
            let second_pass = self
                .bounded(self.optimize.run(&post.content, &post.hashtags, None, prefs))
                .await;
            match second_pass {
                Ok((optimized, trace)) => {
                    post = optimized;
                    traces.push(trace);
                }
                Err(e) => {
                    tracing::warn!("Optimize pass failed, keeping base draft: {e}");
                }
            }
        }

        let draft = Draft::new(post.content.clone(), source, topic);
        Ok(DispatchResult {
            post,
            traces,
            new_draft: Some(draft),
            regenerated: regenerate,
        })
    }

    async fn run_refine(
        &self,
        session: &Session,
        base: &Draft,
        cues: &CueSet,
    ) -> Result<DispatchResult, PostwrightError> {
        // The refined draft inherits its base's origin so a later
        // "regenerate" still reaches back to the original topic.
        let mut prefs = session.prefs.clone();
        prefs.apply_cues(cues);

        let (post, trace) = self.bounded(self.refine.run(base, cues, &prefs)).await?;

        let draft = Draft::new(post.content.clone(), base.source, base.origin_prompt.clone());
        Ok(DispatchResult {
            post,
            traces: vec![trace],
            new_draft: Some(draft),
            regenerated: false,
        })
    }

    async fn run_optimize(
        &self,
        session: &Session,
        base: &Draft,
        instruction: &str,
    ) -> Result<DispatchResult, PostwrightError> {
        let (post, trace) = self
            .bounded(self.optimize.run(
                &base.text,
                &[],
                Some(instruction),
                &session.prefs,
            ))
            .await?;

        let draft = Draft::new(post.content.clone(), base.source, base.origin_prompt.clone());
        Ok(DispatchResult {
            post,
            traces: vec![trace],
            new_draft: Some(draft),
            regenerated: false,
        })
    }

    async fn run_tips(
        &self,
        session: &Session,
        question: &str,
    ) -> Result<DispatchResult, PostwrightError> {
        let draft_context = session.current_draft.as_ref().map(|d| d.text.as_str());
        let (post, trace) = self.bounded(self.tips.run(question, draft_context)).await?;

        Ok(DispatchResult {
            post,
            traces: vec![trace],
            new_draft: None,
            regenerated: false,
        })
    }

    /// Route the new draft into the session according to the intent that
    /// produced it.
    fn install_draft(&self, intent: &Intent, session: &mut Session, draft: Draft) {
        match intent {
            Intent::Create {
                topic, regenerate, ..
            } => {
                if *regenerate {
                    session.begin_new_lineage(draft);
                } else {
                    session.prefs.topic = topic.clone();
                    session.supersede(draft);
                }
            }
            Intent::Refine { cues } => {
                session.apply_refinement(cues.clone(), draft);
            }
            Intent::Optimize { instruction } => {
                // An optimize turn is a content-preserving revision; audit it
                // as a refinement with the user's ask as a free-form cue.
                session.apply_refinement(
                    CueSet {
                        freeform: vec![instruction.clone()],
                        ..Default::default()
                    },
                    draft,
                );
            }
            Intent::Ambiguous { topic } => {
                session.prefs.topic = topic.clone();
                session.supersede(draft);
            }
            Intent::Tips { .. } => unreachable!("tips turns produce no draft"),
        }
    }

    fn persist_post(&self, record: &PostRecord) -> Result<(), PostwrightError> {
        let Some(ref store) = self.store else {
            return Ok(());
        };
        let store = store
            .lock()
            .map_err(|_| PostwrightError::Config("store lock poisoned".into()))?;
        store
            .insert_post(record)
            .map_err(|e| PostwrightError::Other(e))?;
        Ok(())
    }

    /// Retry a persistence write left over from a previous turn.
    fn retry_pending_write(&self, session: &mut Session) {
        let Some(record) = session.pending_write.clone() else {
            return;
        };
        match self.persist_post(&record) {
            Ok(()) => {
                tracing::info!(user_id = session.user_id, "Pending draft write committed");
                session.pending_write = None;
            }
            Err(e) => {
                tracing::warn!(user_id = session.user_id, "Pending draft write still failing: {e}");
            }
        }
    }

    /// Bound a generation future by the configured timeout.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, PostwrightError>>,
    ) -> Result<T, PostwrightError> {
        match tokio::time::timeout(self.config.generation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PostwrightError::GenerationTimeout {
                limit_secs: self.config.generation_timeout.as_secs(),
            }),
        }
    }
}

fn build_post_record(session: &Session, post: &GeneratedPost) -> PostRecord {
    let draft = session
        .current_draft
        .as_ref()
        .expect("post record built only after a draft is installed");
    PostRecord {
        id: Uuid::new_v4().to_string(),
        user_id: session.user_id,
        content: draft.text.clone(),
        source_type: draft.source,
        status: DraftStatus::Draft,
        topic: draft.origin_prompt.clone(),
        industry: session.prefs.industry.clone(),
        tone: session.prefs.tone.clone(),
        hashtags: post.hashtags.clone(),
        created_at: draft.created_at,
    }
}

/// Render a draft reply: post body, hashtag line, and the follow-up hint.
fn format_draft_reply(post: &GeneratedPost, regenerated: bool) -> String {
    let mut out = String::with_capacity(post.content.len() + 256);

    out.push_str("Draft based on your request:\n\n");
    out.push_str(&post.content);

    if !post.hashtags.is_empty() {
        out.push_str("\n\n");
        let tags: Vec<String> = post.hashtags.iter().map(|t| format!("#{t}")).collect();
        out.push_str(&tags.join(" "));
    }

    if regenerated {
        out.push_str("\n(Regenerated)");
    }

    out.push_str(
        "\n\nIf you'd like a different version, reply \"regenerate\" or refine \
         with follow-ups like \"shorter\", \"more casual\", or specific \
         instructions (e.g. \"from a student perspective\").",
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_draft_reply_with_hashtags() {
        let post = GeneratedPost {
            content: "We shipped.".into(),
            hashtags: vec!["launch".into(), "ai".into()],
            ..Default::default()
        };
        let reply = format_draft_reply(&post, false);
        assert!(reply.contains("We shipped."));
        assert!(reply.contains("#launch #ai"));
        assert!(!reply.contains("(Regenerated)"));
        assert!(reply.contains("regenerate"));
    }

    #[test]
    fn test_format_draft_reply_regenerated_note() {
        let post = GeneratedPost {
            content: "Again.".into(),
            ..Default::default()
        };
        let reply = format_draft_reply(&post, true);
        assert!(reply.contains("(Regenerated)"));
    }
}
