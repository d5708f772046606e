// src/core/session.rs
//
// Attempt lifecycle state machine. Each in-progress attempt is driven by one
// session holding the live answer vector, the countdown, and the cheat
// aggregator, plus a single driver task that owns every periodic job
// (countdown tick, exam-window poll, debounced autosave). All of them are
// cancelled together through one watch channel when the attempt ends.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::types::Json;
use tokio::sync::watch;
use tokio::time::{Instant, interval_at};

use crate::core::anticheat::{
    CheatAggregator, DetectedObject, MovementTracker, SignalKind, analyze_frame,
};
use crate::core::scoring::{self, ScoreResult};
use crate::models::attempt::{Attempt, AttemptStatus};
use crate::models::exam_config::ExamConfig;
use crate::models::question::{self, SetId};

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_secs(3);
const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(1);

/// Answer edits are coalesced until the attempt has been quiet this long.
const AUTOSAVE_QUIET: Duration = Duration::from_secs(1);

/// Lifecycle phase of a live attempt. "Not started" is the absence of a
/// session; `Submitted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    InProgress,
    Locked,
    Submitted,
}

/// What caused a submission; used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    TimeExpired,
    ExamClosed,
}

impl fmt::Display for SubmitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubmitTrigger::Manual => "manual submission",
            SubmitTrigger::TimeExpired => "timer expired",
            SubmitTrigger::ExamClosed => "exam closed by admin",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug)]
pub enum SessionError {
    /// The attempt is locked and needs the admin reset code first.
    Locked,
    /// The attempt has already been submitted.
    NotInProgress,
    /// Question or option index outside the question set.
    AnswerOutOfRange,
    Db(sqlx::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Locked => write!(f, "attempt is locked"),
            SessionError::NotInProgress => write!(f, "attempt is not in progress"),
            SessionError::AnswerOutOfRange => write!(f, "answer index out of range"),
            SessionError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        SessionError::Db(err)
    }
}

/// Result of feeding a raw signal to a live attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    /// The signal became an actionable violation and locked the attempt.
    Locked { cheat_count: i64, reason: String },
    /// Debounced by the cooldown, dropped while locked/submitted, or below
    /// the movement hysteresis threshold.
    Ignored,
}

struct SessionState {
    phase: Phase,
    answers: Vec<i64>,
    time_remaining: i64,
    cheat_count: i64,
    dirty: bool,
    last_edit: Instant,
    aggregator: CheatAggregator,
    movement: MovementTracker,
}

/// One student's live attempt. Mutated from HTTP handlers and from the
/// driver task; the mutex is only ever held for short synchronous sections.
pub struct AttemptSession {
    pub id: String,
    set_id: SetId,
    state: Mutex<SessionState>,
    /// Single-flight guard: at most one submission runs to completion.
    submitting: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl AttemptSession {
    fn from_attempt(attempt: &Attempt) -> Self {
        let question_count = question::question_set(attempt.question_set).questions.len();
        let phase = match attempt.status {
            AttemptStatus::InProgress => Phase::InProgress,
            AttemptStatus::Submitted => Phase::Submitted,
        };
        let (shutdown, _) = watch::channel(false);
        Self {
            id: attempt.id.clone(),
            set_id: attempt.question_set,
            state: Mutex::new(SessionState {
                phase,
                // The bank may have changed since the row was written.
                answers: scoring::normalize_answers(&attempt.answers.0, question_count),
                time_remaining: attempt.time_remaining.max(0),
                cheat_count: attempt.cheat_count,
                dirty: false,
                last_edit: Instant::now(),
                aggregator: CheatAggregator::default(),
                movement: MovementTracker::default(),
            }),
            submitting: AtomicBool::new(false),
            shutdown,
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().unwrap().phase
    }

    /// Records one answer selection. Valid options are `0..options.len()`
    /// plus `-1` to clear the slot.
    pub fn record_answer(&self, question_index: usize, option_index: i64) -> Result<(), SessionError> {
        let set = question::question_set(self.set_id);
        let options_len = set
            .questions
            .get(question_index)
            .map(|q| q.options.len() as i64)
            .ok_or(SessionError::AnswerOutOfRange)?;
        if !(-1..options_len).contains(&option_index) {
            return Err(SessionError::AnswerOutOfRange);
        }

        let mut st = self.state.lock().unwrap();
        match st.phase {
            Phase::Locked => Err(SessionError::Locked),
            Phase::Submitted => Err(SessionError::NotInProgress),
            Phase::InProgress => {
                st.answers[question_index] = option_index;
                st.dirty = true;
                st.last_edit = Instant::now();
                Ok(())
            }
        }
    }

    /// Applies a PUT-style progress update (answers and/or remaining time).
    /// Permitted while locked, matching the original autosave behavior.
    pub fn apply_update(
        &self,
        answers: Option<&[i64]>,
        time_remaining: Option<i64>,
    ) -> Result<(), SessionError> {
        let question_count = question::question_set(self.set_id).questions.len();
        let mut st = self.state.lock().unwrap();
        if st.phase == Phase::Submitted {
            return Err(SessionError::NotInProgress);
        }
        if let Some(answers) = answers {
            st.answers = scoring::normalize_answers(answers, question_count);
        }
        if let Some(time_remaining) = time_remaining {
            st.time_remaining = time_remaining.max(0);
        }
        st.dirty = true;
        st.last_edit = Instant::now();
        Ok(())
    }

    /// Feeds one raw cheat signal through the aggregator. On an actionable
    /// violation the cheat flags are persisted before the in-memory
    /// transition, so a write failure leaves the attempt unlocked.
    pub async fn report_signal(
        &self,
        pool: &SqlitePool,
        kind: SignalKind,
    ) -> Result<SignalOutcome, SessionError> {
        let (violation, new_count) = {
            let mut st = self.state.lock().unwrap();
            if st.phase != Phase::InProgress {
                return Ok(SignalOutcome::Ignored);
            }
            match st.aggregator.observe(kind) {
                Some(violation) => {
                    let count = st.cheat_count + 1;
                    (violation, count)
                }
                None => return Ok(SignalOutcome::Ignored),
            }
        };

        sqlx::query("UPDATE attempts SET cheated = 1, cheat_count = ? WHERE id = ?")
            .bind(new_count)
            .bind(&self.id)
            .execute(pool)
            .await?;

        {
            let mut st = self.state.lock().unwrap();
            st.phase = Phase::Locked;
            st.cheat_count = new_count;
        }
        tracing::warn!(
            "Attempt {} locked (violation {}): {}",
            self.id,
            new_count,
            violation.reason
        );
        Ok(SignalOutcome::Locked {
            cheat_count: new_count,
            reason: violation.reason,
        })
    }

    /// Runs a camera frame's detections through the movement hysteresis and
    /// the aggregator.
    pub async fn report_detections(
        &self,
        pool: &SqlitePool,
        objects: &[DetectedObject],
    ) -> Result<SignalOutcome, SessionError> {
        let kind = {
            let mut st = self.state.lock().unwrap();
            if st.phase != Phase::InProgress {
                return Ok(SignalOutcome::Ignored);
            }
            analyze_frame(objects, &mut st.movement)
        };
        match kind {
            Some(kind) => self.report_signal(pool, kind).await,
            None => Ok(SignalOutcome::Ignored),
        }
    }

    /// Student-side unlock after the correct reset code was presented.
    /// Keeps `cheated`/`cheat_count` untouched; they are the audit trail.
    pub fn unlock(&self) -> Result<(), SessionError> {
        let mut st = self.state.lock().unwrap();
        match st.phase {
            Phase::Locked => {
                st.phase = Phase::InProgress;
                st.aggregator.reset();
                st.movement.reset();
                Ok(())
            }
            // Already running; nothing to do.
            Phase::InProgress => Ok(()),
            Phase::Submitted => Err(SessionError::NotInProgress),
        }
    }

    /// Admin force-unlock: clears the in-memory cheat state entirely. The
    /// corresponding row update and audit log entry are the caller's job.
    pub fn force_unlock(&self) {
        let mut st = self.state.lock().unwrap();
        if st.phase == Phase::Submitted {
            return;
        }
        st.phase = Phase::InProgress;
        st.cheat_count = 0;
        st.aggregator.reset();
        st.movement.reset();
    }

    /// One countdown tick. Returns true when the timer has reached zero and
    /// the attempt should auto-submit. Suspended while locked.
    fn countdown_tick(&self) -> bool {
        let mut st = self.state.lock().unwrap();
        if st.phase != Phase::InProgress {
            return false;
        }
        if st.time_remaining > 0 {
            st.time_remaining -= 1;
            st.dirty = true;
        }
        st.time_remaining == 0
    }

    /// Immediate write-through of the live progress fields, used by the bulk
    /// update endpoint so the response reflects what was just written.
    pub async fn flush(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        let (answers, time_remaining, marker) = {
            let st = self.state.lock().unwrap();
            if st.phase == Phase::Submitted {
                return Ok(());
            }
            (st.answers.clone(), st.time_remaining, st.last_edit)
        };

        sqlx::query(
            "UPDATE attempts SET answers = ?, time_remaining = ? \
             WHERE id = ? AND status = 'in-progress'",
        )
        .bind(Json(&answers))
        .bind(time_remaining)
        .bind(&self.id)
        .execute(pool)
        .await?;

        let mut st = self.state.lock().unwrap();
        if st.last_edit == marker {
            st.dirty = false;
        }
        Ok(())
    }

    /// Debounced autosave: persists answers and remaining time once the
    /// session has been quiet for a moment. Best-effort; failures are
    /// retried on the next tick.
    async fn flush_if_dirty(&self, pool: &SqlitePool) -> Result<bool, sqlx::Error> {
        let (answers, time_remaining, marker) = {
            let st = self.state.lock().unwrap();
            if st.phase == Phase::Submitted || !st.dirty {
                return Ok(false);
            }
            if st.last_edit.elapsed() < AUTOSAVE_QUIET {
                return Ok(false);
            }
            (st.answers.clone(), st.time_remaining, st.last_edit)
        };

        sqlx::query(
            "UPDATE attempts SET answers = ?, time_remaining = ? \
             WHERE id = ? AND status = 'in-progress'",
        )
        .bind(Json(&answers))
        .bind(time_remaining)
        .bind(&self.id)
        .execute(pool)
        .await?;

        let mut st = self.state.lock().unwrap();
        // Only mark clean if no edit raced with the write.
        if st.last_edit == marker {
            st.dirty = false;
        }
        Ok(true)
    }

    /// Finalizes the attempt: scores the answers, writes the terminal record
    /// in one update, and tears down every periodic task.
    ///
    /// Idempotent under concurrent triggers: the single-flight guard makes
    /// every call after the first a silent no-op (`Ok(None)`). A failed
    /// write releases the guard so a later trigger can retry.
    pub async fn submit(
        &self,
        pool: &SqlitePool,
        manager: &SessionManager,
        trigger: SubmitTrigger,
    ) -> Result<Option<ScoreResult>, SessionError> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }

        let (answers, time_remaining) = {
            let st = self.state.lock().unwrap();
            match st.phase {
                Phase::Submitted => return Ok(None),
                Phase::Locked => {
                    self.submitting.store(false, Ordering::Release);
                    return Err(SessionError::Locked);
                }
                Phase::InProgress => (st.answers.clone(), st.time_remaining),
            }
        };

        let set = question::question_set(self.set_id);
        let answers = scoring::normalize_answers(&answers, set.questions.len());
        let result = scoring::score_attempt(set, &answers);

        let write = sqlx::query(
            "UPDATE attempts SET responses = ?, answers = ?, score = ?, \
             total_questions = ?, status = ?, ended_at = ?, time_remaining = ? \
             WHERE id = ?",
        )
        .bind(Json(&result.responses))
        .bind(Json(&answers))
        .bind(result.score)
        .bind(result.total_questions)
        .bind(AttemptStatus::Submitted)
        .bind(Utc::now())
        .bind(time_remaining)
        .bind(&self.id)
        .execute(pool)
        .await;

        match write {
            Ok(_) => {
                {
                    let mut st = self.state.lock().unwrap();
                    st.phase = Phase::Submitted;
                    st.dirty = false;
                }
                let _ = self.shutdown.send(true);
                manager.detach(&self.id);
                tracing::info!(
                    "Attempt {} submitted ({}): score {}/{}",
                    self.id,
                    trigger,
                    result.score,
                    result.total_questions
                );
                Ok(Some(result))
            }
            Err(err) => {
                self.submitting.store(false, Ordering::Release);
                Err(SessionError::Db(err))
            }
        }
    }
}

/// Registry of live sessions, shared through `AppState`.
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Arc<AttemptSession>>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<AttemptSession>> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    /// Returns the live session for an attempt, creating one (with its
    /// driver task) from the persisted row if needed, e.g. after a server
    /// restart mid-attempt. Submitted attempts get no driver.
    pub fn resume(self: &Arc<Self>, pool: SqlitePool, attempt: &Attempt) -> Arc<AttemptSession> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get(&attempt.id) {
            return session.clone();
        }

        let session = Arc::new(AttemptSession::from_attempt(attempt));
        sessions.insert(attempt.id.clone(), session.clone());
        drop(sessions);

        if session.phase() != Phase::Submitted {
            let shutdown = session.shutdown.subscribe();
            tokio::spawn(drive(session.clone(), pool, Arc::clone(self), shutdown));
        }
        session
    }

    /// Drops the registry entry without signalling; used after a submission
    /// has already shut the driver down.
    fn detach(&self, id: &str) {
        self.sessions.lock().unwrap().remove(id);
    }

    /// Removes a session and cancels its driver (attempt deleted / page
    /// exit). No periodic task fires after this returns the entry.
    pub fn remove(&self, id: &str) {
        if let Some(session) = self.sessions.lock().unwrap().remove(id) {
            let _ = session.shutdown.send(true);
        }
    }

    /// Tears down every live session (admin "clear all history").
    pub fn clear(&self) {
        let mut sessions = self.sessions.lock().unwrap();
        for (_, session) in sessions.drain() {
            let _ = session.shutdown.send(true);
        }
    }
}

/// Driver task: owns the three periodic jobs for one session and exits on
/// shutdown. Auto-submit failures are logged and retried on a later tick.
async fn drive(
    session: Arc<AttemptSession>,
    pool: SqlitePool,
    manager: Arc<SessionManager>,
    mut shutdown: watch::Receiver<bool>,
) {
    let start = Instant::now();
    let mut tick = interval_at(start + TICK_INTERVAL, TICK_INTERVAL);
    let mut poll = interval_at(start + POLL_INTERVAL, POLL_INTERVAL);
    let mut autosave = interval_at(start + AUTOSAVE_INTERVAL, AUTOSAVE_INTERVAL);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if session.countdown_tick() {
                    match session.submit(&pool, &manager, SubmitTrigger::TimeExpired).await {
                        Ok(_) => break,
                        Err(err) => {
                            tracing::warn!("Auto-submit after timer expiry failed, will retry: {}", err);
                        }
                    }
                }
            }
            _ = poll.tick() => {
                if session.phase() != Phase::InProgress {
                    continue;
                }
                match ExamConfig::fetch_or_init(&pool).await {
                    Ok(config) if !config.exam_open => {
                        match session.submit(&pool, &manager, SubmitTrigger::ExamClosed).await {
                            Ok(_) => break,
                            Err(err) => {
                                tracing::warn!("Auto-submit after exam close failed, will retry: {}", err);
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!("Exam window poll failed: {}", err),
                }
            }
            _ = autosave.tick() => {
                if let Err(err) = session.flush_if_dirty(&pool).await {
                    tracing::warn!("Autosave failed, will retry: {}", err);
                }
            }
        }
    }
}
