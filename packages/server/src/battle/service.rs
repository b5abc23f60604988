use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use common::judge_job::TestCaseData;
use common::{RelayEventType, Verdict};
use rand::seq::IndexedRandom;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use worker::{SandboxExecutor, judge_test_cases};

use super::matchmaking::{DifficultyPreference, MatchedPair, MatchmakingPool, QueueEntry};
use super::rating::{apply_transfer, rating_delta};
use super::session::{BattleSession, Player, Side, SubmissionResult};
use super::BattleError;
use crate::config::BattleConfig;
use crate::entity::battle::BattleStatus;
use crate::entity::problem::Difficulty;
use crate::relay::Relay;
use crate::store::{BattleRecord, RatingTransfer, Store};

/// Battle state as returned by the API: the persisted row, overlaid with the
/// live session while it is still running.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BattleView {
    #[serde(flatten)]
    pub battle: BattleRecord,
    /// True while the session is held in memory.
    pub live: bool,
    /// Seconds since start, for active sessions.
    pub elapsed_secs: Option<f64>,
}

/// Verdict summary returned to the submitting player.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSummary {
    pub battle_id: Uuid,
    pub verdict: Verdict,
    pub output: String,
    pub time_secs: f64,
    pub cases_run: usize,
}

#[derive(Clone, Copy, Debug)]
enum TimerKind {
    Countdown,
    Session,
    Grace,
}

enum Finish {
    Resolve,
    Forfeit(Side),
}

struct LiveSession {
    session: BattleSession,
    /// Bumped whenever the timer is replaced; stale wake-ups compare unequal.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    store: Arc<dyn Store>,
    relay: Arc<Relay>,
    executor: Arc<SandboxExecutor>,
    config: BattleConfig,
    pool: Mutex<MatchmakingPool>,
    sessions: Mutex<HashMap<Uuid, LiveSession>>,
}

/// Owns the matchmaking pool and every live battle session.
#[derive(Clone)]
pub struct BattleService {
    inner: Arc<Inner>,
}

impl BattleService {
    pub fn new(
        store: Arc<dyn Store>,
        relay: Arc<Relay>,
        executor: Arc<SandboxExecutor>,
        config: BattleConfig,
    ) -> Self {
        let pool = MatchmakingPool::new(config.base_tolerance, config.tolerance_growth_per_sec);
        Self {
            inner: Arc::new(Inner {
                store,
                relay,
                executor,
                config,
                pool: Mutex::new(pool),
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn pool(&self) -> MutexGuard<'_, MatchmakingPool> {
        self.inner
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, LiveSession>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, user_id: i32, event_type: RelayEventType, payload: Value) {
        self.inner.relay.send_to(user_id, event_type, payload);
    }

    pub fn queue_len(&self) -> usize {
        self.pool().len()
    }

    pub fn is_queued(&self, user_id: i32) -> bool {
        self.pool().contains(user_id)
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions().len()
    }

    fn in_session(&self, user_id: i32) -> bool {
        self.sessions()
            .values()
            .any(|live| live.session.has_player(user_id))
    }

    /// Error for an id with no live session: finished if it was ever persisted.
    async fn missing_session(&self, battle_id: Uuid) -> BattleError {
        match self.inner.store.find_battle(battle_id).await {
            Ok(Some(_)) => BattleError::Finished,
            Ok(None) => BattleError::NotFound,
            Err(e) => BattleError::Store(e),
        }
    }

    /// Puts the user in the waiting pool, replacing an earlier entry, and runs
    /// a matchmaking pass.
    #[instrument(skip(self))]
    pub async fn join_queue(
        &self,
        user_id: i32,
        preference: DifficultyPreference,
    ) -> Result<(), BattleError> {
        let user = self
            .inner
            .store
            .find_user(user_id)
            .await?
            .ok_or(BattleError::UnknownUser(user_id))?;

        if self.in_session(user_id) {
            return Err(BattleError::InBattle);
        }

        let queue_size = {
            let mut pool = self.pool();
            if pool.join(QueueEntry {
                user_id,
                username: user.username,
                rating: user.rating,
                preference,
                enqueued_at: Instant::now(),
            }) {
                debug!("Replaced previous queue entry");
            }
            pool.len()
        };

        self.send(
            user_id,
            RelayEventType::BattleSearching,
            json!({
                "difficulty": preference,
                "rating": user.rating,
                "queueSize": queue_size,
            }),
        );

        self.run_matchmaking().await;
        Ok(())
    }

    /// Removes the user from the waiting pool. Returns whether an entry existed.
    pub fn leave_queue(&self, user_id: i32) -> bool {
        let removed = self.pool().leave(user_id);
        self.send(
            user_id,
            RelayEventType::BattleQueueLeft,
            json!({ "removed": removed }),
        );
        removed
    }

    /// Socket went away: drop the pool entry. Matched users are unaffected.
    pub fn on_disconnect(&self, user_id: i32) {
        if self.pool().leave(user_id) {
            debug!(user_id, "Removed disconnected user from queue");
        }
    }

    /// Forwards a typing heartbeat to the opponent.
    pub fn typing(&self, battle_id: Uuid, user_id: i32, line_count: u32, language: &str) {
        let opponent = {
            let sessions = self.sessions();
            sessions.get(&battle_id).and_then(|live| {
                let side = live.session.side_of(user_id)?;
                (live.session.status() == BattleStatus::Active)
                    .then(|| live.session.player(side.other()).user_id)
            })
        };

        if let Some(opponent) = opponent {
            self.send(
                opponent,
                RelayEventType::BattleOpponentTyping,
                json!({
                    "battleId": battle_id,
                    "lineCount": line_count,
                    "language": language,
                }),
            );
        }
    }

    #[instrument(skip(self))]
    pub async fn forfeit(&self, battle_id: Uuid, user_id: i32) -> Result<(), BattleError> {
        let side = {
            let sessions = self.sessions();
            sessions
                .get(&battle_id)
                .map(|live| live.session.side_of(user_id))
        };
        let side = match side {
            Some(Some(side)) => side,
            Some(None) => return Err(BattleError::NotParticipant),
            None => return Err(self.missing_session(battle_id).await),
        };

        info!("Player forfeited");
        self.finish(battle_id, Finish::Forfeit(side)).await;
        Ok(())
    }

    /// Judges one side's single submission inline against the battle's test
    /// cases and records the verdict.
    #[instrument(skip(self, code))]
    pub async fn submit(
        &self,
        battle_id: Uuid,
        user_id: i32,
        code: String,
        language: String,
    ) -> Result<SubmitSummary, BattleError> {
        let reserved: Option<Result<(Side, Vec<TestCaseData>), BattleError>> = {
            let mut sessions = self.sessions();
            sessions.get_mut(&battle_id).map(|live| {
                let side = live
                    .session
                    .side_of(user_id)
                    .ok_or(BattleError::NotParticipant)?;
                live.session.reserve(side)?;
                Ok((side, live.session.test_cases.clone()))
            })
        };
        let (side, test_cases) = match reserved {
            Some(reserved) => reserved?,
            None => return Err(self.missing_session(battle_id).await),
        };

        let outcome = match judge_test_cases(
            &self.inner.executor,
            &code,
            &language,
            &test_cases,
            None,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Battle judging failed, releasing slot");
                if let Some(live) = self.sessions().get_mut(&battle_id) {
                    live.session.release(side);
                }
                return Err(e.into());
            }
        };

        let recorded = {
            let mut sessions = self.sessions();
            sessions.get_mut(&battle_id).map(|live| {
                let time_secs = live.session.elapsed_secs();
                live.session.record(
                    side,
                    SubmissionResult {
                        verdict: outcome.verdict,
                        time_secs,
                        code,
                        language,
                    },
                );
                let done = live.session.both_submitted();
                if !done && live.session.should_start_grace(side) {
                    let grace = Duration::from_secs(self.inner.config.grace_secs)
                        .min(live.session.remaining());
                    self.arm_timer(live, TimerKind::Grace, grace);
                }
                (live.session.player(side.other()).user_id, time_secs, done)
            })
        };
        let Some((opponent_id, time_secs, done)) = recorded else {
            return Err(BattleError::Finished);
        };

        info!(verdict = %outcome.verdict, time_secs, "Battle submission judged");

        let summary = SubmitSummary {
            battle_id,
            verdict: outcome.verdict,
            output: outcome.output,
            time_secs,
            cases_run: outcome.cases_run,
        };
        self.send(
            user_id,
            RelayEventType::BattleSubmissionResult,
            json!(summary),
        );
        self.send(
            opponent_id,
            RelayEventType::BattleOpponentSubmitted,
            json!({ "battleId": battle_id, "verdict": summary.verdict }),
        );

        if done {
            self.finish(battle_id, Finish::Resolve).await;
        }
        Ok(summary)
    }

    /// Live view if the session is running, otherwise the persisted row.
    pub async fn get_battle(&self, battle_id: Uuid) -> Result<BattleView, BattleError> {
        let live = {
            let sessions = self.sessions();
            sessions.get(&battle_id).map(|live| BattleView {
                battle: live.session.snapshot(),
                live: true,
                elapsed_secs: (live.session.status() == BattleStatus::Active)
                    .then(|| live.session.elapsed_secs()),
            })
        };
        if let Some(view) = live {
            return Ok(view);
        }

        self.inner
            .store
            .find_battle(battle_id)
            .await?
            .map(|battle| BattleView {
                battle,
                live: false,
                elapsed_secs: None,
            })
            .ok_or(BattleError::NotFound)
    }

    /// One matchmaking pass: pairs at most one couple. Returns whether a
    /// match was made.
    pub async fn run_matchmaking(&self) -> bool {
        let pair = self.pool().take_pair(Instant::now());
        let Some(pair) = pair else {
            return false;
        };
        self.start_match(pair).await;
        true
    }

    /// Periodic matchmaking so waiting players get re-scanned as their
    /// tolerance widens.
    pub fn spawn_matchmaking_loop(&self) -> JoinHandle<()> {
        let service = self.clone();
        let period = Duration::from_millis(self.inner.config.tick_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                service.run_matchmaking().await;
                service.inner.relay.prune();
            }
        })
    }

    fn notify_error(&self, users: [i32; 2], message: &str) {
        for user_id in users {
            self.send(
                user_id,
                RelayEventType::BattleError,
                json!({ "message": message }),
            );
        }
    }

    #[instrument(skip_all, fields(player1 = pair.first.user_id, player2 = pair.second.user_id))]
    async fn start_match(&self, pair: MatchedPair) {
        let users = [pair.first.user_id, pair.second.user_id];
        let difficulty = pair.difficulty.unwrap_or_else(|| {
            [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or(Difficulty::Easy)
        });

        let problem = match self.inner.store.random_problem(difficulty).await {
            Ok(Some(problem)) => problem,
            Ok(None) => {
                warn!("No problems available for battle");
                self.notify_error(users, "No problems available");
                return;
            }
            Err(e) => {
                error!(error = %e, "Failed to pick battle problem");
                self.notify_error(users, "Failed to start battle");
                return;
            }
        };

        let test_cases = match self.inner.store.test_cases(problem.id).await {
            Ok(cases) => cases,
            Err(e) => {
                error!(problem_id = problem.id, error = %e, "Failed to load test cases");
                self.notify_error(users, "Failed to start battle");
                return;
            }
        };

        let session = BattleSession::new(
            problem,
            test_cases,
            Player::new(pair.first.user_id, pair.first.username, pair.first.rating),
            Player::new(pair.second.user_id, pair.second.username, pair.second.rating),
            self.inner.config.time_limit_secs,
        );

        if session.test_cases.is_empty() {
            warn!(battle_id = %session.id, "Battle problem has no test cases, cancelling");
            if let Err(e) = self.inner.store.create_battle(&session.cancelled_record()).await {
                error!(error = %e, "Failed to persist cancelled battle");
            }
            self.notify_error(users, "Battle problem has no test cases");
            return;
        }

        if let Err(e) = self.inner.store.create_battle(&session.snapshot()).await {
            error!(error = %e, "Failed to persist battle");
            self.notify_error(users, "Failed to start battle");
            return;
        }

        let battle_id = session.id;
        let countdown = self.inner.config.countdown_secs;
        for side in [Side::One, Side::Two] {
            let you = session.player(side);
            let opponent = session.player(side.other());
            self.send(
                you.user_id,
                RelayEventType::BattleFound,
                json!({
                    "battleId": battle_id,
                    "problem": {
                        "id": session.problem.id,
                        "title": session.problem.title,
                        "statement": session.problem.statement,
                        "difficulty": session.problem.difficulty,
                    },
                    "opponent": {
                        "userId": opponent.user_id,
                        "username": opponent.username,
                        "rating": opponent.rating,
                    },
                    "you": {
                        "userId": you.user_id,
                        "username": you.username,
                        "rating": you.rating,
                    },
                    "startsIn": countdown,
                    "timeLimit": session.time_limit_secs,
                }),
            );
        }

        info!(%battle_id, ?difficulty, "Battle matched");

        let mut sessions = self.sessions();
        let live = sessions.entry(battle_id).or_insert(LiveSession {
            session,
            generation: 0,
            timer: None,
        });
        self.arm_timer(live, TimerKind::Countdown, Duration::from_secs(countdown));
    }

    /// Replaces the session's timer. Callers hold the sessions lock.
    fn arm_timer(&self, live: &mut LiveSession, kind: TimerKind, delay: Duration) {
        live.generation += 1;
        if let Some(previous) = live.timer.take() {
            previous.abort();
        }

        let service = self.clone();
        let battle_id = live.session.id;
        let generation = live.generation;
        live.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            service.on_timer(battle_id, generation, kind).await;
        }));
    }

    async fn on_timer(&self, battle_id: Uuid, generation: u64, kind: TimerKind) {
        let started = {
            let mut sessions = self.sessions();
            let Some(live) = sessions.get_mut(&battle_id) else {
                return;
            };
            if live.generation != generation {
                debug!(%battle_id, ?kind, "Stale timer, ignoring");
                return;
            }
            // This task is the current timer; detach rather than abort itself.
            live.timer = None;

            match kind {
                TimerKind::Countdown => {
                    live.session.activate();
                    let limit = Duration::from_secs(live.session.time_limit_secs);
                    self.arm_timer(live, TimerKind::Session, limit);
                    Some((
                        [
                            live.session.player(Side::One).user_id,
                            live.session.player(Side::Two).user_id,
                        ],
                        live.session.started_at(),
                    ))
                }
                TimerKind::Session | TimerKind::Grace => None,
            }
        };

        match started {
            Some((users, started_at)) => {
                info!(%battle_id, "Battle started");
                for user_id in users {
                    self.send(
                        user_id,
                        RelayEventType::BattleStart,
                        json!({ "battleId": battle_id, "startedAt": started_at }),
                    );
                }
            }
            None => {
                debug!(%battle_id, ?kind, "Battle time is up");
                self.finish(battle_id, Finish::Resolve).await;
            }
        }
    }

    async fn current_rating(&self, player: &Player) -> i32 {
        match self.inner.store.find_user(player.user_id).await {
            Ok(Some(user)) => user.rating,
            Ok(None) => player.rating,
            Err(e) => {
                warn!(user_id = player.user_id, error = %e, "Falling back to queued rating");
                player.rating
            }
        }
    }

    /// Resolves, persists and announces the battle. Only the caller that
    /// evicts the session does any of this.
    async fn finish(&self, battle_id: Uuid, how: Finish) {
        let Some(live) = self.sessions().remove(&battle_id) else {
            return;
        };
        if let Some(timer) = live.timer {
            timer.abort();
        }
        let session = live.session;

        let resolution = match how {
            Finish::Resolve => session.resolve(),
            Finish::Forfeit(side) => BattleSession::forfeit(side),
        };

        let mut new_ratings = [session.player(Side::One).rating, session.player(Side::Two).rating];
        let (delta, transfer) = match resolution.winner {
            Some(side) => {
                let winner = session.player(side);
                let loser = session.player(side.other());
                let winner_rating = self.current_rating(winner).await;
                let loser_rating = self.current_rating(loser).await;
                let delta = rating_delta(winner_rating, loser_rating, self.inner.config.k_factor);
                let (w, l) = apply_transfer(winner_rating, loser_rating, delta);
                match side {
                    Side::One => new_ratings = [w, l],
                    Side::Two => new_ratings = [l, w],
                }
                (
                    delta,
                    Some(RatingTransfer {
                        winner_id: winner.user_id,
                        loser_id: loser.user_id,
                        delta,
                    }),
                )
            }
            None => (0, None),
        };

        let record = session.completed_record(resolution, delta);
        let users = [session.player(Side::One).user_id, session.player(Side::Two).user_id];
        if let Err(e) = self.inner.store.finalize_battle(&record, transfer).await {
            error!(%battle_id, error = %e, "Failed to persist battle result");
            for user_id in users {
                self.send(
                    user_id,
                    RelayEventType::BattleError,
                    json!({ "battleId": battle_id, "message": "Failed to save battle result" }),
                );
            }
            return;
        }

        info!(
            %battle_id,
            winner_id = record.winner_id,
            reason = ?resolution.reason,
            delta,
            "Battle finished"
        );

        for (user_id, rating) in users.into_iter().zip(new_ratings) {
            self.send(
                user_id,
                RelayEventType::BattleEnd,
                json!({
                    "battleId": battle_id,
                    "winnerId": record.winner_id,
                    "reason": resolution.reason,
                    "ratingDelta": delta,
                    "newRating": rating,
                    "player1": record.player1,
                    "player2": record.player2,
                }),
            );
        }
    }
}
