//! Quiz scoring and the reward transaction.
//!
//! Scoring is pure. Rewards are applied to the user's record in a single
//! store transaction whose body re-checks, against the freshly read record,
//! whether this quiz was already passed. Concurrent submissions of the same
//! passing attempt therefore credit the user once.

use mongodb::bson::Document;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::metrics::{record_badge_unlock, record_quiz_submission, record_reward_outcome};
use crate::models::{
    module::Module,
    now_timestamp,
    quiz::{PublicQuiz, Quiz, SubmitQuizResponse, SubmittedAnswer},
    user::{level_for_points, QuizAttemptRecord, User},
    Record, Stamped,
};
use crate::repository::{Entity, Repository};
use crate::store::{decode, encode, DocumentStore, StoreError, TxAction, TxOutcome};

use super::badge_rules::{AttemptContext, BadgeRuleSet};

/// Points credited for the first pass of a quiz.
pub const PASS_REWARD_POINTS: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.correct as f64 / self.total as f64
    }

    /// Percentage rounded to two decimals, as reported and recorded.
    pub fn rounded(&self) -> f64 {
        (self.percentage() * 100.0).round() / 100.0
    }

    /// Compares the exact ratio, so 2/3 never passes a 66.67 threshold.
    pub fn passes(&self, passing_score: f64) -> bool {
        self.total > 0 && (self.correct as f64) * 100.0 >= passing_score * self.total as f64
    }
}

/// Counts questions whose first submitted answer is the correct option.
/// Answers naming unknown questions are ignored.
pub fn score_answers(quiz: &Quiz, answers: &[SubmittedAnswer]) -> Score {
    let mut selected: HashMap<&str, &str> = HashMap::new();
    for answer in answers {
        selected
            .entry(answer.question_id.as_str())
            .or_insert(answer.selected_option.as_str());
    }

    let correct = quiz
        .questions
        .iter()
        .filter(|q| selected.get(q.question_id.as_str()) == Some(&q.correct_option.as_str()))
        .count();

    Score {
        correct,
        total: quiz.questions.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEffect {
    /// The quiz was already passed; nothing may change.
    Duplicate,
    /// Every allowed failed attempt is used up; nothing may change.
    LimitReached,
    /// A failed attempt was appended to the history.
    Recorded,
    /// First pass: history, module, points, level and badges updated.
    Rewarded,
}

/// Applies one graded attempt to a user record. A quiz keeps at most
/// `attempt_limit` failed entries and one passed entry per user.
pub fn apply_attempt(
    user: &mut User,
    attempt: QuizAttemptRecord,
    module_ref: &str,
    score: Score,
    attempt_limit: i64,
    rules: &BadgeRuleSet,
) -> AttemptEffect {
    if user.has_passed(&attempt.quiz_id) {
        return AttemptEffect::Duplicate;
    }
    let allowed = usize::try_from(attempt_limit.max(1)).unwrap_or(usize::MAX);
    if user.failed_attempts(&attempt.quiz_id) >= allowed {
        return AttemptEffect::LimitReached;
    }
    if !attempt.passed {
        user.quiz_scores.push(attempt);
        return AttemptEffect::Recorded;
    }

    user.completed_modules.insert(module_ref.to_string());
    user.quiz_scores.push(attempt);
    user.points += PASS_REWARD_POINTS;
    user.level = level_for_points(user.points);

    let ctx = AttemptContext {
        user: &*user,
        correct: score.correct,
        total: score.total,
    };
    let unlocked = rules.newly_unlocked(&ctx, &user.badges);
    user.badges.extend(unlocked);

    AttemptEffect::Rewarded
}

pub struct QuizService {
    store: Arc<dyn DocumentStore>,
    quizzes: Repository<Quiz>,
    modules: Repository<Module>,
    rules: Arc<BadgeRuleSet>,
}

impl QuizService {
    pub fn new(store: Arc<dyn DocumentStore>, rules: Arc<BadgeRuleSet>) -> Self {
        Self {
            quizzes: Repository::new(store.clone()),
            modules: Repository::new(store.clone()),
            store,
            rules,
        }
    }

    /// Looks a quiz up by store id, then by its logical `quiz_id`.
    pub async fn find_quiz(&self, quiz_ref: &str) -> AppResult<Record<Quiz>> {
        if let Some(quiz) = self.quizzes.find_by_id(quiz_ref).await? {
            return Ok(quiz);
        }
        self.quizzes
            .find_one_by("quiz_id", quiz_ref)
            .await?
            .ok_or_else(|| AppError::not_found("Quiz"))
    }

    pub async fn list_public(&self) -> AppResult<Vec<PublicQuiz>> {
        let quizzes = self.quizzes.find_all().await?;
        Ok(quizzes.into_iter().map(PublicQuiz::from).collect())
    }

    pub async fn get_public(&self, id: &str) -> AppResult<PublicQuiz> {
        Ok(self.quizzes.get(id).await?.into())
    }

    pub async fn get_public_by_quiz_id(&self, quiz_id: &str) -> AppResult<PublicQuiz> {
        self.quizzes
            .find_one_by("quiz_id", quiz_id)
            .await?
            .map(PublicQuiz::from)
            .ok_or_else(|| AppError::not_found("Quiz"))
    }

    pub async fn get_public_for_module(&self, module_id: &str) -> AppResult<PublicQuiz> {
        self.quizzes
            .find_one_by("module_id", module_id)
            .await?
            .map(PublicQuiz::from)
            .ok_or_else(|| AppError::NotFound("No quiz found for this module".to_string()))
    }

    /// Store id of the module a quiz belongs to. Quizzes may reference the
    /// module's logical id; when no module carries it the reference is used
    /// as is.
    pub async fn resolve_module_id(&self, module_ref: &str) -> AppResult<String> {
        let found = self.modules.find_one_by("module_id", module_ref).await?;
        Ok(found
            .map(|module| module.id)
            .unwrap_or_else(|| module_ref.to_string()))
    }

    pub async fn submit_quiz(
        &self,
        user_id: &str,
        quiz_ref: &str,
        answers: &[SubmittedAnswer],
    ) -> AppResult<SubmitQuizResponse> {
        let quiz = self.find_quiz(quiz_ref).await?;
        let score = score_answers(&quiz.data, answers);
        let passed = score.passes(quiz.data.passing_score);

        tracing::info!(
            "Quiz submission: user={}, quiz={}, correct={}/{}, passed={}",
            user_id,
            quiz.id,
            score.correct,
            score.total,
            passed
        );
        record_quiz_submission(passed);

        let module_ref = if passed {
            self.resolve_module_id(&quiz.data.module_id).await?
        } else {
            quiz.data.module_id.clone()
        };

        let attempt = QuizAttemptRecord {
            quiz_id: quiz.id.clone(),
            score: score.rounded(),
            passed,
            timestamp: now_timestamp(),
        };

        self.record_attempt(user_id, attempt, &module_ref, score, quiz.data.attempt_limit)
            .await?;

        Ok(SubmitQuizResponse {
            score: score.rounded(),
            passed,
            points_earned: if passed { PASS_REWARD_POINTS } else { 0 },
        })
    }

    async fn record_attempt(
        &self,
        user_id: &str,
        attempt: QuizAttemptRecord,
        module_ref: &str,
        score: Score,
        attempt_limit: i64,
    ) -> AppResult<()> {
        let passed = attempt.passed;
        let rules = self.rules.as_ref();
        let limit_reached = AtomicBool::new(false);

        let mutation = |before: &Document| -> Result<TxAction, StoreError> {
            let mut user: Stamped<User> = decode(before.clone())?;
            let effect = apply_attempt(
                &mut user.data,
                attempt.clone(),
                module_ref,
                score,
                attempt_limit,
                rules,
            );
            // A retried transaction must not keep the flag of an earlier run
            limit_reached.store(effect == AttemptEffect::LimitReached, Ordering::SeqCst);
            match effect {
                AttemptEffect::Duplicate | AttemptEffect::LimitReached => Ok(TxAction::Skip),
                AttemptEffect::Recorded | AttemptEffect::Rewarded => {
                    user.updated_at = attempt.timestamp.clone();
                    Ok(TxAction::Write(encode(&user)?))
                }
            }
        };

        let outcome = self
            .store
            .transact(User::COLLECTION, user_id, &mutation)
            .await?;

        match outcome {
            TxOutcome::Missing => {
                tracing::warn!("User {} vanished before the attempt was recorded", user_id);
                record_reward_outcome("user_missing");
            }
            TxOutcome::Unchanged if limit_reached.load(Ordering::SeqCst) => {
                tracing::info!("User {} has no attempts left on this quiz", user_id);
                record_reward_outcome("limit_reached");
                return Err(AppError::Validation(
                    "Attempt limit reached for this quiz".to_string(),
                ));
            }
            TxOutcome::Unchanged => {
                tracing::info!("User {} already passed this quiz, no reward", user_id);
                record_reward_outcome("duplicate");
            }
            TxOutcome::Committed { before, after } if passed => {
                let before: Stamped<User> = decode(before)?;
                let after: Stamped<User> = decode(after)?;
                let unlocked: BTreeSet<&String> =
                    after.data.badges.difference(&before.data.badges).collect();
                for badge in &unlocked {
                    record_badge_unlock(badge);
                }
                tracing::info!(
                    "Rewarded user {}: points {} -> {}, badges unlocked: {:?}",
                    user_id,
                    before.data.points,
                    after.data.points,
                    unlocked
                );
                record_reward_outcome("applied");
            }
            TxOutcome::Committed { .. } => {
                record_reward_outcome("recorded");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::Question;
    use crate::models::user::{AgeGroup, Role, SportCategory};

    fn quiz(correct: &[&str], passing_score: f64) -> Quiz {
        Quiz {
            quiz_id: Some("quiz_001".into()),
            module_id: "module_001".into(),
            title: None,
            passing_score,
            attempt_limit: 3,
            questions: correct
                .iter()
                .enumerate()
                .map(|(i, c)| Question {
                    question_id: format!("q{}", i + 1),
                    question_text: "?".into(),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_option: c.to_string(),
                    explanation: String::new(),
                })
                .collect(),
        }
    }

    fn answer(question_id: &str, option: &str) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: question_id.into(),
            selected_option: option.into(),
        }
    }

    fn user() -> User {
        User {
            name: "Sonam".into(),
            email: "sonam@example.com".into(),
            password_hash: String::new(),
            points: 0,
            level: 1,
            rank: 0,
            sport: SportCategory::Athletics,
            age_group: AgeGroup::Under18,
            completed_modules: BTreeSet::new(),
            quiz_scores: Vec::new(),
            badges: BTreeSet::new(),
            role: Role::Student,
        }
    }

    fn attempt(quiz_id: &str, passed: bool) -> QuizAttemptRecord {
        QuizAttemptRecord {
            quiz_id: quiz_id.into(),
            score: if passed { 100.0 } else { 0.0 },
            passed,
            timestamp: now_timestamp(),
        }
    }

    #[test]
    fn two_of_three_is_a_rounded_fail_at_seventy() {
        let q = quiz(&["a", "b", "c"], 70.0);
        let score = score_answers(&q, &[answer("q1", "a"), answer("q2", "b"), answer("q3", "d")]);

        assert_eq!(score.rounded(), 66.67);
        assert!(!score.passes(q.passing_score));
    }

    #[test]
    fn exact_ratio_decides_pass() {
        let score = Score { correct: 2, total: 3 };
        assert!(!score.passes(66.67));
        assert!(score.passes(66.0));
        assert!(Score { correct: 0, total: 4 }.passes(0.0));
    }

    #[test]
    fn unknown_and_repeated_answers_do_not_inflate_the_score() {
        let q = quiz(&["a", "b"], 50.0);
        let score = score_answers(
            &q,
            &[
                answer("q1", "a"),
                answer("q1", "a"),
                answer("q9", "a"),
                answer("q2", "c"),
            ],
        );
        assert_eq!(score, Score { correct: 1, total: 2 });
        assert_eq!(score_answers(&q, &[]).percentage(), 0.0);
    }

    #[test]
    fn first_pass_rewards_points_module_and_perfect_badge() {
        let rules = BadgeRuleSet::standard();
        let mut u = user();

        let effect = apply_attempt(
            &mut u,
            attempt("quiz-doc", true),
            "module-doc",
            Score { correct: 4, total: 4 },
            3,
            &rules,
        );

        assert_eq!(effect, AttemptEffect::Rewarded);
        assert_eq!(u.points, PASS_REWARD_POINTS);
        assert!(u.completed_modules.contains("module-doc"));
        assert!(u.badges.contains("badge_002"));
        assert_eq!(u.quiz_scores.len(), 1);
    }

    #[test]
    fn repeat_pass_changes_nothing() {
        let rules = BadgeRuleSet::standard();
        let mut u = user();
        let score = Score { correct: 3, total: 4 };
        apply_attempt(&mut u, attempt("quiz-doc", true), "m", score, 3, &rules);
        let snapshot = (u.points, u.quiz_scores.len(), u.badges.clone());

        let effect = apply_attempt(&mut u, attempt("quiz-doc", true), "m", score, 3, &rules);

        assert_eq!(effect, AttemptEffect::Duplicate);
        assert_eq!((u.points, u.quiz_scores.len(), u.badges.clone()), snapshot);
    }

    #[test]
    fn failed_attempts_are_recorded_without_reward() {
        let rules = BadgeRuleSet::standard();
        let mut u = user();

        let effect = apply_attempt(
            &mut u,
            attempt("quiz-doc", false),
            "m",
            Score { correct: 0, total: 4 },
            3,
            &rules,
        );

        assert_eq!(effect, AttemptEffect::Recorded);
        assert_eq!(u.points, 0);
        assert!(u.completed_modules.is_empty());
        assert_eq!(u.quiz_scores.len(), 1);
    }

    #[test]
    fn level_follows_points_and_clean_sport_unlocks_on_fifth_module() {
        let rules = BadgeRuleSet::standard();
        let mut u = user();
        let score = Score { correct: 3, total: 4 };

        for i in 0..4 {
            let module = format!("m{}", i);
            apply_attempt(&mut u, attempt(&format!("quiz{}", i), true), &module, score, 3, &rules);
        }
        assert_eq!(u.points, 200);
        assert_eq!(u.level, 3);
        assert!(!u.badges.contains("badge_001"));

        apply_attempt(&mut u, attempt("quiz4", true), "m4", score, 3, &rules);
        assert!(u.badges.contains("badge_001"));
    }

    #[test]
    fn passing_a_quiz_for_an_already_completed_module_does_not_count_twice() {
        let rules = BadgeRuleSet::standard();
        let mut u = user();
        let score = Score { correct: 3, total: 4 };

        apply_attempt(&mut u, attempt("quiz-a", true), "shared-module", score, 3, &rules);
        apply_attempt(&mut u, attempt("quiz-b", true), "shared-module", score, 3, &rules);

        assert_eq!(u.completed_modules.len(), 1);
        assert_eq!(u.points, 2 * PASS_REWARD_POINTS);
    }

    #[test]
    fn failures_stop_at_the_attempt_limit() {
        let rules = BadgeRuleSet::standard();
        let mut u = user();
        let fail = Score { correct: 0, total: 4 };

        for _ in 0..2 {
            let effect = apply_attempt(&mut u, attempt("quiz-doc", false), "m", fail, 2, &rules);
            assert_eq!(effect, AttemptEffect::Recorded);
        }
        let effect = apply_attempt(&mut u, attempt("quiz-doc", false), "m", fail, 2, &rules);
        assert_eq!(effect, AttemptEffect::LimitReached);

        let pass = Score { correct: 4, total: 4 };
        let effect = apply_attempt(&mut u, attempt("quiz-doc", true), "m", pass, 2, &rules);
        assert_eq!(effect, AttemptEffect::LimitReached);
        assert_eq!(u.quiz_scores.len(), 2);
        assert_eq!(u.points, 0);

        // Other quizzes keep their own budget
        let effect = apply_attempt(&mut u, attempt("quiz-other", true), "m2", pass, 2, &rules);
        assert_eq!(effect, AttemptEffect::Rewarded);
    }

    #[test]
    fn attempts_after_a_pass_are_not_recorded() {
        let rules = BadgeRuleSet::standard();
        let mut u = user();
        let pass = Score { correct: 4, total: 4 };
        apply_attempt(&mut u, attempt("quiz-doc", true), "m", pass, 3, &rules);

        let fail = Score { correct: 0, total: 4 };
        let effect = apply_attempt(&mut u, attempt("quiz-doc", false), "m", fail, 3, &rules);

        assert_eq!(effect, AttemptEffect::Duplicate);
        assert_eq!(u.quiz_scores.len(), 1);
    }
}
