use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::{Answer, Interaction, InteractionKind};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A submission the learner must fix before it can be graded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IncompleteSubmission {
    #[error("nothing selected")]
    NothingSelected,

    #[error("unmatched items: {}", .0.join(", "))]
    UnmatchedItems(Vec<String>),

    #[error("ordering must contain every item exactly once")]
    IncompleteOrdering,
}

impl IncompleteSubmission {
    /// UI dictionary key of the localized validation message.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            IncompleteSubmission::NothingSelected => "selectError",
            IncompleteSubmission::UnmatchedItems(_) => "matchError",
            IncompleteSubmission::IncompleteOrdering => "sortError",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EvaluationError {
    #[error("{} pages do not accept answers", .0.as_str())]
    NotInteractive(InteractionKind),

    #[error("expected a {} answer, got {found}", .expected.as_str())]
    KindMismatch {
        expected: InteractionKind,
        found: &'static str,
    },

    #[error(transparent)]
    Incomplete(#[from] IncompleteSubmission),
}

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// Decides whether `answer` is correct for `interaction`.
///
/// # Errors
///
/// Returns `EvaluationError::NotInteractive` for pages without a question,
/// `EvaluationError::KindMismatch` when the answer shape does not fit the
/// page, and `EvaluationError::Incomplete` for submissions that cannot be
/// graded yet (nothing selected, unmatched items, partial ordering).
pub fn evaluate(interaction: &Interaction, answer: &Answer) -> Result<bool, EvaluationError> {
    match (interaction, answer) {
        (Interaction::SingleChoice { options }, Answer::Single(id)) => {
            if id.trim().is_empty() {
                return Err(IncompleteSubmission::NothingSelected.into());
            }
            Ok(options.iter().any(|o| o.is_correct && o.id == *id))
        }
        (Interaction::MultiChoice { options }, Answer::Multiple(ids)) => {
            if ids.is_empty() {
                return Err(IncompleteSubmission::NothingSelected.into());
            }
            let correct: BTreeSet<&str> = options
                .iter()
                .filter(|o| o.is_correct)
                .map(|o| o.id.as_str())
                .collect();
            let submitted: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
            Ok(correct == submitted)
        }
        (Interaction::Matching { pairs }, Answer::Matching(assigned)) => {
            let unmatched: Vec<String> = pairs
                .iter()
                .filter(|p| assigned.get(&p.id).is_none_or(|r| r.trim().is_empty()))
                .map(|p| p.id.clone())
                .collect();
            if !unmatched.is_empty() {
                return Err(IncompleteSubmission::UnmatchedItems(unmatched).into());
            }
            Ok(pairs.iter().all(|p| assigned.get(&p.id) == Some(&p.id)))
        }
        (Interaction::Slider(spec), Answer::Slider(value)) => {
            if !value.is_finite() {
                return Err(IncompleteSubmission::NothingSelected.into());
            }
            Ok((value - spec.correct_value).abs() < spec.step / 2.0)
        }
        (Interaction::Ordering { items }, Answer::Ordering(order)) => {
            let expected: BTreeSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
            let submitted: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            if order.len() != items.len() || expected != submitted {
                return Err(IncompleteSubmission::IncompleteOrdering.into());
            }
            Ok(items.iter().zip(order).all(|(item, id)| item.id == *id))
        }
        (other, answer) if other.kind().is_question() => Err(EvaluationError::KindMismatch {
            expected: other.kind(),
            found: answer.kind_name(),
        }),
        (other, _) => Err(EvaluationError::NotInteractive(other.kind())),
    }
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

/// Stars for a correct answer on the given (1-based) attempt.
#[must_use]
pub fn star_award(attempt: u32, is_correct: bool) -> u8 {
    match (is_correct, attempt) {
        (false, _) => 0,
        (true, 0 | 1) => 3,
        (true, 2) => 2,
        (true, _) => 1,
    }
}

/// Page facts that decide how a submission is graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingContext {
    pub attempts_allowed: u32,
    pub is_assessment: bool,
    pub awards_stars: bool,
}

/// Outcome of one graded submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grade {
    /// 1-based attempt number of this submission.
    pub attempt: u32,
    pub is_correct: bool,
    pub is_complete: bool,
    pub stars: u8,
    pub can_retry: bool,
}

impl Grade {
    #[must_use]
    pub fn attempts_remaining(&self, attempts_allowed: u32) -> u32 {
        attempts_allowed.saturating_sub(self.attempt)
    }
}

/// Applies attempt accounting and gamification to an evaluated answer.
///
/// Assessment pages complete on their first submission and never retry.
/// Elsewhere a page completes when correct or out of attempts.
#[must_use]
pub fn grade(context: GradingContext, previous_attempts: u32, is_correct: bool) -> Grade {
    let attempt = previous_attempts.saturating_add(1);
    let is_complete =
        context.is_assessment || is_correct || attempt >= context.attempts_allowed;
    let stars = if context.awards_stars && !context.is_assessment {
        star_award(attempt, is_correct)
    } else {
        0
    };

    Grade {
        attempt,
        is_correct,
        is_complete,
        stars,
        can_retry: !is_complete,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChoiceOption, MatchingPair, SliderSpec, SortingItem};
    use std::collections::BTreeMap;

    fn options(correct: &[&str], all: &[&str]) -> Vec<ChoiceOption> {
        all.iter()
            .map(|id| ChoiceOption {
                id: (*id).into(),
                text: id.to_uppercase(),
                is_correct: correct.contains(id),
            })
            .collect()
    }

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    const PRACTICE: GradingContext = GradingContext {
        attempts_allowed: 3,
        is_assessment: false,
        awards_stars: true,
    };

    #[test]
    fn single_choice_matches_flagged_option() {
        let page = Interaction::SingleChoice {
            options: options(&["b"], &["a", "b"]),
        };
        assert!(!evaluate(&page, &Answer::Single("a".into())).unwrap());
        assert!(evaluate(&page, &Answer::Single("b".into())).unwrap());
        assert_eq!(
            evaluate(&page, &Answer::Single(String::new())),
            Err(EvaluationError::Incomplete(IncompleteSubmission::NothingSelected))
        );
    }

    #[test]
    fn multi_choice_needs_exact_set() {
        let page = Interaction::MultiChoice {
            options: options(&["a", "c"], &["a", "b", "c"]),
        };
        assert!(evaluate(&page, &Answer::Multiple(ids(&["a", "c"]))).unwrap());
        assert!(!evaluate(&page, &Answer::Multiple(ids(&["a", "b", "c"]))).unwrap());
        assert!(!evaluate(&page, &Answer::Multiple(ids(&["a"]))).unwrap());
    }

    #[test]
    fn matching_rejects_unassigned_left_items() {
        let pairs = ["m1", "m2", "m3"]
            .iter()
            .map(|id| MatchingPair {
                id: (*id).into(),
                left: format!("left {id}"),
                right: format!("right {id}"),
            })
            .collect();
        let page = Interaction::Matching { pairs };

        let partial = BTreeMap::from([("m1".to_owned(), "m1".to_owned())]);
        let err = evaluate(&page, &Answer::Matching(partial)).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::Incomplete(IncompleteSubmission::UnmatchedItems(vec![
                "m2".into(),
                "m3".into()
            ]))
        );
        assert_eq!(
            IncompleteSubmission::UnmatchedItems(Vec::new()).message_key(),
            "matchError"
        );

        let right: BTreeMap<_, _> = ["m1", "m2", "m3"]
            .iter()
            .map(|id| ((*id).to_owned(), (*id).to_owned()))
            .collect();
        assert!(evaluate(&page, &Answer::Matching(right)).unwrap());

        let crossed = BTreeMap::from([
            ("m1".to_owned(), "m2".to_owned()),
            ("m2".to_owned(), "m1".to_owned()),
            ("m3".to_owned(), "m3".to_owned()),
        ]);
        assert!(!evaluate(&page, &Answer::Matching(crossed)).unwrap());
    }

    #[test]
    fn slider_tolerance_is_half_a_step() {
        let page = Interaction::Slider(SliderSpec {
            min: 0.0,
            max: 100.0,
            step: 10.0,
            correct_value: 50.0,
            unit: "%".into(),
        });
        assert!(evaluate(&page, &Answer::Slider(50.0)).unwrap());
        assert!(evaluate(&page, &Answer::Slider(54.9)).unwrap());
        assert!(!evaluate(&page, &Answer::Slider(55.0)).unwrap());
        assert!(!evaluate(&page, &Answer::Slider(60.0)).unwrap());
    }

    #[test]
    fn ordering_compares_element_by_element() {
        let items = ["s1", "s2", "s3", "s4"]
            .iter()
            .map(|id| SortingItem {
                id: (*id).into(),
                text: id.to_uppercase(),
            })
            .collect();
        let page = Interaction::Ordering { items };
        let order = |list: &[&str]| Answer::Ordering(list.iter().map(|s| (*s).into()).collect());

        assert!(evaluate(&page, &order(&["s1", "s2", "s3", "s4"])).unwrap());
        assert!(!evaluate(&page, &order(&["s1", "s3", "s2", "s4"])).unwrap());
        assert_eq!(
            evaluate(&page, &order(&["s1", "s2", "s3"])),
            Err(EvaluationError::Incomplete(
                IncompleteSubmission::IncompleteOrdering
            ))
        );
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        let page = Interaction::SingleChoice {
            options: options(&["a"], &["a", "b"]),
        };
        assert!(matches!(
            evaluate(&page, &Answer::Slider(1.0)),
            Err(EvaluationError::KindMismatch { found: "slider", .. })
        ));
        assert_eq!(
            evaluate(&Interaction::Informational, &Answer::Single("a".into())),
            Err(EvaluationError::NotInteractive(InteractionKind::Informational))
        );
    }

    #[test]
    fn stars_decrease_with_attempts() {
        assert_eq!(star_award(1, true), 3);
        assert_eq!(star_award(2, true), 2);
        assert_eq!(star_award(3, true), 1);
        assert_eq!(star_award(7, true), 1);
        assert_eq!(star_award(1, false), 0);
    }

    #[test]
    fn attempts_exhaust_into_completion() {
        let first = grade(PRACTICE, 0, false);
        assert_eq!(first.attempt, 1);
        assert!(!first.is_complete);
        assert!(first.can_retry);
        assert_eq!(first.attempts_remaining(3), 2);

        let third = grade(PRACTICE, 2, false);
        assert!(third.is_complete);
        assert!(!third.is_correct);
        assert!(!third.can_retry);
        assert_eq!(third.stars, 0);

        let second = grade(PRACTICE, 1, true);
        assert!(second.is_complete);
        assert_eq!(second.stars, 2);
    }

    #[test]
    fn assessment_completes_on_first_submission_without_stars() {
        let context = GradingContext {
            attempts_allowed: 3,
            is_assessment: true,
            awards_stars: false,
        };
        let graded = grade(context, 0, false);
        assert!(graded.is_complete);
        assert!(!graded.can_retry);

        let graded = grade(context, 0, true);
        assert_eq!(graded.stars, 0);
    }

    #[test]
    fn hidden_stars_award_nothing() {
        let context = GradingContext {
            awards_stars: false,
            ..PRACTICE
        };
        assert_eq!(grade(context, 0, true).stars, 0);
    }
}
