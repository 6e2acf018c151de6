//! Plain-text rendering of engine views.

use course_core::model::{Interaction, TemplateConfig};
use services::{CourseEngine, EngineError, Feedback, PlayerError};

fn label<'a>(config: &'a TemplateConfig, key: &str, fallback: &'a str) -> &'a str {
    config.label(key).unwrap_or(fallback)
}

#[must_use]
pub fn feedback_text(config: &TemplateConfig, feedback: Feedback) -> String {
    match feedback {
        Feedback::Correct { stars } if stars > 0 => format!(
            "{} {}",
            label(config, "correct", "Correct!"),
            "*".repeat(usize::from(stars))
        ),
        Feedback::Correct { .. } => label(config, "correct", "Correct!").to_owned(),
        Feedback::Incorrect { attempts_remaining } => format!(
            "{} {} {attempts_remaining} (retry)",
            label(config, "incorrect", "Incorrect."),
            label(config, "attemptsRemaining", "Attempts remaining:")
        ),
        Feedback::Exhausted => {
            label(config, "attemptsExhausted", "Incorrect. No attempts left.").to_owned()
        }
        Feedback::Recorded => label(config, "assessmentrecorded", "Answer recorded.").to_owned(),
    }
}

/// Current page with its interaction, feedback and lock state.
#[must_use]
pub fn render_page(engine: &CourseEngine, seed: u64) -> String {
    let config = engine.document().config();
    let Ok(view) = engine.view() else {
        return "no current page".to_owned();
    };
    let mut out = String::new();

    out.push_str(&format!(
        "\n[{}/{}] {} > {} ({})\n",
        view.page_number,
        view.total_pages,
        view.topic.title(),
        view.page.title(),
        view.page.kind().as_str()
    ));
    let content = view.page.content();
    for text in [&content.heading, &content.body, &content.instruction]
        .into_iter()
        .flatten()
    {
        out.push_str(&format!("  {text}\n"));
    }
    for item in &content.items {
        out.push_str(&format!("  - {}: {}\n", item.title, item.content));
    }

    match view.page.interaction() {
        Interaction::SingleChoice { .. } | Interaction::MultiChoice { .. } => {
            if let Ok(options) = engine.shuffled_options(view.page.id(), seed) {
                for option in options {
                    out.push_str(&format!("    [{}] {}\n", option.id, option.text));
                }
            }
        }
        Interaction::Matching { pairs } => {
            for pair in pairs {
                out.push_str(&format!("    {} = {}  ({})\n", pair.left, pair.right, pair.id));
            }
        }
        Interaction::Slider(spec) => {
            out.push_str(&format!(
                "    slider {} .. {} step {} {}\n",
                spec.min, spec.max, spec.step, spec.unit
            ));
        }
        Interaction::Ordering { items } => {
            let mut sorted: Vec<_> = items.iter().collect();
            sorted.sort_by(|a, b| a.text.cmp(&b.text));
            for item in sorted {
                out.push_str(&format!("    [{}] {}\n", item.id, item.text));
            }
        }
        _ => {}
    }

    if view.transcript_open && content.has_transcript() {
        if let Some(transcript) = &content.transcript {
            out.push_str(&format!(
                "  {}: {transcript}\n",
                label(config, "TranscriptName", "Transcript")
            ));
        }
    }
    if content.has_audio() && view.audio_enabled && !view.progress.completed {
        out.push_str("  (narration playing; type `media` when it ends)\n");
    }
    if let Some(feedback) = view.feedback {
        out.push_str(&format!("  => {}\n", feedback_text(config, feedback)));
    }
    if view.is_locked {
        out.push_str(&format!("  [{}]\n", label(config, "locked", "Locked")));
    }
    if !view.can_advance {
        out.push_str("  (complete this page to continue)\n");
    }
    out
}

/// Topic and page tree with lock and completion marks.
#[must_use]
pub fn render_menu(engine: &CourseEngine) -> String {
    let config = engine.document().config();
    let mut out = format!("\n{}\n", label(config, "MenuName", "Menu"));
    for entry in engine.menu() {
        let mark = if entry.is_completed {
            "x"
        } else if entry.is_locked {
            "#"
        } else {
            " "
        };
        out.push_str(&format!("[{mark}] {} ({})\n", entry.topic.title(), entry.topic.id()));
        for page in entry.pages {
            let cursor = if page.is_current { ">" } else { " " };
            let mark = if page.is_completed {
                "x"
            } else if page.is_locked {
                "#"
            } else {
                " "
            };
            out.push_str(&format!(
                "  {cursor}[{mark}] {} ({})\n",
                page.page.title(),
                page.page.id()
            ));
        }
    }
    out
}

#[must_use]
pub fn render_status(engine: &CourseEngine) -> String {
    let document = engine.document();
    let completed = document
        .pages()
        .filter(|p| engine.progress().is_completed(p.page.id()))
        .count();
    let mut out = format!(
        "{} [{}]: {completed}/{} pages complete",
        document.title(),
        document.language(),
        document.page_count()
    );
    if document.settings().gamification {
        out.push_str(&format!(", stars {}/{}", engine.total_stars(), engine.max_stars()));
    }
    for topic in document.topics().iter().filter(|t| t.is_assessment()) {
        if let Ok(score) = engine.assessment_score(topic.id()) {
            out.push_str(&format!(", {} {score}%", topic.title()));
        }
    }
    if engine.is_finished() {
        out.push_str(" (finished)");
    }
    out
}

/// Learner-facing text for a refused action.
#[must_use]
pub fn describe_error(config: &TemplateConfig, err: &PlayerError) -> String {
    match err {
        PlayerError::Engine(EngineError::Submission(reason)) => match reason.incomplete() {
            Some(incomplete) => label(config, incomplete.message_key(), "Please complete your answer.")
                .to_owned(),
            None => reason.to_string(),
        },
        PlayerError::ResumePending => format!(
            "{} {} (resume / restart)",
            label(config, "ResumeHeader", "Welcome back."),
            label(config, "ResumeTitle", "Resume where you left off?")
        ),
        other => other.to_string(),
    }
}
