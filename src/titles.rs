//! Issue-title backfill for an existing dataset.
//!
//! Older datasets were extracted before the report prompt asked for issue
//! titles. [`backfill_titles`] asks the model for a short title per untitled
//! issue, from the issue's description and remedy alone (no page images).

use crate::config::ExtractionConfig;
use crate::output::ConsolidatedDataset;
use crate::pipeline::llm::ExtractionClient;
use crate::prompts::issue_title_prompt;
use tracing::{debug, info, warn};

/// Words of the description used when no title can be generated.
const FALLBACK_WORDS: usize = 4;

/// Fill in every absent or blank issue title. Returns the number written.
///
/// A failed call or an empty reply falls back to the first words of the
/// description. Issues that already have a title are left untouched.
pub async fn backfill_titles(
    dataset: &mut ConsolidatedDataset,
    client: &dyn ExtractionClient,
    config: &ExtractionConfig,
) -> usize {
    let total = dataset.issues.len();
    let pending = dataset
        .issues
        .iter()
        .filter(|issue| needs_title(issue.title.as_deref()))
        .count();
    info!("{} of {} issues need a title", pending, total);

    let mut written = 0;
    for (idx, issue) in dataset.issues.iter_mut().enumerate() {
        if !needs_title(issue.title.as_deref()) {
            continue;
        }

        let description = issue.description.as_deref().unwrap_or("");
        let remedy = issue.remedy.as_deref().unwrap_or("");
        let prompt = issue_title_prompt(description, remedy);

        let generated = match client
            .submit(&prompt, &[], config.title_max_tokens, config.temperature)
            .await
        {
            Ok(reply) => clean_title(&reply),
            Err(e) => {
                warn!("Error generating title for issue {}: {}", idx + 1, e);
                String::new()
            }
        };

        let title = if generated.is_empty() {
            fallback_title(description)
        } else {
            generated
        };

        debug!("Issue {}/{}: {}", idx + 1, total, title);
        issue.title = Some(title);
        written += 1;
    }

    written
}

fn needs_title(title: Option<&str>) -> bool {
    title.map_or(true, |t| t.trim().is_empty())
}

/// Trim a model reply and strip quote characters.
pub fn clean_title(reply: &str) -> String {
    reply
        .trim()
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect::<String>()
        .trim()
        .to_string()
}

/// The first few whitespace-separated words of `description`.
pub fn fallback_title(description: &str) -> String {
    description
        .split_whitespace()
        .take(FALLBACK_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}
