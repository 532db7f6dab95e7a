//! Merging ordered page outcomes into the final result.

mod package;

pub use package::{entry_name, package, package_with_prefix};

use std::time::Duration;

use crate::models::result::{ExtractionResult, PageOutcome};

const RULE_WIDTH: usize = 50;

/// Delimited block for one page.
///
/// `page_number` is 1-based. Failed pages carry an `ERROR` marker and the
/// error text as body so reviewers can find them.
pub fn page_block(page_number: usize, body: &str, failed: bool) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let marker = if failed { " - ERROR" } else { "" };
    format!("\n{rule}\n📄 PAGE {page_number}{marker}\n{rule}\n\n{body}\n")
}

/// Full text for outcomes already in page order.
pub fn full_text(outcomes: &[PageOutcome]) -> String {
    outcomes
        .iter()
        .map(|outcome| match &outcome.error {
            Some(err) => page_block(outcome.page_number(), err.message(), true),
            None => page_block(outcome.page_number(), &outcome.text, false),
        })
        .collect()
}

/// Build the run result from outcomes in page order.
pub fn aggregate(outcomes: Vec<PageOutcome>, elapsed: Duration) -> ExtractionResult {
    debug_assert!(outcomes.iter().enumerate().all(|(i, o)| o.page_index == i));

    let ordered_page_texts = outcomes.iter().map(|o| o.text.clone()).collect();
    ExtractionResult {
        ordered_page_texts,
        full_text: full_text(&outcomes),
        page_count: outcomes.len(),
        elapsed,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::models::result::RunState;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_block_format() {
        let rule = "=".repeat(50);
        assert_eq!(
            page_block(1, "hello", false),
            format!("\n{rule}\n📄 PAGE 1\n{rule}\n\nhello\n")
        );
        assert_eq!(
            page_block(12, "boom", true),
            format!("\n{rule}\n📄 PAGE 12 - ERROR\n{rule}\n\nboom\n")
        );
    }

    #[test]
    fn test_aggregate_with_failed_page() {
        let outcomes = vec![
            PageOutcome::success(0, "alpha"),
            PageOutcome::failure(1, PageError::RenderFailure("no raster image".into())),
            PageOutcome::success(2, "gamma"),
        ];
        let result = aggregate(outcomes, Duration::from_millis(5));

        assert_eq!(result.page_count, 3);
        assert_eq!(result.ordered_page_texts, vec!["alpha", "", "gamma"]);
        assert_eq!(result.full_text.matches("📄 PAGE").count(), 3);
        assert!(result.full_text.contains("📄 PAGE 2 - ERROR"));
        assert!(result.full_text.contains("no raster image"));
        assert_eq!(result.state(), RunState::CompletedWithErrors);
        assert_eq!(result.failed_count(), 1);
    }

    #[test]
    fn test_aggregate_empty() {
        let result = aggregate(Vec::new(), Duration::ZERO);
        assert_eq!(result.page_count, 0);
        assert!(result.ordered_page_texts.is_empty());
        assert_eq!(result.full_text, "");
        assert_eq!(result.state(), RunState::Completed);
    }
}
