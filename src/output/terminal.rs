// Colored terminal output for the `classify` and `inspect` commands.

use colored::Colorize;

use crate::classifier::{Classification, LinearClassifier, Verdict};
use crate::output::truncate_chars;

/// Display a classification result with a short preview of the input.
pub fn display_classification(source: &str, text: &str, result: &Classification, threshold: f64) {
    let verdict = match result.verdict {
        Verdict::Ai => result.verdict.label().red().bold(),
        Verdict::Human => result.verdict.label().green().bold(),
    };

    println!("\n{}", format!("=== {source} ===").bold());
    println!(
        "  {} {}",
        "Preview:".dimmed(),
        truncate_chars(&text.replace('\n', " "), 80)
    );
    println!("  {} {}", "Characters:".dimmed(), text.trim().chars().count());
    println!("  {} {:.1}%", "AI probability:".dimmed(), result.ai_percent());
    println!("  {} {:.2}", "Threshold:".dimmed(), threshold);
    println!("  {} {}", "Verdict:".dimmed(), verdict);
    println!();
}

/// Display what the loaded artifact looks like.
pub fn display_model_summary(classifier: &LinearClassifier, ai_label: &str) {
    let classes: Vec<String> = classifier
        .classes()
        .iter()
        .enumerate()
        .map(|(i, class)| {
            if i == classifier.ai_index() {
                format!("{class} (AI)").yellow().to_string()
            } else {
                class.to_string()
            }
        })
        .collect();
    let (min_n, max_n) = classifier.ngram_range();

    println!("\n{}", "=== Text classifier ===".bold());
    println!("  {} {}", "Classes:".dimmed(), classes.join(", "));
    println!(
        "  {} {} (label {ai_label:?})",
        "AI class index:".dimmed(),
        classifier.ai_index()
    );
    println!("  {} {}", "Features:".dimmed(), classifier.num_features());
    println!("  {} {min_n}..={max_n}", "N-gram range:".dimmed());
    println!();
}
