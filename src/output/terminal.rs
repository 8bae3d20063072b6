// Colored terminal output for `gatekeep check`.

use colored::Colorize;

use crate::moderation::{Evaluation, ModerationPolicy};

/// Display a verdict for text evaluated from the command line.
pub fn display_evaluation(text: &str, policy: &ModerationPolicy, evaluation: &Evaluation) {
    let result = &evaluation.result;

    println!("\n{}", "=== Moderation Check ===".bold());
    println!("  Text: {}", super::truncate_chars(text, 120).dimmed());
    println!();

    let toxicity = format!("{:.2}", result.toxicity());
    let toxicity = if result.toxicity() > policy.toxicity_threshold {
        toxicity.red().bold()
    } else {
        toxicity.green()
    };
    println!(
        "  Toxicity: {} (threshold {:.2})",
        toxicity, policy.toxicity_threshold
    );

    let spam = if result.is_spam() {
        "yes".red().bold()
    } else {
        "no".green()
    };
    println!("  Spam: {}", spam);

    if result.is_violation() {
        println!(
            "  Verdict: {} ({})",
            "REMOVE".red().bold(),
            result.violation_list()
        );
    } else {
        println!("  Verdict: {}", "allow".green());
    }

    if let Some(degradation) = &evaluation.degradation {
        println!("\n  {} {}", "!".yellow(), degradation.to_string().yellow());
    }
    println!();
}
