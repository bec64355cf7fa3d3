pub mod check;
pub mod screen;
pub mod verify;

use foilrank::core::analysis::scoring::ScoreRecord;
use foilrank::workflows::CaseFailure;

/// Prints the ranking table; `detailed` switches the score column to the detailed composite.
fn print_ranking(title: &str, scores: &[ScoreRecord], detailed: bool) {
    let mut ordered: Vec<&ScoreRecord> = scores.iter().collect();
    ordered.sort_by_key(|s| s.rank);

    println!("\n{}", title);
    println!(
        "  {:>4}  {:<16} {:>9} {:>10} {:>11} {:>9}",
        "Rank", "Airfoil", "Stability", "Efficiency", "Maneuvering", "Score"
    );
    for score in ordered {
        let total = if detailed {
            score.detailed_composite.unwrap_or(score.composite)
        } else {
            score.composite
        };
        println!(
            "  {:>4}  {:<16} {:>9.3} {:>10.3} {:>11.3} {:>9.3}",
            score.rank,
            score.airfoil,
            score.stability,
            score.efficiency,
            score.maneuverability,
            total
        );
    }
}

fn print_failures(failures: &[CaseFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("\n{} case(s) were excluded:", failures.len());
    for failure in failures {
        println!("  ✗ {}: {}", failure.case, failure.reason);
    }
}
