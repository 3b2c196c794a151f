//! Prints the outcome of a run.

use std::time::Duration;

use yansi::Paint;

use crate::runner::Summary;
use crate::stats::RequestStats;

/// Prints per-request counters, failure reasons and totals to stdout.
pub fn print_summary(summary: &Summary) {
    let requests = summary.stats.snapshot();

    println!();
    println!(
        "{} ({} users, {:.1?})",
        "## Requests".bold(),
        summary.users.bold(),
        summary.elapsed
    );
    for (name, stats) in &requests {
        print_request(name, stats, summary.elapsed);
    }

    let failing: Vec<_> = requests
        .iter()
        .filter(|(_, stats)| stats.failures > 0)
        .collect();
    if !failing.is_empty() {
        println!();
        println!("{}", "## Failures".bold());
        for (name, stats) in failing {
            for (reason, count) in &stats.reasons {
                println!("  {} {name}: {reason}", format!("{count}x").red());
            }
        }
    }

    println!();
    println!("{}", "## TOTALS".bold());
    print_request("All", &summary.stats.total(), summary.elapsed);
}

fn print_request(name: &str, stats: &RequestStats, elapsed: Duration) {
    print!("{} ({} ops", format!("{name}:").bold().green(), stats.requests.bold());
    if stats.failures > 0 {
        print!(
            ", {}",
            format!("{} FAILURES", stats.failures).bold().red()
        );
    }
    println!(")");
    println!(
        "  {:.2} requests/s; {:.1}% failed",
        rate(stats.requests, elapsed).bold(),
        failure_ratio(stats) * 100.0
    );
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}

fn failure_ratio(stats: &RequestStats) -> f64 {
    if stats.requests == 0 {
        0.0
    } else {
        stats.failures as f64 / stats.requests as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios() {
        let stats = RequestStats {
            requests: 8,
            failures: 2,
            ..Default::default()
        };
        assert_eq!(failure_ratio(&stats), 0.25);
        assert_eq!(failure_ratio(&RequestStats::default()), 0.0);

        assert_eq!(rate(10, Duration::from_secs(4)), 2.5);
        assert_eq!(rate(10, Duration::ZERO), 0.0);
    }
}
