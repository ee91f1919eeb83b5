//! `pgen generate`: one generation request, with conflict windows answered
//! line by line on stdin.
//!
//! Reply format per window: one index per group, whitespace-separated
//! (`0 2 1`), or `c` to cancel. Closing stdin cancels too.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use pgen_filter::FilterSpec;
use pgen_ledger::{MemorySupply, ResourceLedger};
use pgen_runtime::{ExchangeOutcome, GenerationOutcome, GenerationReport, GenerationRequest};
use pgen_schemas::{CandidateSummary, ConflictWindow, SummaryLine, WindowSelection};

use super::{Context, Target};

/// Blank pattern supplies for this run.
pub struct Supplies {
    pub blanks: u64,
    pub pool: Option<u64>,
}

enum Reply {
    Choices(Vec<i64>),
    Cancel,
    Unparsed(String),
}

fn parse_reply(line: &str) -> Reply {
    let line = line.trim();
    if matches!(line, "c" | "cancel" | "q" | "quit") {
        return Reply::Cancel;
    }
    let mut choices = Vec::new();
    for tok in line.split_whitespace() {
        match tok.parse::<i64>() {
            Ok(n) => choices.push(n),
            Err(_) => return Reply::Unparsed(tok.to_string()),
        }
    }
    Reply::Choices(choices)
}

pub fn run(ctx: &Context, target: &Target, filters: FilterSpec, supplies: Supplies) -> Result<()> {
    let catalog = ctx.catalog()?;
    let keyword = target.resolve(&catalog)?;

    // Network pool pays first when present; the inventory is the fallback.
    let inventory = Arc::new(MemorySupply::new("inventory"));
    let pool = supplies.pool.map(|_| Arc::new(MemorySupply::new("network")));
    let mut ledger = ResourceLedger::new();
    if let Some(p) = &pool {
        ledger = ledger.with_source(p.clone());
    }
    let ledger = ledger.with_source(inventory.clone());

    let svc = ctx.service(catalog, ledger);
    let unit = svc.blank_unit().clone();
    inventory.credit(&ctx.requester, &unit, supplies.blanks);
    if let (Some(p), Some(n)) = (&pool, supplies.pool) {
        p.credit(&ctx.requester, &unit, n);
    }

    let request = GenerationRequest::new(keyword).with_filters(filters);
    let mut window = match svc.request_generation(&ctx.requester, &request)? {
        GenerationOutcome::Generated { stats, report } => {
            println!("collected={} unique={}", stats.collected, stats.unique);
            print_report(&report);
            return Ok(());
        }
        GenerationOutcome::Rejected(rejection) => anyhow::bail!("{rejection}"),
        GenerationOutcome::NeedsSelection { stats, window } => {
            println!(
                "collected={} unique={} unambiguous={} conflict_groups={}",
                stats.collected, stats.unique, stats.unambiguous, stats.conflict_groups
            );
            window
        }
    };

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print_window(&window);
        print!("choose> ");
        io::stdout().flush().context("flush stdout failed")?;

        let Some(line) = lines.next() else {
            svc.disconnect(&ctx.requester);
            println!();
            println!("cancelled=true reason=stdin closed");
            return Ok(());
        };
        let line = line.context("read stdin failed")?;

        let selection = match parse_reply(&line) {
            Reply::Cancel => WindowSelection::cancel(window.start_index),
            Reply::Choices(choices) => WindowSelection::choose(window.start_index, choices),
            Reply::Unparsed(tok) => {
                println!("not a number: {tok}");
                continue;
            }
        };

        match svc.submit_selection(&ctx.requester, &selection)? {
            ExchangeOutcome::Window(next) => window = next,
            ExchangeOutcome::Resend { reason, window: w } => {
                println!("resend: {reason}");
                window = w;
            }
            ExchangeOutcome::Generated(report) => {
                print_report(&report);
                return Ok(());
            }
            ExchangeOutcome::Rejected(rejection) => anyhow::bail!("{rejection}"),
            ExchangeOutcome::Cancelled => {
                println!("cancelled=true");
                return Ok(());
            }
            ExchangeOutcome::IgnoredStale => {
                // Only a cancel can be stale here; show the live window again.
                if let Some(w) = svc.current_window(&ctx.requester) {
                    window = w;
                }
            }
            ExchangeOutcome::Aborted(fault) => anyhow::bail!("selection aborted: {fault}"),
            ExchangeOutcome::NoSession => anyhow::bail!("selection session is gone"),
        }
    }
}

fn print_report(report: &GenerationReport) {
    println!("generated={} source={}", report.encoded, report.source);
    println!(
        "skipped={} fluids_dropped={} debited_from={}",
        report.skipped,
        report.fluids_dropped,
        report.debited_from.as_deref().unwrap_or("-")
    );
}

fn print_window(w: &ConflictWindow) {
    let last = (w.start_index as usize + w.groups.len()).saturating_sub(1);
    println!(
        "conflicts {}-{} of {} (answer one index per group):",
        w.start_index, last, w.total_groups
    );
    for g in &w.groups {
        println!("  {}", g.label);
        for (i, c) in g.candidates.iter().enumerate() {
            println!("    [{i}] {}", candidate_line(c));
        }
    }
}

fn join_lines(items: &[SummaryLine]) -> String {
    items
        .iter()
        .map(|l| format!("{} x{}", l.name, l.amount))
        .collect::<Vec<_>>()
        .join(", ")
}

fn candidate_line(c: &CandidateSummary) -> String {
    let mut inputs = join_lines(&c.inputs);
    if !c.fluid_inputs.is_empty() {
        inputs = [inputs, join_lines(&c.fluid_inputs)]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
    }
    let mut out = format!("{inputs} -> {}", join_lines(&c.outputs));
    if !c.non_consumed.is_empty() {
        out.push_str(&format!(" (keeps {})", join_lines(&c.non_consumed)));
    }
    out.push_str(&format!(" [{}t @ {}]", c.duration, c.rate));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_parse_indices_cancel_and_garbage() {
        assert!(matches!(parse_reply("0 2  1"), Reply::Choices(ref v) if v == &[0, 2, 1]));
        assert!(matches!(parse_reply(" c "), Reply::Cancel));
        assert!(matches!(parse_reply("1 x"), Reply::Unparsed(ref t) if t == "x"));
        assert!(matches!(parse_reply(""), Reply::Choices(ref v) if v.is_empty()));
    }
}
