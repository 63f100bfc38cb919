use std::{collections::BTreeMap, io::Write};

use leadkpi::{
    leads::{self, ExclusionReason},
    tools::kpi::{self, output, SegmentKey},
};

use crate::InputArgs;

#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    input: InputArgs,

    /// Also list every excluded row with its reasons.
    #[arg(long)]
    verbose: bool,
}

pub fn main(args: Args) -> anyhow::Result<()> {
    let Args { input, verbose } = args;
    let (table, config) = input.load()?;
    let normalized = leads::normalize(&table, &config.column_renames)?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "Rows read:     {}", normalized.total_rows)?;
    writeln!(out, "Rows kept:     {}", normalized.records.len())?;
    writeln!(out, "Rows excluded: {}", normalized.dropped_count())?;

    // a row can be excluded for more than one reason
    let mut by_reason: BTreeMap<&str, usize> = BTreeMap::new();
    for exclusion in &normalized.exclusions {
        for reason in &exclusion.reasons {
            let name = match reason {
                ExclusionReason::MissingTimestamp => "missing creation timestamp",
                ExclusionReason::UnparseableTimestamp(_) => "unparseable creation timestamp",
                ExclusionReason::MissingPeriodLabel => "missing period label",
                ExclusionReason::MissingSource => "missing source",
            };
            *by_reason.entry(name).or_default() += 1;
        }
    }
    for (reason, count) in &by_reason {
        writeln!(out, "    - {}: {}", reason, count)?;
    }

    let keys = kpi::segment_keys(&normalized.records);
    writeln!(out, "Segments ({}):", keys.len())?;
    for key in &keys {
        let leads = normalized.records.iter().filter(|l| key.matches(l)).count();
        writeln!(out, "    - {} ({} leads)", key, leads)?;
    }

    writeln!(out, "Leads per period:")?;
    for period in &config.periods {
        let count = kpi::select(&normalized.records, &SegmentKey::Overall, period).len();
        writeln!(out, "    - {} [{}]: {}", period.name, period, count)?;
    }

    if verbose {
        output::human::print_exclusions(&normalized.exclusions, &mut out)?;
    }
    out.flush()?;
    Ok(())
}
