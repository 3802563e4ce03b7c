//! Prompt construction for conflict scoring.

use std::fmt::Write as _;

use crate::{
  context::{AnalysisContext, CommitteeContext},
  trade::{Chamber, Owner},
};

/// System instruction sent with every scoring request.
pub const SYSTEM_INSTRUCTION: &str = "You are an analyst assessing potential conflicts of interest \
in stock trades disclosed by members of the U.S. Congress. Respond with a single JSON object and \
nothing else. The object must have exactly these keys: \"conflict_score\" (a number from 0.0 to \
1.0, where 0.0 means no plausible conflict and 1.0 means a direct conflict), \"confidence\" (a \
number from 0.0 to 1.0), and \"reasoning\" (a string of at most a few sentences). Do not wrap the \
object in markdown.";

fn owner_label(owner: Owner) -> &'static str {
  match owner {
    Owner::SelfOwned => "Self",
    Owner::Spouse => "Spouse",
    Owner::Joint => "Joint",
    Owner::Dependent => "Dependent child",
    Owner::Unknown => "Not disclosed",
  }
}

fn or_unknown(value: Option<&str>) -> &str { value.unwrap_or("Unknown") }

/// Render the user prompt for `ctx`.
pub fn build_prompt(ctx: &AnalysisContext) -> String {
  let p = &ctx.politician;
  let mut out = String::new();

  let _ = writeln!(out, "## Politician");
  let _ = writeln!(out, "Name: {}", p.name);
  let _ = writeln!(out, "Party: {}", or_unknown(p.party.as_deref()));
  let _ = writeln!(out, "State: {}", or_unknown(p.state.as_deref()));
  let _ = writeln!(out, "Chamber: {}", p.chamber.map_or("Unknown", Chamber::label));

  let _ = writeln!(out, "\n## Committee assignments");
  match &ctx.committees {
    CommitteeContext::Unresolved => {
      let _ = writeln!(
        out,
        "NO COMMITTEE DATA: this politician could not be matched to a known member, so their \
         committee assignments are unknown. Say \"no committee data\" in your reasoning."
      );
    }
    CommitteeContext::NoAssignments => {
      let _ = writeln!(
        out,
        "NO COMMITTEE ASSIGNMENTS on file for this member. Say \"no committee assignments\" in \
         your reasoning."
      );
    }
    CommitteeContext::Assigned(assignments) => {
      for a in assignments {
        let _ = write!(out, "- {}", a.committee_name);
        match (&a.title, a.rank) {
          (Some(title), Some(rank)) => { let _ = write!(out, " ({title}, rank {rank})"); }
          (Some(title), None) => { let _ = write!(out, " ({title})"); }
          (None, Some(rank)) => { let _ = write!(out, " (rank {rank})"); }
          (None, None) => {}
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "  Jurisdiction: {}", a.jurisdiction);
        if !a.target_sectors.is_empty() {
          let _ = writeln!(out, "  Sectors overseen: {}", a.target_sectors.join(", "));
        }
      }
    }
  }

  let _ = writeln!(out, "\n## Trades");
  for t in &ctx.trades {
    let _ = writeln!(
      out,
      "- {date} {kind} {ticker} ({company}; sector: {sector}); amount {amount}; owner: {owner}",
      date = t.transaction_date,
      kind = t.transaction_type.label(),
      ticker = t.ticker,
      company = t.company_name,
      sector = t.sector,
      amount = t.amount_range,
      owner = owner_label(t.owner),
    );
  }

  let _ = writeln!(
    out,
    "\nAssess whether these trades could plausibly exploit non-public information from the \
     member's committee work. Respond with the JSON object only."
  );
  out
}
