//! Interactive operator confirmation.

use std::io::{self, BufRead, Write};

use capitol_core::reconcile::PreflightReport;
use capitol_pipeline::reconcile::ConfirmationGate;

/// Ask on stdin unless `force` was given.
pub struct StdinGate {
  pub force: bool,
}

impl ConfirmationGate for StdinGate {
  fn confirm(&self, action: &str, report: &PreflightReport) -> bool {
    if self.force {
      return true;
    }
    println!("{report}");
    ask(&format!("{action}?"))
  }
}

/// Print `question` and read a yes/no answer. Anything but `y`/`yes` (or a
/// read failure) is a no.
pub fn ask(question: &str) -> bool {
  print!("{question} [y/N] ");
  io::stdout().flush().ok();
  let mut line = String::new();
  match io::stdin().lock().read_line(&mut line) {
    Ok(_) => is_yes(&line),
    Err(_) => false,
  }
}

fn is_yes(answer: &str) -> bool {
  matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
