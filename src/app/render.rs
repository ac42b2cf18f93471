use crate::core::aggregator::{bar_width_percent, BAR_SATURATION};
use crate::core::live_view::{FeedStatus, LiveTally};
use crate::core::submission::{FormState, SubmissionPhase};
use crate::domain::model::{display_date, DayTally, Slot};

const BAR_CELLS: u32 = 20;

/// Confirmation shown after a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessView {
    pub admin_contact: String,
}

impl SuccessView {
    pub fn new(admin_contact: impl Into<String>) -> Self {
        Self {
            admin_contact: admin_contact.into(),
        }
    }

    pub fn contact_link(&self) -> String {
        format!("https://wa.me/{}", self.admin_contact)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("✅ Registration Successful!\n");
        out.push_str("Thank you for your nomination. We look forward to celebrating with you!\n\n");
        out.push_str("For changes to your registration or to join the event group, contact the admin:\n");
        out.push_str(&format!("  {}\n", self.admin_contact));
        out.push_str(&format!("  {}\n", self.contact_link()));
        out
    }
}

pub fn render_bar(count: u32) -> String {
    let filled = bar_width_percent(count) * BAR_CELLS / 100;
    format!(
        "[{}{}]",
        "#".repeat(filled as usize),
        ".".repeat((BAR_CELLS - filled) as usize)
    )
}

fn render_day(day: &DayTally) -> String {
    let mut out = format!("{}\n", display_date(day.date));
    for slot in Slot::ALL {
        let count = day.count(slot);
        out.push_str(&format!(
            "  {:<8} {:>3} {}\n",
            format!("{}:", slot),
            count,
            render_bar(count)
        ));
    }
    out
}

pub fn render_board(tally: &LiveTally) -> String {
    let mut out = String::from("Registrations Per Slot:\n");
    match &tally.status {
        FeedStatus::Connecting => out.push_str("(waiting for live data)\n"),
        FeedStatus::Degraded(_) => out.push_str("(live data unavailable, counts may be stale)\n"),
        FeedStatus::Live => {}
    }
    for day in &tally.days {
        out.push_str(&render_day(day));
    }
    out.push_str(&format!(
        "*Graph shows current registrations. Max {} per slot for visual scaling.\n",
        BAR_SATURATION
    ));
    out
}

/// Field errors and the submit banner; empty when there is nothing to report.
pub fn render_form_feedback(state: &FormState) -> String {
    let mut out = String::new();
    for (field, message) in state.errors.iter() {
        out.push_str(&format!("  ✗ {}: {}\n", field, message));
    }
    if let Some(banner) = &state.submit_error {
        out.push_str(&format!("❌ {}\n", banner));
    }
    if state.phase == SubmissionPhase::Persisting {
        out.push_str("Registering...\n");
    }
    out
}
