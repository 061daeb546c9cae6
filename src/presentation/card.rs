use crate::{api::Reminder, notifier::DueOrigin};

/// Text rendering of a due-reminder prompt.
#[derive(Debug, Clone)]
pub struct NotificationCard {
    pub reminder: Reminder,
    pub origin: DueOrigin,
}

impl NotificationCard {
    pub fn new(reminder: Reminder, origin: DueOrigin) -> Self {
        Self { reminder, origin }
    }

    pub fn reminder_id(&self) -> i64 {
        self.reminder.id
    }

    pub fn render(&self, snooze_minutes: u64) -> String {
        let r = &self.reminder;
        let header = match self.origin {
            DueOrigin::Scheduled => "⏰ Medicine Reminder".to_string(),
            DueOrigin::Snoozed => "⏰ Medicine Reminder (snoozed)".to_string(),
        };

        let mut lines = vec![
            header,
            format!("  {}", r.medicine_name),
            format!("  Dosage:    {}", r.dosage),
            format!("  Frequency: {}", r.frequency),
        ];
        if let Some(note) = r.note() {
            lines.push(format!("  Note:      {note}"));
        }
        lines.push(format!(
            "  [snooze {id}] Snooze {snooze_minutes} min   [taken {id}] Mark as taken   [dismiss {id}]",
            id = r.id
        ));

        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let rule = "─".repeat(width + 2);
        let mut out = String::with_capacity((width + 4) * (lines.len() + 2));
        out.push_str(&format!("┌{rule}┐\n"));
        for line in &lines {
            let pad = width - line.chars().count();
            out.push_str(&format!("│ {line}{} │\n", " ".repeat(pad)));
        }
        out.push_str(&format!("└{rule}┘"));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::reminder_at;

    #[test]
    fn renders_core_fields_and_actions() {
        let mut reminder = reminder_at(42, "08:00");
        reminder.medicine_name = "Lisinopril".into();
        reminder.dosage = "10mg".into();
        let text = NotificationCard::new(reminder, DueOrigin::Scheduled).render(5);

        assert!(text.contains("Medicine Reminder"));
        assert!(text.contains("Lisinopril"));
        assert!(text.contains("Dosage:    10mg"));
        assert!(text.contains("[snooze 42] Snooze 5 min"));
        assert!(text.contains("[taken 42]"));
        assert!(!text.contains("Note:"));
    }

    #[test]
    fn note_and_snoozed_header() {
        let mut reminder = reminder_at(1, "08:00");
        reminder.notes = Some("after breakfast".into());
        let text = NotificationCard::new(reminder, DueOrigin::Snoozed).render(5);
        assert!(text.contains("(snoozed)"));
        assert!(text.contains("Note:      after breakfast"));
    }

    #[test]
    fn box_lines_have_equal_width() {
        let text = NotificationCard::new(reminder_at(3, "08:00"), DueOrigin::Scheduled).render(5);
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }
}
