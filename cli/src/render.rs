use mailtester::step::{StepList, StepStatus};

const BAR_WIDTH: usize = 20;

fn icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Done => "✅",
        StepStatus::Running => "⏳",
        StepStatus::Error => "❌",
        StepStatus::Pending => "•",
    }
}

/// Plain-text progress box: header with percentage, a bar, then one line per
/// step with its detail indented below.
pub fn steps(steps: &StepList) -> String {
    let progress = steps.progress() as usize;
    let filled = progress * BAR_WIDTH / 100;
    let active = steps.active_index();

    let mut out = format!(
        "Steps {:>4}%\n[{}{}]\n",
        progress,
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    );
    for (i, step) in steps.iter().enumerate() {
        let marker = if i == active { ">" } else { " " };
        out.push_str(&format!(
            "{} {} {:<26} {}\n",
            marker,
            icon(step.status),
            step.label,
            step.status
        ));
        if let Some(detail) = step.detail.as_deref().filter(|d| !d.is_empty()) {
            out.push_str(&format!("      {}\n", detail));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use mailtester::step::StepKey;

    use super::*;

    #[test]
    fn renders_failed_step_with_detail() {
        let mut list = StepList::new();
        list.set(StepKey::ValidateEmail, StepStatus::Done);
        list.set_with_detail(StepKey::ValidateService, StepStatus::Error, "Fill in host");

        let out = steps(&list);
        assert!(out.starts_with("Steps   20%\n[####----------------]\n"));
        assert!(out.contains("> ❌ Validating service"));
        assert!(out.contains("      Fill in host\n"));
        assert!(out.contains("  • Sending email"));
    }
}
