//! Stage vocabulary shared by the relay endpoint and the form controller.
//!
//! The endpoint tags each failure with a [`StepKey`]; the controller uses the
//! same enum to decide which entry of its [`StepList`] to mark as failed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One stage of a send attempt, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKey {
    ValidateEmail,
    ValidateService,
    BuildTransporter,
    SendEmail,
    Success,
}

impl StepKey {
    pub const ALL: [StepKey; 5] = [
        StepKey::ValidateEmail,
        StepKey::ValidateService,
        StepKey::BuildTransporter,
        StepKey::SendEmail,
        StepKey::Success,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepKey::ValidateEmail => "validateEmail",
            StepKey::ValidateService => "validateService",
            StepKey::BuildTransporter => "buildTransporter",
            StepKey::SendEmail => "sendEmail",
            StepKey::Success => "success",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StepKey::ValidateEmail => "Validating email",
            StepKey::ValidateService => "Validating service",
            StepKey::BuildTransporter => "Building transport",
            StepKey::SendEmail => "Sending email",
            StepKey::Success => "Email sent successfully.",
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Done,
    Error,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Done => "done",
            StepStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub key: StepKey,
    pub label: &'static str,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Step {
    fn pending(key: StepKey) -> Self {
        Step {
            key,
            label: key.label(),
            status: StepStatus::Pending,
            detail: None,
        }
    }
}

/// The five steps of one send attempt, always in [`StepKey::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepList {
    steps: [Step; 5],
}

impl Default for StepList {
    fn default() -> Self {
        Self::new()
    }
}

impl StepList {
    pub fn new() -> Self {
        StepList {
            steps: StepKey::ALL.map(Step::pending),
        }
    }

    /// Puts every step back to pending and drops all details.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn get(&self, key: StepKey) -> &Step {
        &self.steps[Self::index(key)]
    }

    /// Updates the status of `key`, keeping any detail already attached.
    pub fn set(&mut self, key: StepKey, status: StepStatus) {
        self.steps[Self::index(key)].status = status;
    }

    pub fn set_with_detail(&mut self, key: StepKey, status: StepStatus, detail: impl Into<String>) {
        let step = &mut self.steps[Self::index(key)];
        step.status = status;
        step.detail = Some(detail.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Percentage of steps that are done, rounded to the nearest integer.
    pub fn progress(&self) -> u8 {
        let done = self.count(StepStatus::Done);
        ((done as f64 / self.len() as f64) * 100.0).round() as u8
    }

    /// The step a progress view should highlight: the running step, else the
    /// failed one, else the first step not yet done.
    pub fn active_index(&self) -> usize {
        if let Some(i) = self.position(StepStatus::Running) {
            return i;
        }
        if let Some(i) = self.position(StepStatus::Error) {
            return i;
        }
        self.count(StepStatus::Done).min(self.len() - 1)
    }

    pub fn has_error(&self) -> bool {
        self.position(StepStatus::Error).is_some()
    }

    fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    fn position(&self, status: StepStatus) -> Option<usize> {
        self.steps.iter().position(|s| s.status == status)
    }

    fn index(key: StepKey) -> usize {
        match key {
            StepKey::ValidateEmail => 0,
            StepKey::ValidateService => 1,
            StepKey::BuildTransporter => 2,
            StepKey::SendEmail => 3,
            StepKey::Success => 4,
        }
    }
}
