//! Wizard step ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the upload wizard.
///
/// The order is fixed and linear; `Preview` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Upload,
    Title,
    Description,
    Timestamps,
    Thumbnail,
    Preview,
}

impl WizardStep {
    /// All steps in wizard order.
    pub const ORDER: [WizardStep; 6] = [
        WizardStep::Upload,
        WizardStep::Title,
        WizardStep::Description,
        WizardStep::Timestamps,
        WizardStep::Thumbnail,
        WizardStep::Preview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::Upload => "upload",
            WizardStep::Title => "title",
            WizardStep::Description => "description",
            WizardStep::Timestamps => "timestamps",
            WizardStep::Thumbnail => "thumbnail",
            WizardStep::Preview => "preview",
        }
    }

    /// Position in [`WizardStep::ORDER`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Successor step, `None` for `Preview`.
    pub fn next(&self) -> Option<WizardStep> {
        Self::ORDER.get(self.index() + 1).copied()
    }

    /// Predecessor step, `None` for `Upload`.
    pub fn previous(&self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|i| Self::ORDER[i])
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WizardStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .iter()
            .copied()
            .find(|step| step.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown wizard step: {}", s))
    }
}
