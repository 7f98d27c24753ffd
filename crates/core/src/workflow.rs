//! Three-step project workflow controller.
//!
//! A project moves through *Upload Screens*, *Add Documentation* and
//! *Create Implementation Plans*. The controller holds no state of its own;
//! the current step and the gates are derived from the project's screens
//! every time a [`WorkflowSnapshot`] is built.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::plan_status::PlanStatus;
use crate::types::DbId;
use crate::validation::has_text;

/// One step of the project workflow. Ids are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    UploadScreens = 1,
    AddDocumentation = 2,
    CreateImplementationPlans = 3,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 3] = [
        Self::UploadScreens,
        Self::AddDocumentation,
        Self::CreateImplementationPlans,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::UploadScreens => "Upload Screens",
            Self::AddDocumentation => "Add Documentation",
            Self::CreateImplementationPlans => "Create Implementation Plans",
        }
    }

    /// The following step, clamped at the last one.
    pub fn next(self) -> Self {
        match self {
            Self::UploadScreens => Self::AddDocumentation,
            Self::AddDocumentation | Self::CreateImplementationPlans => {
                Self::CreateImplementationPlans
            }
        }
    }

    /// The preceding step, clamped at the first one.
    pub fn previous(self) -> Self {
        match self {
            Self::UploadScreens | Self::AddDocumentation => Self::UploadScreens,
            Self::CreateImplementationPlans => Self::AddDocumentation,
        }
    }
}

/// Direction of a stepper move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    Next,
    Previous,
}

/// Resolve a stepper move from `from`. Moving forward is gated by
/// [`ensure_can_advance`]; moving back is always allowed.
pub fn navigate(
    from: WorkflowStep,
    direction: Navigation,
    snapshot: &WorkflowSnapshot,
) -> Result<WorkflowStep, CoreError> {
    match direction {
        Navigation::Next => {
            ensure_can_advance(from, snapshot)?;
            Ok(from.next())
        }
        Navigation::Previous => Ok(from.previous()),
    }
}

/// The parts of a screen the workflow gates look at.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenProgress {
    pub screen_id: DbId,
    pub screen_name: Option<String>,
    /// `screen_name`, or a positional fallback for unnamed screens.
    pub label: String,
    pub has_documentation: bool,
    pub plan_status: PlanStatus,
    /// Mirrors the enabled state of the per-screen "Generate Plan" action.
    pub can_generate_plan: bool,
}

impl ScreenProgress {
    pub fn new(
        screen_id: DbId,
        screen_name: Option<String>,
        fallback_label: String,
        documentation: Option<&str>,
        plan_status: PlanStatus,
    ) -> Self {
        let has_documentation = has_text(documentation);
        let label = screen_name.clone().unwrap_or(fallback_label);
        Self {
            screen_id,
            screen_name,
            label,
            has_documentation,
            plan_status,
            can_generate_plan: has_documentation && plan_status.can_generate(),
        }
    }
}

/// Step descriptor included in snapshots for clients that render a stepper.
#[derive(Debug, Clone, Serialize)]
pub struct StepInfo {
    pub id: u8,
    pub step: WorkflowStep,
    pub name: &'static str,
    pub done: bool,
}

/// Derived view of where a project stands in the workflow.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub current_step: WorkflowStep,
    pub steps: Vec<StepInfo>,
    pub screen_count: usize,
    pub documented_count: usize,
    pub completed_count: usize,
    pub in_progress_count: usize,
    pub can_leave_upload: bool,
    pub can_leave_documentation: bool,
    pub can_finish: bool,
    pub screens: Vec<ScreenProgress>,
}

impl WorkflowSnapshot {
    pub fn from_screens(screens: Vec<ScreenProgress>) -> Self {
        let screen_count = screens.len();
        let documented_count = screens.iter().filter(|s| s.has_documentation).count();
        let completed_count = screens
            .iter()
            .filter(|s| s.plan_status.is_completed())
            .count();
        let in_progress_count = screens
            .iter()
            .filter(|s| s.plan_status == PlanStatus::InProgress)
            .count();

        let can_leave_upload = screen_count > 0;
        let can_leave_documentation = can_leave_upload && documented_count == screen_count;
        let can_finish = can_leave_upload && completed_count == screen_count;

        let current_step = if !can_leave_upload {
            WorkflowStep::UploadScreens
        } else if !can_leave_documentation {
            WorkflowStep::AddDocumentation
        } else {
            WorkflowStep::CreateImplementationPlans
        };

        let steps = WorkflowStep::ALL
            .into_iter()
            .map(|step| StepInfo {
                id: step.id(),
                step,
                name: step.name(),
                done: match step {
                    WorkflowStep::UploadScreens => can_leave_upload,
                    WorkflowStep::AddDocumentation => can_leave_documentation,
                    WorkflowStep::CreateImplementationPlans => can_finish,
                },
            })
            .collect();

        Self {
            current_step,
            steps,
            screen_count,
            documented_count,
            completed_count,
            in_progress_count,
            can_leave_upload,
            can_leave_documentation,
            can_finish,
            screens,
        }
    }
}

/// Check whether the workflow may move forward from `step`.
pub fn ensure_can_advance(step: WorkflowStep, snapshot: &WorkflowSnapshot) -> Result<(), CoreError> {
    match step {
        WorkflowStep::UploadScreens if !snapshot.can_leave_upload => Err(CoreError::Validation(
            "Please upload at least one screen image".into(),
        )),
        WorkflowStep::AddDocumentation if !snapshot.can_leave_documentation => Err(
            CoreError::Validation("Please add documentation for all screens".into()),
        ),
        WorkflowStep::CreateImplementationPlans => ensure_can_finish(snapshot),
        _ => Ok(()),
    }
}

/// "Finish" is only available once every screen has a completed plan.
pub fn ensure_can_finish(snapshot: &WorkflowSnapshot) -> Result<(), CoreError> {
    if snapshot.screen_count == 0 {
        return Err(CoreError::Validation(
            "Please upload at least one screen image".into(),
        ));
    }
    if !snapshot.can_finish {
        let remaining = snapshot.screen_count - snapshot.completed_count;
        return Err(CoreError::Conflict(format!(
            "{remaining} screen(s) still need a completed implementation plan"
        )));
    }
    Ok(())
}
