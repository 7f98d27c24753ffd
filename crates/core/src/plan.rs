//! Implementation plan generation.
//!
//! Generation sits behind the [`PlanGenerator`] trait: input is a screen's
//! name and documentation, output is markdown. The shipped
//! [`SimulatedPlanGenerator`] renders a fixed template after an artificial
//! delay, so results are deterministic for a given input.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoreError;

/// Title used when a screen has no name.
pub const UNTITLED_SCREEN: &str = "Untitled Screen";

/// Number of documentation characters quoted in the plan overview.
const OVERVIEW_EXCERPT_CHARS: usize = 50;

/// Suggested names longer than this are truncated.
const SUGGESTED_NAME_MAX_CHARS: usize = 30;

/// A first documentation line must be longer than this to become a name.
const SUGGESTED_NAME_MIN_CHARS: usize = 3;

/// Default artificial latency of the simulated generator.
pub const DEFAULT_SIMULATED_DELAY: Duration = Duration::from_millis(3500);

/// What a generator needs to know about a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub screen_name: Option<String>,
    pub documentation: String,
}

impl PlanRequest {
    pub fn title(&self) -> &str {
        self.screen_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNTITLED_SCREEN)
    }
}

/// Produces a markdown implementation plan for one screen.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<String, CoreError>;
}

/// Template-based generator with a configurable artificial delay.
#[derive(Debug, Clone)]
pub struct SimulatedPlanGenerator {
    delay: Duration,
}

impl SimulatedPlanGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedPlanGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATED_DELAY)
    }
}

#[async_trait]
impl PlanGenerator for SimulatedPlanGenerator {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<String, CoreError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(render_plan(request))
    }
}

/// Render the plan template for `request`.
pub fn render_plan(request: &PlanRequest) -> String {
    let excerpt: String = request
        .documentation
        .chars()
        .take(OVERVIEW_EXCERPT_CHARS)
        .collect();

    format!(
        "# {title} Implementation Plan

## 1. Overview
This screen represents {excerpt}...

## 2. Component Breakdown
- Header Section
- Main Content Area
- Navigation Elements
- User Interaction Points

## 3. UI Components Needed
- Container Layout
- Typography Elements
- Button Components
- Input Fields
- Card Elements

## 4. Implementation Steps
1. Create the base component structure
2. Implement the layout grid
3. Add typography and static elements
4. Implement interactive elements
5. Connect data sources
6. Add state management
7. Implement event handlers
8. Add animations and transitions
9. Ensure responsive behavior

## 5. Technical Considerations
- Use Flexbox/Grid for responsive layout
- Implement proper accessibility features
- Ensure mobile responsiveness
- Optimize for performance

## 6. Estimated Development Time
- Frontend Implementation: 4-6 hours
- Integration with Backend: 2-3 hours
- Testing and Refinement: 2-3 hours

## 7. Dependencies
- React component library
- State management solution
- API integration for data

## 8. Success Criteria
- Screen matches design specifications
- All interactive elements function correctly
- Screen is fully responsive
- Passes accessibility requirements
",
        title = request.title(),
    )
}

/// Suggest a screen name from its documentation.
///
/// Uses the first line when it is long enough to be meaningful, truncated
/// with an ellipsis; otherwise falls back to [`UNTITLED_SCREEN`].
pub fn suggest_screen_name(documentation: &str) -> String {
    let first_line = documentation.lines().next().unwrap_or("").trim();
    let len = first_line.chars().count();

    if len <= SUGGESTED_NAME_MIN_CHARS {
        return UNTITLED_SCREEN.to_string();
    }
    if len > SUGGESTED_NAME_MAX_CHARS {
        let head: String = first_line.chars().take(SUGGESTED_NAME_MAX_CHARS).collect();
        return format!("{head}...");
    }
    first_line.to_string()
}
