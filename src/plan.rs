//! Building and validating tomorrow's plan.

use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{NightPlan, PlanSlot, TodoItem};

/// First planner slot, inclusive.
pub const FIRST_SLOT_HOUR: u32 = 7;
/// Planner slots stop before this hour; the last slot is 22:30.
pub const END_SLOT_HOUR: u32 = 23;

/// Empty planner: half-hour slots from 07:00 to 22:30.
pub fn planner_slots() -> Vec<PlanSlot> {
    (FIRST_SLOT_HOUR..END_SLOT_HOUR)
        .flat_map(|hour| [0, 30].map(move |minute| format!("{:02}:{:02}", hour, minute)))
        .map(|time| PlanSlot {
            time,
            task: String::new(),
        })
        .collect()
}

impl TodoItem {
    pub fn new(text: &str, time: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            done: false,
            time: time.map(str::to_string),
        }
    }
}

/// Checks a plan before it may be committed.
///
/// Planner mode needs one non-blank task. Todo mode needs a non-empty list
/// with no blank entries; blanks must be removed or filled first.
pub fn validate_plan(plan: &NightPlan) -> Result<(), ValidationError> {
    match plan {
        NightPlan::Planner(slots) => {
            if slots.iter().any(|slot| !slot.task.trim().is_empty()) {
                Ok(())
            } else {
                Err(ValidationError::EmptyPlan)
            }
        }
        NightPlan::Todo(items) => {
            if items.is_empty() {
                return Err(ValidationError::EmptyTodoList);
            }
            match items.iter().position(|item| item.text.trim().is_empty()) {
                Some(index) => Err(ValidationError::BlankTodoItem { index }),
                None => Ok(()),
            }
        }
    }
}

/// Drops blank todo entries, the "remove" half of the fix-up the user is asked for.
pub fn without_blank_items(items: Vec<TodoItem>) -> Vec<TodoItem> {
    items
        .into_iter()
        .filter(|item| !item.text.trim().is_empty())
        .collect()
}
