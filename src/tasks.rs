use std::time::Duration;

use anyhow::{bail, Context, Result};
use chromiumoxide::Page;
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::info;

use crate::browser::{self, PAGE_LOAD_TIMEOUT};
use crate::config::Config;

const MODAL_TIMEOUT: Duration = Duration::from_secs(10);

const ADD_TASK_BUTTON: &str = r#"[data-testid="tasks-overview-add-task-button"]"#;
const TITLE_INPUT: &str = r#"[data-testid="task-form-title-input"]"#;
const ASSIGNEE_SELECT: &str = r#"[data-testid="task-form-assignees-select"]"#;
const ASSIGNEE_SEARCH: &str = r#"input[placeholder="Hledat..."]"#;
const ASSIGNEE_ROW: &str = "div.user-list-item";
const DEADLINE_SELECT: &str = r#"[data-testid="task-form-deadline-select"]"#;
const DATE_INPUT: &str = r#"input[name="date"]"#;
const TIME_INPUT: &str = r#"input[name="time"]"#;
const PICKER_SAVE_LABEL: &str = "Uložit";
const MODAL_CONFIRM: &str = r#"button[data-qa="modal-save"]"#;

/// Task record accepted on the command line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub external_id: String,
    pub title: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Drive the create-task form end to end: open the modal, fill the title
/// (external reference up front), optionally pick an assignee and a
/// deadline, then confirm.
pub async fn create_task(page: &Page, cfg: &Config, spec: &TaskSpec) -> Result<()> {
    browser::open_tasks_view(page, cfg).await?;

    info!("opening the create-task form");
    browser::wait_for(page, ADD_TASK_BUTTON, PAGE_LOAD_TIMEOUT)
        .await?
        .click()
        .await?;
    let title_input = browser::wait_for(page, TITLE_INPUT, MODAL_TIMEOUT)
        .await
        .context("task form did not open")?;

    let title = format!("[{}] {}", spec.external_id, spec.title);
    info!("filling title: {title}");
    title_input.click().await?;
    title_input.type_str(&title).await?;

    if let Some(assignee) = &spec.assignee {
        info!("assigning to {assignee}");
        page.find_element(ASSIGNEE_SELECT).await?.click().await?;
        let search = browser::wait_for(page, ASSIGNEE_SEARCH, MODAL_TIMEOUT).await?;
        search.click().await?;
        search.type_str(assignee).await?;
        browser::click_by_text(page, ASSIGNEE_ROW, assignee, MODAL_TIMEOUT).await?;
    }

    if let Some(deadline) = &spec.deadline {
        let parsed = parse_deadline(deadline)?;
        info!("setting deadline to {deadline}");
        page.find_element(DEADLINE_SELECT).await?.click().await?;

        let date_input = browser::wait_for(page, DATE_INPUT, MODAL_TIMEOUT).await?;
        date_input.click().await?;
        date_input
            .type_str(parsed.format("%d-%m-%Y").to_string())
            .await?;

        let time_input = page.find_element(TIME_INPUT).await?;
        time_input.click().await?;
        time_input
            .type_str(parsed.format("%H:%M").to_string())
            .await?;

        browser::click_by_text(page, "button", PICKER_SAVE_LABEL, MODAL_TIMEOUT).await?;
    }

    info!("saving the task");
    browser::wait_for(page, MODAL_CONFIRM, MODAL_TIMEOUT)
        .await?
        .click()
        .await?;
    Ok(())
}

/// Accept RFC 3339 or the bare `2024-03-12T14:30` / `2024-03-12 14:30`
/// forms.
fn parse_deadline(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    bail!("unparseable deadline {raw:?}; use e.g. 2024-03-12T14:30")
}

// ── Tests ──
