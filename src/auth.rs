use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use tracing::{info, warn};

use crate::browser::{self, Session, PAGE_LOAD_TIMEOUT};
use crate::config::Config;

const LOGIN_FORM_TIMEOUT: Duration = Duration::from_secs(15);
const POST_SUBMIT_PAUSE: Duration = Duration::from_secs(5);
/// How long the headed window stays open for a manual login.
const INTERACTIVE_WINDOW: Duration = Duration::from_secs(300);

const EMAIL_INPUT: &str = r#"input[name="email"]"#;
const PASSWORD_INPUT: &str = r#"input[name="password"]"#;
const SUBMIT_BUTTON: &str = r#"button[type="submit"]"#;
/// Present on the tasks view only once a session is live.
const ADD_ITEM_CONTROL: &str = r#"[data-qa="add-item"]"#;

const FAILURE_SCREENSHOT: &str = "login_failure.png";

/// Log in with the configured credentials; the authenticated session lands
/// in the persistent profile for later runs. A failed flow leaves a
/// screenshot behind for diagnosis.
pub async fn login(cfg: &Config) -> Result<()> {
    let (user, password) = cfg.credentials()?;
    let session = Session::launch(cfg, false).await?;

    let outcome = perform_login(&session.page, cfg, user, password).await;
    if outcome.is_err() {
        match session
            .page
            .save_screenshot(ScreenshotParams::builder().build(), FAILURE_SCREENSHOT)
            .await
        {
            Ok(_) => warn!("login failed; screenshot saved to {FAILURE_SCREENSHOT}"),
            Err(err) => warn!("login failed; screenshot capture also failed: {err}"),
        }
    }
    session.close().await?;
    outcome
}

async fn perform_login(page: &Page, cfg: &Config, user: &str, password: &str) -> Result<()> {
    info!("navigating to {}", cfg.base_url);
    page.goto(cfg.base_url.as_str()).await?;

    let email = browser::wait_for(page, EMAIL_INPUT, LOGIN_FORM_TIMEOUT)
        .await
        .context("login form did not appear")?;
    email.click().await?;
    email.type_str(user).await?;

    let pw = page.find_element(PASSWORD_INPUT).await?;
    pw.click().await?;
    pw.type_str(password).await?;

    page.find_element(SUBMIT_BUTTON).await?.click().await?;
    tokio::time::sleep(POST_SUBMIT_PAUSE).await;

    info!("verifying the session on the tasks view");
    let tasks_url = cfg.tasks_url();
    page.goto(tasks_url.as_str()).await?;
    browser::wait_for(page, ADD_ITEM_CONTROL, PAGE_LOAD_TIMEOUT)
        .await
        .context("tasks view did not come up after login")?;

    println!(
        "Login successful; session saved to {}",
        cfg.user_data_dir.display()
    );
    Ok(())
}

/// Open a visible browser on the login page and leave it to the user. The
/// persistent profile keeps whatever session they establish.
pub async fn interactive_login(cfg: &Config) -> Result<()> {
    let session = Session::launch(cfg, true).await?;
    session.page.goto(cfg.base_url.as_str()).await?;

    println!("Complete the login in the browser window.");
    println!(
        "The session persists automatically; this window closes in {} minutes.",
        INTERACTIVE_WINDOW.as_secs() / 60
    );
    tokio::time::sleep(INTERACTIVE_WINDOW).await;

    session.close().await
}
