use std::time::Duration;
use tracing::{debug, info, warn};

use super::selectors::Selectors;
use super::{DriverError, PageDriver};

/// Sign in on `page`. Both browsing contexts share the browser session, so
/// one login covers the feed and the comment pages.
pub async fn login<P: PageDriver>(
    page: &P,
    login_url: &str,
    (username, password): (&str, &str),
    sel: &Selectors,
    timeout: Duration,
) -> Result<(), DriverError> {
    info!("Logging in as {}", username);
    page.navigate(login_url, timeout).await?;

    match page.query_first(&sel.login_cookie_accept, None).await {
        Ok(Some(banner)) => {
            debug!("accepting cookie banner");
            if let Err(e) = page.click(&banner).await {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("cookie banner: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => warn!("cookie banner: {}", e),
    }

    let email = required(page, &sel.login_email).await?;
    page.type_text(&email, username).await?;
    let pass = required(page, &sel.login_password).await?;
    page.type_text(&pass, password).await?;
    let submit = required(page, &sel.login_submit).await?;
    page.click(&submit).await?;

    page.wait_for(&sel.login_done, timeout).await?;
    info!("Logged in");
    Ok(())
}

async fn required<P: PageDriver>(page: &P, selector: &str) -> Result<P::Node, DriverError> {
    page.query_first(selector, None)
        .await?
        .ok_or_else(|| DriverError::Missing(format!("login form field {}", selector)))
}
