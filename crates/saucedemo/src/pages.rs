// Page objects
//
// Thin wrappers that name the store's selectors once, so scenarios read as
// user steps.

use crate::config::SuiteConfig;
use autowait::{Locator, Page, Result, UrlPattern, expect_page};

/// The store's login form.
pub struct LoginPage<'a> {
    page: &'a Page,
    config: &'a SuiteConfig,
}

impl<'a> LoginPage<'a> {
    pub fn new(page: &'a Page, config: &'a SuiteConfig) -> Self {
        Self { page, config }
    }

    pub fn username_input(&self) -> Locator {
        self.page.locator(r#"[data-test="username"]"#)
    }

    pub fn password_input(&self) -> Locator {
        self.page.locator(r#"[data-test="password"]"#)
    }

    pub fn login_button(&self) -> Locator {
        self.page.locator(r#"[data-test="login-button"]"#)
    }

    /// Banner shown when a login is refused.
    pub fn error_message(&self) -> Locator {
        self.page.locator(r#"[data-test="error"]"#)
    }

    /// Opens the store root, where the form lives.
    pub async fn goto(&self) -> Result<()> {
        self.page.goto(self.config.base_url()).await
    }

    /// Fills in the credentials and submits the form.
    ///
    /// Returns once the form is submitted; a successful login navigates to
    /// the inventory afterwards.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        tracing::debug!("Logging in as {}", username);
        self.username_input().fill(username, None).await?;
        self.password_input().fill(password, None).await?;
        self.login_button().click(None).await
    }

    /// Opens the form, logs in with the configured credentials and waits
    /// for the inventory page.
    pub async fn login_as_configured_user(&self) -> Result<()> {
        self.goto().await?;
        self.login(self.config.username(), self.config.password())
            .await?;
        expect_page(self.page)
            .to_have_url(UrlPattern::regex(r"inventory\.html$")?)
            .await
    }
}
