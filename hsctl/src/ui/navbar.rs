//! Navigation bar view.
//!
//! The bar is built in two steps: [`Navbar::load`] fetches everything it shows (current user,
//! credits row) once, then [`Navbar::render`] turns that state into HTML. The delete-account
//! confirmation is a modal toggled by [`Navbar::open_delete_modal`] and
//! [`Navbar::close_delete_modal`]; over HTTP it is opened with `?modal=delete-account` and
//! cancelled by following a plain link back to the current page.

use serde::Serialize;
use tracing::{instrument, warn};

use crate::{
    config::Config,
    errors::Error,
    provider::{AccountProvider, CreditsRow, Session},
    types::abbrev_uuid,
};

/// Query value that opens the delete-account modal
pub const DELETE_ACCOUNT_MODAL: &str = "delete-account";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavUser {
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Navbar {
    site_name: String,
    credits_purchase: bool,
    current_path: String,
    user: Option<NavUser>,
    credits: Option<CreditsRow>,
    delete_modal_open: bool,
}

#[derive(Serialize)]
struct NavbarContext<'a> {
    site_name: &'a str,
    credits_purchase: bool,
    current_path: &'a str,
    user: Option<UserContext<'a>>,
    credits: i64,
    delete_modal_open: bool,
}

#[derive(Serialize)]
struct UserContext<'a> {
    email: &'a str,
}

impl Navbar {
    /// Resolve the state shown by the bar.
    ///
    /// Credits are only fetched for a signed-in user. A failed credits lookup is logged and
    /// shown as no row rather than failing the page.
    #[instrument(skip_all, fields(signed_in = session.is_some()))]
    pub async fn load(provider: &dyn AccountProvider, session: Option<&Session>, config: &Config) -> Self {
        let credits = match session {
            Some(session) => match provider.fetch_credits(session.user_id).await {
                Ok(row) => row,
                Err(e) => {
                    warn!(user_id = %abbrev_uuid(&session.user_id), "Failed to load credits for navbar: {e}");
                    None
                }
            },
            None => None,
        };

        Self {
            site_name: config.site_name.clone(),
            credits_purchase: config.features.credits_purchase,
            current_path: "/".to_string(),
            user: session.map(|s| NavUser { email: s.email.clone() }),
            credits,
            delete_modal_open: false,
        }
    }

    /// Path the modal links (open, cancel) point back to
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.current_path = path.into();
        self
    }

    pub fn user(&self) -> Option<&NavUser> {
        self.user.as_ref()
    }

    pub fn credits(&self) -> Option<&CreditsRow> {
        self.credits.as_ref()
    }

    /// Open the delete confirmation. Has no effect for anonymous visitors.
    pub fn open_delete_modal(&mut self) {
        self.delete_modal_open = self.user.is_some();
    }

    pub fn close_delete_modal(&mut self) {
        self.delete_modal_open = false;
    }

    pub fn is_delete_modal_open(&self) -> bool {
        self.delete_modal_open
    }

    pub fn render(&self) -> Result<String, Error> {
        let ctx = NavbarContext {
            site_name: &self.site_name,
            credits_purchase: self.credits_purchase,
            current_path: &self.current_path,
            user: self.user.as_ref().map(|u| UserContext {
                email: u.email.as_deref().unwrap_or_default(),
            }),
            credits: self.credits.as_ref().map_or(0, |row| row.credits),
            delete_modal_open: self.delete_modal_open,
        };
        super::render("navbar.html", ctx)
    }
}
