//! Login flow as an explicit state machine
//!
//! ```text
//! OpenLoginPage -> SubmitIdentity -> AwaitPasswordPrompt -+-> SubmitPassword -> AwaitLandmark
//!                                          |              |
//!                                          +-> ReconfirmIdentity (once)
//! ```
//! Every wait is bounded. The machine never raises for expected branches:
//! unsupported challenges and step timeouts come back as a `LoginOutcome`.
//! Only surface failures (browser gone, input missing) are errors.

use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browsing::capability::LANDMARK_POLL_INTERVAL;
use crate::browsing::{BrowsingSurface, SiteProfile};
use crate::config::Credentials;
use crate::scrape_engine::ScrapeError;

/// Bounds for each wait in the session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    pub navigation: Duration,
    /// Validity probe of a restored session
    pub probe: Duration,
    /// Password prompt after the first identity submission
    pub identity_step: Duration,
    /// Password prompt after re-confirming identity
    pub reconfirm_step: Duration,
    /// Identity input on the login page, and the post-login landmark
    pub landmark: Duration,
}

/// Named states of the login flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    OpenLoginPage,
    SubmitIdentity,
    AwaitPasswordPrompt,
    ReconfirmIdentity,
    SubmitPassword,
    AwaitLandmark,
}

impl fmt::Display for LoginStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OpenLoginPage => "login page",
            Self::SubmitIdentity => "identity submission",
            Self::AwaitPasswordPrompt => "password prompt",
            Self::ReconfirmIdentity => "identity re-confirmation",
            Self::SubmitPassword => "password submission",
            Self::AwaitLandmark => "authenticated landmark",
        };
        f.write_str(name)
    }
}

/// Typed result of one login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated,
    /// The platform asked for something we cannot answer; carries the selector seen
    ChallengeUnsupported(String),
    /// The named step did not complete in time
    Timeout(LoginStep),
}

impl LoginOutcome {
    /// Map a non-success outcome onto the run-level error
    pub fn into_result(self) -> Result<(), ScrapeError> {
        match self {
            Self::Authenticated => Ok(()),
            Self::ChallengeUnsupported(what) => Err(ScrapeError::AuthChallengeUnsupported(what)),
            Self::Timeout(step) => Err(ScrapeError::AuthTimeout {
                step: step.to_string(),
            }),
        }
    }
}

enum Transition {
    Next(LoginStep),
    Done(LoginOutcome),
}

/// What showed up after submitting identity
enum Prompt {
    Password,
    Challenge(String),
    Nothing,
}

/// Drives one login attempt on a surface
pub struct LoginFlow<'a, S: BrowsingSurface> {
    surface: &'a S,
    site: &'a SiteProfile,
    credentials: &'a Credentials,
    timeouts: SessionTimeouts,
}

impl<'a, S: BrowsingSurface> LoginFlow<'a, S> {
    #[must_use]
    pub fn new(
        surface: &'a S,
        site: &'a SiteProfile,
        credentials: &'a Credentials,
        timeouts: SessionTimeouts,
    ) -> Self {
        Self {
            surface,
            site,
            credentials,
            timeouts,
        }
    }

    pub async fn run(&self) -> Result<LoginOutcome, ScrapeError> {
        info!("Logging in as {}", self.credentials.username);
        let mut step = LoginStep::OpenLoginPage;
        loop {
            debug!("Login step: {step}");
            match self.advance(step).await? {
                Transition::Next(next) => step = next,
                Transition::Done(outcome) => {
                    match &outcome {
                        LoginOutcome::Authenticated => info!("Login succeeded"),
                        other => warn!("Login ended without a session: {other:?}"),
                    }
                    return Ok(outcome);
                }
            }
        }
    }

    async fn advance(&self, step: LoginStep) -> Result<Transition, ScrapeError> {
        let site = self.site;
        let transition = match step {
            LoginStep::OpenLoginPage => {
                match self
                    .surface
                    .navigate(&site.login_url, self.timeouts.navigation)
                    .await
                {
                    Ok(()) => {}
                    Err(e) if e.is_timeout() => return Ok(Transition::Done(LoginOutcome::Timeout(step))),
                    Err(e) => return Err(e),
                }
                match self
                    .surface
                    .wait_for_landmark(&site.identity_input, self.timeouts.landmark)
                    .await
                {
                    Ok(()) => Transition::Next(LoginStep::SubmitIdentity),
                    Err(e) if e.is_timeout() => Transition::Done(LoginOutcome::Timeout(step)),
                    Err(e) => return Err(e),
                }
            }
            LoginStep::SubmitIdentity => {
                self.surface
                    .type_into(&site.identity_input, &self.credentials.username, true)
                    .await?;
                Transition::Next(LoginStep::AwaitPasswordPrompt)
            }
            LoginStep::AwaitPasswordPrompt => match self.await_prompt(self.timeouts.identity_step).await {
                Prompt::Password => Transition::Next(LoginStep::SubmitPassword),
                Prompt::Challenge(what) => Transition::Done(LoginOutcome::ChallengeUnsupported(what)),
                Prompt::Nothing if self.surface.has_element(&site.identity_input).await => {
                    info!("Platform asked to re-confirm identity");
                    Transition::Next(LoginStep::ReconfirmIdentity)
                }
                Prompt::Nothing => Transition::Done(LoginOutcome::Timeout(step)),
            },
            LoginStep::ReconfirmIdentity => {
                self.surface
                    .type_into(&site.identity_input, &self.credentials.username, true)
                    .await?;
                match self.await_prompt(self.timeouts.reconfirm_step).await {
                    Prompt::Password => Transition::Next(LoginStep::SubmitPassword),
                    Prompt::Challenge(what) => {
                        Transition::Done(LoginOutcome::ChallengeUnsupported(what))
                    }
                    Prompt::Nothing => Transition::Done(LoginOutcome::Timeout(step)),
                }
            }
            LoginStep::SubmitPassword => {
                self.surface
                    .type_into(&site.password_input, &self.credentials.password, true)
                    .await?;
                Transition::Next(LoginStep::AwaitLandmark)
            }
            LoginStep::AwaitLandmark => match self
                .surface
                .wait_for_landmark(&site.landmark_selector, self.timeouts.landmark)
                .await
            {
                Ok(()) => Transition::Done(LoginOutcome::Authenticated),
                Err(e) if e.is_timeout() => match self.visible_challenge().await {
                    Some(what) => Transition::Done(LoginOutcome::ChallengeUnsupported(what)),
                    None => Transition::Done(LoginOutcome::Timeout(step)),
                },
                Err(e) => return Err(e),
            },
        };
        Ok(transition)
    }

    /// Poll until the password input or a challenge input appears
    async fn await_prompt(&self, timeout: Duration) -> Prompt {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.surface.has_element(&self.site.password_input).await {
                return Prompt::Password;
            }
            if let Some(what) = self.visible_challenge().await {
                return Prompt::Challenge(what);
            }
            if tokio::time::Instant::now() >= deadline {
                return Prompt::Nothing;
            }
            tokio::time::sleep(LANDMARK_POLL_INTERVAL).await;
        }
    }

    async fn visible_challenge(&self) -> Option<String> {
        for selector in &self.site.challenge_inputs {
            if self.surface.has_element(selector).await {
                return Some(selector.clone());
            }
        }
        None
    }
}
