use axum::response::Redirect;

use crate::models::FlashNotice;

/// Flash
///
/// One-shot notices attached to a redirect as `?flash=<code>`. `GET /login` resolves the code
/// back into the user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    /// Registration with an email that already has an account.
    AlreadyRegistered,
    /// Unknown email or wrong password; deliberately indistinguishable.
    InvalidCredentials,
    /// An anonymous caller tried something that needs a login.
    LoginRequired,
}

impl Flash {
    pub const ALL: [Flash; 3] = [
        Flash::AlreadyRegistered,
        Flash::InvalidCredentials,
        Flash::LoginRequired,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Flash::AlreadyRegistered => "already-registered",
            Flash::InvalidCredentials => "invalid-credentials",
            Flash::LoginRequired => "login-required",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::AlreadyRegistered => "You have already signed up with that email. Log in instead.",
            Flash::InvalidCredentials => "Incorrect email or password. Please try again.",
            Flash::LoginRequired => "You need to log in or register first.",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flash| flash.code() == code)
    }

    pub fn notice(self) -> FlashNotice {
        FlashNotice {
            code: self.code().to_string(),
            message: self.message().to_string(),
        }
    }

    /// `303 See Other` to `path` carrying this notice.
    pub fn redirect_to(self, path: &str) -> Redirect {
        Redirect::to(&format!("{path}?flash={}", self.code()))
    }
}
