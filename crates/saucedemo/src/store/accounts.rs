// Store accounts and login validation

use thiserror::Error;

/// Password shared by every account.
pub const PASSWORD: &str = "secret_sauce";

/// Accounts that can log in.
pub const USERS: [&str; 5] = [
    "standard_user",
    "problem_user",
    "performance_glitch_user",
    "error_user",
    "visual_user",
];

/// Account that exists but is refused.
pub const LOCKED_OUT_USER: &str = "locked_out_user";

/// Why a login was refused, worded the way the login form shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginError {
    #[error("Epic sadface: Username is required")]
    MissingUsername,

    #[error("Epic sadface: Password is required")]
    MissingPassword,

    #[error("Epic sadface: Sorry, this user has been locked out.")]
    LockedOut,

    #[error("Epic sadface: Username and password do not match any user in this service")]
    Mismatch,
}

pub fn authenticate(username: &str, password: &str) -> Result<(), LoginError> {
    if username.is_empty() {
        return Err(LoginError::MissingUsername);
    }
    if password.is_empty() {
        return Err(LoginError::MissingPassword);
    }
    if password != PASSWORD {
        return Err(LoginError::Mismatch);
    }
    if username == LOCKED_OUT_USER {
        return Err(LoginError::LockedOut);
    }
    if USERS.contains(&username) {
        Ok(())
    } else {
        Err(LoginError::Mismatch)
    }
}
