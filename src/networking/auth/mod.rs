//! Portal authentication
pub mod blocking;

use std::fmt;

/// Login information for MLOL authentication
#[derive(Clone)]
pub struct LoginInfo {
    pub username: Box<str>,
    pub password: Box<str>,
}

impl LoginInfo {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        LoginInfo {
            username: username.into().into_boxed_str(),
            password: password.into().into_boxed_str(),
        }
    }
}

impl fmt::Debug for LoginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInfo")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
