use tracing::info;

use super::views::{login_model, Screen, Surface, ViewSlot};
use super::{Route, SharedStore};
use crate::error::{AppError, AppResult};
use crate::model::User;

pub struct AuthController {
    store: SharedStore,
    surface: Surface,
    views: ViewSlot,
}

impl AuthController {
    pub fn new(store: SharedStore, surface: Surface) -> Self {
        AuthController {
            store,
            surface,
            views: ViewSlot::default(),
        }
    }

    /// Where the signed-in user belongs; shows the login screen when nobody is.
    pub fn init(&mut self) -> Route {
        let user = self.store.borrow_mut().check_authentication();
        match user {
            Some(u) => {
                self.views.clear();
                Route::for_user(&u)
            }
            None => {
                self.show_login(None);
                Route::Login
            }
        }
    }

    pub fn show_login(&mut self, message: Option<&str>) {
        self.views.show(Box::new(Screen::new(
            &self.surface,
            "login",
            login_model(message),
        )));
    }

    pub fn login(&mut self, email: &str, password: &str) -> AppResult<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            let e = AppError::Validation("email and password are required".into());
            self.show_login(Some(&e.to_string()));
            return Err(e);
        }
        let user = self.store.borrow_mut().authenticate_user(email, password);
        match user {
            Some(u) => {
                self.views.clear();
                Ok(u)
            }
            None => {
                info!("rejected sign-in attempt");
                let e = AppError::InvalidCredentials;
                self.show_login(Some(&e.to_string()));
                Err(e)
            }
        }
    }

    pub fn logout(&mut self) {
        self.store.borrow_mut().logout();
    }
}
