//! Controllers mediate between the store and the views. They receive the
//! store at construction, re-fetch from it after every mutation, and report
//! every failure as an `AppError` value.

pub mod auth;
pub mod instructor;
pub mod student;
pub mod views;

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::model::{Course, User};
use crate::store::{DataStore, ProfilePatch};

pub use auth::AuthController;
pub use instructor::InstructorDashboardController;
pub use student::StudentDashboardController;
pub use views::Surface;

pub type SharedStore = Rc<RefCell<DataStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Login,
    InstructorDashboard,
    StudentDashboard,
}

impl Route {
    pub fn for_user(user: &User) -> Route {
        if user.role().is_instructor() {
            Route::InstructorDashboard
        } else {
            Route::StudentDashboard
        }
    }
}

/// Outcome of a dashboard's `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Ready,
    /// No signed-in user, or the wrong role: navigation starts over.
    Redirect,
}

/// Owns the store and the controller graph.
pub struct App {
    store: SharedStore,
    surface: Surface,
    pub auth: AuthController,
    pub instructor: InstructorDashboardController,
    pub student: StudentDashboardController,
}

impl App {
    pub fn new(store: DataStore) -> Self {
        let store = Rc::new(RefCell::new(store));
        let surface = Surface::new();
        App {
            auth: AuthController::new(store.clone(), surface.clone()),
            instructor: InstructorDashboardController::new(store.clone(), surface.clone()),
            student: StudentDashboardController::new(store.clone(), surface.clone()),
            store,
            surface,
        }
    }

    pub fn store(&self) -> Ref<'_, DataStore> {
        self.store.borrow()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Signed-in user, restoring a persisted session if there is one.
    pub fn session_user(&self) -> Option<User> {
        self.store.borrow_mut().check_authentication()
    }

    /// Entry point: resume the persisted session or show the login screen.
    pub fn boot(&mut self) -> Route {
        let route = self.auth.init();
        self.enter(route)
    }

    fn enter(&mut self, route: Route) -> Route {
        let gate = match route {
            Route::Login => return Route::Login,
            Route::InstructorDashboard => {
                self.student.close();
                self.instructor.init()
            }
            Route::StudentDashboard => {
                self.instructor.close();
                self.student.init()
            }
        };
        match gate {
            Gate::Ready => route,
            Gate::Redirect => self.reset(),
        }
    }

    /// Redirect after a refused dashboard gate: every view is torn down and
    /// the entry point runs again, so a signed-in user lands on their own
    /// dashboard and everyone else on the login screen.
    pub fn redirect(&mut self) -> Route {
        self.instructor.close();
        self.student.close();
        self.boot()
    }

    /// Tears down every view and shows the login screen.
    pub fn reset(&mut self) -> Route {
        self.instructor.close();
        self.student.close();
        self.auth.show_login(None);
        Route::Login
    }

    pub fn login(&mut self, email: &str, password: &str) -> AppResult<(User, Route)> {
        let user = self.auth.login(email, password)?;
        let route = self.enter(Route::for_user(&user));
        Ok((user, route))
    }

    pub fn logout(&mut self) -> Route {
        self.auth.logout();
        self.reset()
    }

    /// Replaces every user and course. The session does not survive.
    pub fn replace_snapshot(&mut self, users: Vec<User>, courses: Vec<Course>) -> AppResult<Route> {
        self.store.borrow_mut().replace_snapshot(users, courses)?;
        Ok(self.reset())
    }

    /// Profile edits go through whichever dashboard the signed-in user owns.
    pub fn update_profile(&mut self, patch: &ProfilePatch) -> AppResult<User> {
        let user = signed_in(&self.store)?;
        if user.role().is_instructor() {
            self.instructor.update_profile(patch)
        } else {
            self.student.update_profile(patch)
        }
    }

    pub fn change_password(&mut self, current: &str, new: &str) -> AppResult<()> {
        let user = signed_in(&self.store)?;
        if user.role().is_instructor() {
            self.instructor.change_password(current, new)
        } else {
            self.student.change_password(current, new)
        }
    }
}

pub(crate) fn signed_in(store: &SharedStore) -> AppResult<User> {
    store
        .borrow_mut()
        .check_authentication()
        .ok_or(AppError::Unauthenticated)
}

pub(crate) fn update_profile(store: &SharedStore, patch: &ProfilePatch) -> AppResult<User> {
    let user = signed_in(store)?;
    store.borrow_mut().update_profile(&user.id, patch)
}

pub(crate) fn change_password(store: &SharedStore, current: &str, new: &str) -> AppResult<()> {
    let user = signed_in(store)?;
    store.borrow_mut().change_password(&user.id, current, new)
}
