//! Screen routes the presentation layer can be sent to.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Bedtime,
    Sleeping,
    Morning,
    History,
    Profile,
    Settings,
    Onboarding,
    Login,
}

impl Route {
    pub const ALL: [Route; 9] = [
        Route::Home,
        Route::Bedtime,
        Route::Sleeping,
        Route::Morning,
        Route::History,
        Route::Profile,
        Route::Settings,
        Route::Onboarding,
        Route::Login,
    ];

    pub fn as_path(self) -> &'static str {
        match self {
            Route::Home => "/home",
            Route::Bedtime => "/bedtime",
            Route::Sleeping => "/sleeping",
            Route::Morning => "/morning",
            Route::History => "/history",
            Route::Profile => "/profile",
            Route::Settings => "/settings",
            Route::Onboarding => "/onboarding",
            Route::Login => "/login",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.trim();
        Route::ALL.into_iter().find(|route| route.as_path() == path)
    }

    /// Routes that only make sense while a sleep session is in flight.
    pub fn is_sleep_flow(self) -> bool {
        matches!(self, Route::Sleeping | Route::Morning)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}
