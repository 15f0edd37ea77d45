//! Server-rendered HTML views.
//!
//! Templates are compiled into the binary and loaded into a single minijinja environment on
//! first use. Templates ending in `.html` are auto-escaped.

use minijinja::Environment;
use serde::Serialize;
use std::sync::OnceLock;

use crate::errors::Error;

pub mod navbar;

pub use navbar::Navbar;

const TEMPLATES: &[(&str, &str)] = &[
    ("navbar.html", include_str!("templates/navbar.html")),
    ("page.html", include_str!("templates/page.html")),
];

fn environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source).expect("built-in template must compile");
        }
        env
    })
}

/// Render a built-in template
pub fn render<S: Serialize>(template: &str, ctx: S) -> Result<String, Error> {
    environment()
        .get_template(template)
        .and_then(|t| t.render(ctx))
        .map_err(|e| Error::Internal {
            operation: format!("render {template}: {e}"),
        })
}
