//! Embedded template registry for the generated PHP class files.
//!
//! Blade views and translation bundles are assembled in code (their
//! delimiters clash with the template syntax); everything class-shaped
//! renders through here.

use crate::error::Result;
use once_cell::sync::Lazy;
use tera::{Context, Tera};

static TEMPLATES: Lazy<Tera> = Lazy::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("model.php", include_str!("templates/model.php.tera")),
        ("request.php", include_str!("templates/request.php.tera")),
        (
            "controller.php",
            include_str!("templates/controller.php.tera"),
        ),
        ("service.php", include_str!("templates/service.php.tera")),
        ("resource.php", include_str!("templates/resource.php.tera")),
        (
            "form_component.php",
            include_str!("templates/form_component.php.tera"),
        ),
    ])
    .expect("embedded templates must parse");
    tera.autoescape_on(vec![]);
    tera
});

pub fn render(name: &str, context: &Context) -> Result<String> {
    Ok(TEMPLATES.render(name, context)?)
}
