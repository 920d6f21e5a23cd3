use actix_web::{Error, HttpResponse, web};
use tera::{Context, Tera};

use crate::constants;

pub async fn index(tmpl: web::Data<Tera>) -> Result<HttpResponse, Error> {
    let mut context = Context::new();
    context.insert("default_mode", constants::DEFAULT_MODE);
    context.insert("default_task", constants::DEFAULT_TASK);
    context.insert("default_prompt", constants::DEFAULT_PROMPT);

    let rendered = tmpl.render("index.html", &context).map_err(|e| {
        log::error!("Template error: {}", e);
        actix_web::error::ErrorInternalServerError(e)
    })?;

    Ok(HttpResponse::Ok().content_type("text/html").body(rendered))
}

pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}
