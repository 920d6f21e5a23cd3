use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use log::info;
use std::io;
use std::time::Instant;
use tera::Tera;

use crate::config::Config;
use crate::handlers;
use crate::services::{OcrGateway, UploadStore};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

pub async fn run(config: Config) -> io::Result<()> {
    let host = config.host.clone();
    let port = config.port;

    let tera = build_templates().map_err(io::Error::other)?;

    let store = UploadStore::new(config.upload_dir.clone());
    store.ensure_dir()?;

    let gateway = OcrGateway::from_config(&config).map_err(io::Error::other)?;

    print_banner(&host, port);
    info!(
        "Server running at http://{}:{}/ (uploads in {:?}, limit {} bytes)",
        host,
        port,
        store.upload_dir(),
        config.max_upload_bytes
    );
    let startup_time = Instant::now();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(tera.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .configure(configure_routes)
    })
    .bind((host, port))?
    .run()
    .await?;

    info!("Server stopped. Uptime: {:?}", startup_time.elapsed());
    Ok(())
}

pub fn build_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template("index.html", INDEX_TEMPLATE)?;
    Ok(tera)
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/api/ocr", web::post().to(handlers::api_ocr))
        .route("/healthz", web::get().to(handlers::healthz));
}

fn print_banner(host: &str, port: u16) {
    let banner = r#"
  ___   ____ ____    ____      _
 / _ \ / ___|  _ \  |  _ \ ___| | __ _ _   _
| | | | |   | |_) | | |_) / _ \ |/ _` | | | |
| |_| | |___|  _ <  |  _ <  __/ | (_| | |_| |
 \___/ \____|_| \_\ |_| \_\___|_|\__,_|\__, |
                                       |___/
"#;
    println!("{}", banner);
    println!("         OCR relay started at: http://{}:{}\n", host, port);
}
